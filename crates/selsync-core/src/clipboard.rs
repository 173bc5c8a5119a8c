//! Clipboard access
//!
//! The sync engine never touches the host clipboard directly. It goes
//! through a `ClipboardProvider`, which either offers change notifications
//! per channel (signal-driven) or does not, in which case the engine falls
//! back to polling with `LocalChangeWatcher`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::error::SyncResult;
use crate::models::SelectionChannel;

/// Access to the host clipboard buffers
pub trait ClipboardProvider: Send + Sync {
    /// Current text of a channel, `None` if empty or not text
    fn get_text(&self, channel: SelectionChannel) -> SyncResult<Option<String>>;

    /// Replace the text of a channel
    fn set_text(&self, channel: SelectionChannel, text: &str) -> SyncResult<()>;

    /// Change notifications for a channel
    ///
    /// `None` means the backend cannot notify and must be polled.
    fn subscribe(&self, _channel: SelectionChannel) -> Option<broadcast::Receiver<()>> {
        None
    }
}

/// In-process clipboard
///
/// Notifies on every `set_text` unless created without notifications.
/// Each channel has its own notification sender; subscriptions end when
/// their receiver is dropped.
pub struct MemoryClipboard {
    texts: Mutex<HashMap<SelectionChannel, String>>,
    changes: Option<HashMap<SelectionChannel, broadcast::Sender<()>>>,
}

impl MemoryClipboard {
    /// Clipboard with change notifications
    pub fn new() -> Self {
        let changes = [SelectionChannel::Clipboard, SelectionChannel::Primary]
            .into_iter()
            .map(|channel| (channel, broadcast::channel(16).0))
            .collect();
        Self {
            texts: Mutex::new(HashMap::new()),
            changes: Some(changes),
        }
    }

    /// Clipboard that has to be polled for changes
    pub fn without_notifications() -> Self {
        Self {
            texts: Mutex::new(HashMap::new()),
            changes: None,
        }
    }

    /// Number of live change subscriptions on a channel
    pub fn subscriber_count(&self, channel: SelectionChannel) -> usize {
        self.changes
            .as_ref()
            .and_then(|changes| changes.get(&channel))
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SelectionChannel, String>> {
        self.texts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn get_text(&self, channel: SelectionChannel) -> SyncResult<Option<String>> {
        Ok(self.lock().get(&channel).cloned())
    }

    fn set_text(&self, channel: SelectionChannel, text: &str) -> SyncResult<()> {
        self.lock().insert(channel, text.to_string());
        if let Some(tx) = self.changes.as_ref().and_then(|c| c.get(&channel)) {
            // No receivers is fine
            let _ = tx.send(());
        }
        Ok(())
    }

    fn subscribe(&self, channel: SelectionChannel) -> Option<broadcast::Receiver<()>> {
        Some(self.changes.as_ref()?.get(&channel)?.subscribe())
    }
}
