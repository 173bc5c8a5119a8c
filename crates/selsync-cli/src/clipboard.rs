//! Host clipboard backend
//!
//! Reads and writes the desktop clipboard through `arboard`. Change
//! notifications are not available, so the service falls back to polling.

use std::sync::Mutex;

use selsync_core::{ClipboardProvider, SelectionChannel, SyncError, SyncResult};

/// Clipboard of the machine the daemon runs on
pub struct HostClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl HostClipboard {
    /// Connect to the desktop clipboard
    pub fn new() -> SyncResult<Self> {
        let clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }

    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> SyncResult<T> {
        let mut clipboard = self
            .inner
            .lock()
            .map_err(|_| SyncError::Clipboard("Clipboard lock poisoned".to_string()))?;
        f(&mut clipboard).map_err(clipboard_error)
    }
}

impl ClipboardProvider for HostClipboard {
    fn get_text(&self, channel: SelectionChannel) -> SyncResult<Option<String>> {
        let text = match channel {
            SelectionChannel::Clipboard => self.with_clipboard(|c| c.get_text()),
            SelectionChannel::Primary => self.with_clipboard(primary::get_text),
        };

        match text {
            Ok(text) => Ok(Some(text)),
            // Empty selections and non-text content read as "nothing"
            Err(SyncError::Clipboard(ref msg)) if msg == NO_TEXT => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_text(&self, channel: SelectionChannel, text: &str) -> SyncResult<()> {
        match channel {
            SelectionChannel::Clipboard => self.with_clipboard(|c| c.set_text(text)),
            SelectionChannel::Primary => self.with_clipboard(|c| primary::set_text(c, text)),
        }
    }
}

const NO_TEXT: &str = "no text content";

fn clipboard_error(error: arboard::Error) -> SyncError {
    match error {
        arboard::Error::ContentNotAvailable => SyncError::Clipboard(NO_TEXT.to_string()),
        other => SyncError::Clipboard(other.to_string()),
    }
}

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
mod primary {
    use arboard::{Clipboard, Error, GetExtLinux, LinuxClipboardKind, SetExtLinux};

    pub fn get_text(clipboard: &mut Clipboard) -> Result<String, Error> {
        clipboard.get().clipboard(LinuxClipboardKind::Primary).text()
    }

    pub fn set_text(clipboard: &mut Clipboard, text: &str) -> Result<(), Error> {
        clipboard
            .set()
            .clipboard(LinuxClipboardKind::Primary)
            .text(text)
    }
}

#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
mod primary {
    use arboard::{Clipboard, Error};

    // No primary selection on this platform
    pub fn get_text(_clipboard: &mut Clipboard) -> Result<String, Error> {
        Err(Error::ContentNotAvailable)
    }

    pub fn set_text(_clipboard: &mut Clipboard, _text: &str) -> Result<(), Error> {
        Err(Error::ClipboardNotSupported)
    }
}
