//! Echo suppression
//!
//! Writing a remote value into the local clipboard triggers a local change
//! notification. Channels are flagged right before such a write; the change
//! path consumes the flag and skips re-publishing the value.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::models::SelectionChannel;

/// Channels currently expecting an echo of a remote write
#[derive(Debug, Default)]
pub struct EchoSuppressor {
    expecting: Mutex<HashSet<SelectionChannel>>,
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a channel before writing a remote value into it
    pub fn mark(&self, channel: SelectionChannel) {
        self.lock().insert(channel);
    }

    /// Withdraw a flag without consuming an echo (the write failed)
    pub fn unmark(&self, channel: SelectionChannel) {
        self.lock().remove(&channel);
    }

    /// Consume the flag for a channel
    ///
    /// Returns true if the observed change was caused by a remote write and
    /// must not be published.
    pub fn take(&self, channel: SelectionChannel) -> bool {
        self.lock().remove(&channel)
    }

    pub fn is_marked(&self, channel: SelectionChannel) -> bool {
        self.lock().contains(&channel)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SelectionChannel>> {
        self.expecting.lock().unwrap_or_else(|e| e.into_inner())
    }
}
