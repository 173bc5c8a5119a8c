//! In-memory channel state
//!
//! Holds at most one record per selection channel: the latest accepted
//! value. Records are replaced, never merged, and nothing is persisted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{SelectionChannel, StateRecord};

/// Latest accepted value per channel
#[derive(Debug, Default)]
pub struct StateStore {
    records: Mutex<HashMap<SelectionChannel, StateRecord>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for a channel
    pub fn get(&self, channel: SelectionChannel) -> Option<StateRecord> {
        self.lock().get(&channel).cloned()
    }

    /// Replace the record for a channel
    pub fn record(&self, channel: SelectionChannel, record: StateRecord) {
        self.lock().insert(channel, record);
    }

    /// Run `f` against the current record and store what it returns, atomically
    ///
    /// Used to make the accept decision and the write a single step, so two
    /// concurrent updates to the same channel cannot both pass against the
    /// same old record.
    pub fn update_with<F>(&self, channel: SelectionChannel, f: F) -> bool
    where
        F: FnOnce(Option<&StateRecord>) -> Option<StateRecord>,
    {
        let mut records = self.lock();
        match f(records.get(&channel)) {
            Some(record) => {
                records.insert(channel, record);
                true
            }
            None => false,
        }
    }

    /// Number of channels with a record
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SelectionChannel, StateRecord>> {
        // A panic while holding the lock cannot leave a half-written map
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = StateStore::new();
        assert!(store.is_empty());
        assert!(store.get(SelectionChannel::Clipboard).is_none());
    }

    #[test]
    fn test_record_replaces() {
        let store = StateStore::new();
        store.record(
            SelectionChannel::Clipboard,
            StateRecord::new("first", 1, "a"),
        );
        store.record(
            SelectionChannel::Clipboard,
            StateRecord::new("second", 2, "b"),
        );

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(SelectionChannel::Clipboard),
            Some(StateRecord::new("second", 2, "b"))
        );
    }

    #[test]
    fn test_channels_are_independent() {
        let store = StateStore::new();
        store.record(SelectionChannel::Clipboard, StateRecord::new("c", 1, "a"));
        store.record(SelectionChannel::Primary, StateRecord::new("p", 2, "a"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(SelectionChannel::Primary).unwrap().text, "p");
        assert_eq!(store.get(SelectionChannel::Clipboard).unwrap().text, "c");
    }

    #[test]
    fn test_update_with() {
        let store = StateStore::new();

        let stored = store.update_with(SelectionChannel::Clipboard, |current| {
            assert!(current.is_none());
            Some(StateRecord::new("x", 5, "a"))
        });
        assert!(stored);

        let stored = store.update_with(SelectionChannel::Clipboard, |current| {
            assert_eq!(current.unwrap().timestamp, 5);
            None
        });
        assert!(!stored);
        assert_eq!(store.get(SelectionChannel::Clipboard).unwrap().text, "x");
    }
}
