//! Data models for selsync
//!
//! - `SelectionChannel`: one of the synchronized clipboard buffers
//! - `StateRecord`: the latest accepted value for a channel

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A clipboard buffer that is kept in sync between the two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionChannel {
    /// The regular copy/paste clipboard
    Clipboard,
    /// The X11/Wayland primary (middle-click) selection
    Primary,
}

impl SelectionChannel {
    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionChannel::Clipboard => "CLIPBOARD",
            SelectionChannel::Primary => "PRIMARY",
        }
    }

    /// Resolve a wire name to a channel
    ///
    /// `PRIMARY` only exists while primary sync is enabled. Names are
    /// matched exactly.
    pub fn resolve(name: &str, sync_primary: bool) -> Option<Self> {
        match name {
            "CLIPBOARD" => Some(SelectionChannel::Clipboard),
            "PRIMARY" if sync_primary => Some(SelectionChannel::Primary),
            _ => None,
        }
    }

    /// Channels that take part in sync under the given setting
    pub fn enabled(sync_primary: bool) -> Vec<Self> {
        if sync_primary {
            vec![SelectionChannel::Clipboard, SelectionChannel::Primary]
        } else {
            vec![SelectionChannel::Clipboard]
        }
    }
}

impl fmt::Display for SelectionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The most recently accepted value of a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Clipboard text
    pub text: String,
    /// Sender wall-clock time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Node that produced the value
    pub origin_node: String,
}

impl StateRecord {
    pub fn new(text: impl Into<String>, timestamp: i64, origin_node: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp,
            origin_node: origin_node.into(),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
