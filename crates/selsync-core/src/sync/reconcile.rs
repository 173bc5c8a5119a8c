//! Last-writer-wins reconciliation
//!
//! Decides whether an incoming update replaces the stored value of a
//! channel. The decision only looks at the current record and the
//! candidate, so it does not depend on the order messages arrive in.
//!
//! Two different texts carrying the exact same timestamp are both accepted
//! in arrival order; nodes can diverge in that case.

use crate::models::StateRecord;

/// Outcome of reconciling one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Replace the stored value
    Accept,
    /// The update was produced by this node
    SelfEcho,
    /// Older than the stored value
    Stale,
    /// Same timestamp and text as the stored value
    Duplicate,
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Reconcile an incoming update against the current record
///
/// Rules, in order: self-originated updates are rejected; anything is
/// accepted into an empty channel; older timestamps are rejected; an exact
/// `(timestamp, text)` repeat is rejected; everything else is accepted.
pub fn decide(
    current: Option<&StateRecord>,
    incoming_timestamp: i64,
    incoming_node: &str,
    incoming_text: &str,
    local_node_id: &str,
) -> Decision {
    if incoming_node == local_node_id {
        return Decision::SelfEcho;
    }

    let Some(current) = current else {
        return Decision::Accept;
    };

    if incoming_timestamp < current.timestamp {
        return Decision::Stale;
    }

    if incoming_timestamp == current.timestamp && incoming_text == current.text {
        return Decision::Duplicate;
    }

    Decision::Accept
}

/// Boolean form of [`decide`]
pub fn should_accept(
    current: Option<&StateRecord>,
    incoming_timestamp: i64,
    incoming_node: &str,
    incoming_text: &str,
    local_node_id: &str,
) -> bool {
    decide(
        current,
        incoming_timestamp,
        incoming_node,
        incoming_text,
        local_node_id,
    )
    .is_accept()
}
