//! Sync protocol message types
//!
//! One JSON object per line, UTF-8, `\n` terminated. A connection carries
//! exactly one request line and one response line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};
use crate::models::{SelectionChannel, StateRecord};

/// Longest request line the server accepts
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Message type of a pushed value
pub const TYPE_UPDATE: &str = "update";

/// Message type of a state request
pub const TYPE_PULL: &str = "pull";

/// Node name assumed when an update does not carry one
pub const UNKNOWN_NODE: &str = "remote";

/// Request sent from one node to the other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub secret: String,
}

impl Request {
    /// Create an update message
    pub fn update(
        node: &str,
        channel: SelectionChannel,
        timestamp: i64,
        text: &str,
        secret: &str,
    ) -> Self {
        Request {
            kind: Some(TYPE_UPDATE.to_string()),
            node: Some(node.to_string()),
            selection: Some(channel.as_str().to_string()),
            timestamp: Some(timestamp),
            text: Some(text.to_string()),
            secret: secret.to_string(),
        }
    }

    /// Create a pull message
    pub fn pull(node: &str, channel: SelectionChannel, secret: &str) -> Self {
        Request {
            kind: Some(TYPE_PULL.to_string()),
            node: Some(node.to_string()),
            selection: Some(channel.as_str().to_string()),
            timestamp: None,
            text: None,
            secret: secret.to_string(),
        }
    }

    /// Decode a request from an already parsed JSON object
    pub fn from_object(object: Map<String, Value>) -> SyncResult<Self> {
        serde_json::from_value(Value::Object(object))
            .map_err(|e| SyncError::Protocol(format!("Invalid payload: {}", e)))
    }

    /// Encode as a protocol line (with trailing newline)
    pub fn encode_line(&self) -> SyncResult<String> {
        encode_line(self)
    }
}

/// Parse a protocol line into a JSON object
///
/// Fields are not interpreted yet so the secret can be checked before
/// anything else about the payload is validated.
pub fn parse_line(line: &str) -> SyncResult<Map<String, Value>> {
    let line = line.trim();
    if line.is_empty() {
        return Err(SyncError::Protocol("Empty payload".to_string()));
    }

    match serde_json::from_str::<Value>(line)? {
        Value::Object(object) => Ok(object),
        _ => Err(SyncError::Protocol(
            "Payload must be a JSON object".to_string(),
        )),
    }
}

/// Secret carried by a parsed request, if it is a string
pub fn secret_of(object: &Map<String, Value>) -> Option<&str> {
    object.get("secret").and_then(Value::as_str)
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Ignored,
    Empty,
    Unauthorized,
    Error,
}

/// Response sent back on the same connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    fn with_status(status: Status) -> Self {
        Response {
            status,
            kind: None,
            node: None,
            selection: None,
            timestamp: None,
            text: None,
            message: None,
        }
    }

    pub fn ok() -> Self {
        Self::with_status(Status::Ok)
    }

    pub fn ignored() -> Self {
        Self::with_status(Status::Ignored)
    }

    pub fn empty() -> Self {
        Self::with_status(Status::Empty)
    }

    pub fn unauthorized() -> Self {
        Self::with_status(Status::Unauthorized)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response {
            message: Some(message.into()),
            ..Self::with_status(Status::Error)
        }
    }

    /// Pull reply carrying a stored record
    pub fn snapshot(node: &str, channel: SelectionChannel, record: &StateRecord) -> Self {
        Response {
            kind: Some(TYPE_UPDATE.to_string()),
            node: Some(node.to_string()),
            selection: Some(channel.as_str().to_string()),
            timestamp: Some(record.timestamp),
            text: Some(record.text.clone()),
            ..Self::with_status(Status::Ok)
        }
    }

    /// Fold an error into a response
    pub fn from_error(error: &SyncError) -> Self {
        match error {
            SyncError::Unauthorized => Self::unauthorized(),
            other => Self::error(other.to_string()),
        }
    }

    /// Whether this is a pull reply carrying a value
    pub fn is_update(&self) -> bool {
        self.status == Status::Ok && self.kind.as_deref() == Some(TYPE_UPDATE)
    }

    /// Decode a response line
    pub fn decode(line: &str) -> SyncResult<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(SyncError::Protocol("Empty response".to_string()));
        }
        Ok(serde_json::from_str(line)?)
    }

    /// Encode as a protocol line (with trailing newline)
    pub fn encode_line(&self) -> SyncResult<String> {
        encode_line(self)
    }
}

fn encode_line<T: Serialize>(value: &T) -> SyncResult<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}
