//! Peer synchronization
//!
//! ## Protocol
//!
//! Plain TCP, one JSON object per line:
//! 1. Connect to the peer
//! 2. Send one `update` or `pull` request carrying the shared secret
//! 3. Read one response line (`ok`, `ignored`, `empty`, `unauthorized`, `error`)
//! 4. Close
//!
//! Conflicts are resolved last-writer-wins on the sender's timestamp.
//!
//! ## Usage
//!
//! ```ignore
//! let client = SyncClient::new(Some("tcp://laptop.local:8765"), 8765);
//! let request = Request::pull("node-a", SelectionChannel::Clipboard, "secret");
//! let reply = client.send(&request, true).await;
//! ```

mod client;
pub mod message;
mod poll;
pub mod reconcile;
mod server;

pub use client::{resolve_endpoint, SyncClient};
pub use message::{Request, Response, Status};
pub use poll::{pull_once, PollScheduler};
pub use reconcile::{decide, should_accept, Decision};
pub use server::{handle_line, SyncServer};
