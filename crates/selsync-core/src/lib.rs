//! selsync Core Library
//!
//! This crate keeps clipboard selection channels (`CLIPBOARD`, optionally
//! `PRIMARY`) in sync between two nodes over a small authenticated
//! line protocol.
//!
//! # Architecture
//!
//! - **Last-writer-wins**: every update carries the sender's wall-clock
//!   timestamp; the newest value of a channel wins
//! - **Push**: local changes are sent to the peer as they happen
//! - **Pull**: the peer's CLIPBOARD value is polled periodically
//! - **Echo suppression**: values written on behalf of the peer are not
//!   sent back to it
//!
//! # Quick Start
//!
//! ```text
//! let settings = Settings::open(Config::config_file_path())?;
//! let identity = NodeIdentity::ensure(&settings)?;
//! let ctx = Arc::new(SyncContext::new(settings.get(), identity, clipboard));
//!
//! let mut service = SyncService::new(ctx);
//! service.start().await;
//! ```
//!
//! # Modules
//!
//! - `config`: Application configuration and live settings
//! - `identity`: Stable node identifier
//! - `models`: Selection channels and state records
//! - `store`: Latest accepted value per channel
//! - `echo`: Echo suppression flags
//! - `clipboard`: Clipboard backend interface
//! - `context`: Shared state passed to every handler
//! - `sync`: Wire protocol, reconciliation, server, client and poller
//! - `watcher`: Polling fallback for clipboards without notifications
//! - `scheduler`: Cancellable timers and tasks
//! - `service`: Start/stop/reconfigure of the whole engine

pub mod clipboard;
pub mod config;
pub mod context;
pub mod echo;
pub mod error;
pub mod identity;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod sync;
pub mod watcher;

pub use clipboard::{ClipboardProvider, MemoryClipboard};
pub use config::{Config, Settings};
pub use context::{RemoteUpdate, SyncContext};
pub use echo::EchoSuppressor;
pub use error::{SyncError, SyncResult};
pub use identity::NodeIdentity;
pub use models::{SelectionChannel, StateRecord};
pub use scheduler::{Scheduler, TimerHandle};
pub use service::SyncService;
pub use store::StateStore;
pub use watcher::LocalChangeWatcher;
