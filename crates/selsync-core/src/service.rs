//! Sync service lifecycle
//!
//! Starts and stops everything that runs in the background: the sync
//! server, the poll timer, and one change listener per enabled channel
//! (native notifications where the clipboard offers them, the polling
//! watcher otherwise). State in the shared `SyncContext` survives restarts.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::SyncContext;
use crate::models::SelectionChannel;
use crate::scheduler::Scheduler;
use crate::sync::{PollScheduler, SyncServer};
use crate::watcher::LocalChangeWatcher;

/// Running (or stopped) sync service
pub struct SyncService {
    ctx: Arc<SyncContext>,
    scheduler: Scheduler,
    server_addr: Option<SocketAddr>,
}

impl SyncService {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self {
            ctx,
            scheduler: Scheduler::new(),
            server_addr: None,
        }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    /// Address the server is listening on, if it started
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// Names of the running background tasks
    pub fn active_tasks(&self) -> Vec<&'static str> {
        self.scheduler.active()
    }

    /// Start every component allowed by the current configuration
    ///
    /// Configuration problems are logged and only disable the affected
    /// component.
    pub async fn start(&mut self) {
        let config = self.ctx.config();
        info!("Starting sync service as node {}", self.ctx.node_id());

        if config.shared_secret.is_empty() {
            warn!("Shared secret is empty; anyone who can reach the port can write the clipboard");
        }

        self.start_server(&config).await;

        PollScheduler::new(self.ctx.clone()).start(&mut self.scheduler);

        let mut polled = Vec::new();
        for channel in SelectionChannel::enabled(config.sync_primary) {
            match self.ctx.clipboard().subscribe(channel) {
                Some(changes) => self.listen(channel, changes),
                None => polled.push(channel),
            }
        }
        if !polled.is_empty() {
            LocalChangeWatcher::new(self.ctx.clone(), polled).start(&mut self.scheduler);
        }
    }

    async fn start_server(&mut self, config: &Config) {
        let port = match config.listen_port() {
            Ok(port) => port,
            Err(e) => {
                warn!("Not starting sync server: {}", e);
                return;
            }
        };

        match SyncServer::bind(self.ctx.clone(), ("0.0.0.0", port)).await {
            Ok(server) => {
                self.server_addr = server.local_addr().ok();
                self.scheduler.spawn("sync-server", server.run());
            }
            Err(e) => warn!("Failed to start sync server on port {}: {}", port, e),
        }
    }

    /// Forward native change notifications of a channel
    fn listen(&mut self, channel: SelectionChannel, mut changes: broadcast::Receiver<()>) {
        debug!("Listening for {} changes", channel);
        let ctx = self.ctx.clone();
        self.scheduler.spawn("change-listener", async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Err(e) = ctx.handle_local_change(channel) {
                            warn!("Failed to handle {} change: {}", channel, e);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Stop the server, timers and listeners
    ///
    /// Connections and pushes already in flight are left to finish on their own.
    pub async fn stop(&mut self) {
        if !self.scheduler.is_empty() {
            info!("Stopping sync service");
        }
        self.scheduler.shutdown().await;
        self.server_addr = None;
    }

    /// Apply a new configuration and restart every component
    pub async fn reconfigure(&mut self, config: Config) {
        info!("Configuration changed, restarting sync service");
        self.stop().await;
        self.ctx.set_config(config);
        self.start().await;
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}
