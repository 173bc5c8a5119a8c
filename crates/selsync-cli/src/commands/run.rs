//! Daemon command handler

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use selsync_core::{
    ClipboardProvider, MemoryClipboard, NodeIdentity, Settings, SyncContext, SyncService,
};

use crate::clipboard::HostClipboard;
use crate::output::Output;

/// Run the sync service until Ctrl-C
///
/// SIGHUP re-reads the config file; any configuration change restarts the
/// service with the new values.
pub async fn run(settings: Settings, memory: bool, output: &Output) -> Result<()> {
    let identity = NodeIdentity::ensure(&settings)?;

    let clipboard: Arc<dyn ClipboardProvider> = if memory {
        Arc::new(MemoryClipboard::new())
    } else {
        Arc::new(
            HostClipboard::new()
                .context("Failed to open the desktop clipboard (use --memory to run without one)")?,
        )
    };

    let ctx = Arc::new(SyncContext::new(settings.get(), identity, clipboard));
    let mut service = SyncService::new(ctx);
    service.start().await;

    match service.server_addr() {
        Some(addr) => output.success(&format!(
            "Node {} listening on {}",
            service.context().node_id(),
            addr
        )),
        None => output.message(&format!(
            "Node {} running without a sync server",
            service.context().node_id()
        )),
    }

    let mut changes = settings.subscribe();
    let mut hangup = Hangup::new()?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
            Some(()) = hangup.recv() => {
                info!("Reloading configuration");
                if let Err(e) = settings.reload() {
                    warn!("Failed to reload configuration: {:#}", e);
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let config = changes.borrow_and_update().clone();
                service.reconfigure(config).await;
            }
        }
    }

    service.stop().await;
    output.message("Stopped");
    Ok(())
}

/// SIGHUP listener
#[cfg(unix)]
struct Hangup(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Hangup {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let signal = signal(SignalKind::hangup()).context("Failed to listen for SIGHUP")?;
        Ok(Self(signal))
    }

    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct Hangup;

#[cfg(not(unix))]
impl Hangup {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
