//! Periodic pulls from the peer
//!
//! Only the CLIPBOARD channel is pulled; PRIMARY is kept in sync by pushes
//! alone. Each tick runs in its own task, so a slow pull never delays the
//! next one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::message::Request;
use super::reconcile::Decision;
use crate::context::SyncContext;
use crate::models::SelectionChannel;
use crate::scheduler::Scheduler;

/// Drives periodic pulls of the CLIPBOARD channel
pub struct PollScheduler {
    ctx: Arc<SyncContext>,
}

impl PollScheduler {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    /// Register the poll timer if the configured interval is non-zero
    pub fn start(self, scheduler: &mut Scheduler) -> bool {
        let interval = self.ctx.config().poll_interval;
        if interval == 0 {
            debug!("Polling disabled");
            return false;
        }

        let ctx = self.ctx;
        scheduler.every("poll", Duration::from_secs(interval), move || {
            let ctx = ctx.clone();
            async move {
                tokio::spawn(async move {
                    pull_once(&ctx).await;
                });
            }
        });
        true
    }
}

/// Pull the peer's CLIPBOARD value and reconcile it
///
/// Returns the reconciliation decision, or `None` when the peer had nothing
/// to offer or could not be reached.
pub async fn pull_once(ctx: &SyncContext) -> Option<Decision> {
    let config = ctx.config();
    let request = Request::pull(
        ctx.node_id(),
        SelectionChannel::Clipboard,
        &config.shared_secret,
    );

    let response = ctx.client().send(&request, true).await?;
    if !response.is_update() {
        debug!("Pull answered with {:?}", response.status);
        return None;
    }

    let update = match ctx.remote_update(
        response.selection.as_deref(),
        response.node.as_deref(),
        response.timestamp,
        response.text.as_deref(),
    ) {
        Ok(update) => update,
        Err(e) => {
            warn!("Discarding pull reply: {}", e);
            return None;
        }
    };

    match ctx.apply_remote(&update) {
        Ok(decision) => Some(decision),
        Err(e) => {
            warn!("Failed to apply pulled value: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardProvider, MemoryClipboard};
    use crate::config::Config;
    use crate::identity::NodeIdentity;
    use crate::models::StateRecord;
    use crate::sync::SyncServer;

    async fn peer_with(record: Option<StateRecord>) -> String {
        let config = Config {
            shared_secret: "s".to_string(),
            ..Config::default()
        };
        let ctx = Arc::new(SyncContext::new(
            config,
            NodeIdentity::from_id("B"),
            Arc::new(MemoryClipboard::new()),
        ));
        if let Some(record) = record {
            ctx.state().record(SelectionChannel::Clipboard, record);
        }

        let server = SyncServer::bind(ctx, "127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        format!("tcp://{}", addr)
    }

    fn local(endpoint: &str, poll_interval: u64) -> (Arc<SyncContext>, Arc<MemoryClipboard>) {
        let clipboard = Arc::new(MemoryClipboard::new());
        let config = Config {
            shared_secret: "s".to_string(),
            peer_endpoint: Some(endpoint.to_string()),
            poll_interval,
            ..Config::default()
        };
        let ctx = SyncContext::new(config, NodeIdentity::from_id("A"), clipboard.clone());
        (Arc::new(ctx), clipboard)
    }

    #[tokio::test]
    async fn test_pull_applies_newer_value() {
        let endpoint = peer_with(Some(StateRecord::new("from B", 2000, "B"))).await;
        let (ctx, clipboard) = local(&endpoint, 0);

        assert_eq!(pull_once(&ctx).await, Some(Decision::Accept));
        assert_eq!(
            clipboard.get_text(SelectionChannel::Clipboard).unwrap(),
            Some("from B".to_string())
        );
        assert!(ctx.echo().is_marked(SelectionChannel::Clipboard));

        // Pulling the same value again is a duplicate
        assert_eq!(pull_once(&ctx).await, Some(Decision::Duplicate));
    }

    #[tokio::test]
    async fn test_pull_keeps_newer_local_value() {
        let endpoint = peer_with(Some(StateRecord::new("old", 1000, "B"))).await;
        let (ctx, _) = local(&endpoint, 0);
        ctx.state()
            .record(SelectionChannel::Clipboard, StateRecord::new("new", 5000, "A"));

        assert_eq!(pull_once(&ctx).await, Some(Decision::Stale));
        assert_eq!(ctx.state().get(SelectionChannel::Clipboard).unwrap().text, "new");
    }

    #[tokio::test]
    async fn test_pull_empty_peer() {
        let endpoint = peer_with(None).await;
        let (ctx, _) = local(&endpoint, 0);

        assert_eq!(pull_once(&ctx).await, None);
        assert!(ctx.state().is_empty());
    }

    #[tokio::test]
    async fn test_pull_wrong_secret() {
        let endpoint = peer_with(Some(StateRecord::new("secret stuff", 1, "B"))).await;
        let (ctx, _) = local(&endpoint, 0);
        let mut config = ctx.config();
        config.shared_secret = "wrong".to_string();
        ctx.set_config(config);

        assert_eq!(pull_once(&ctx).await, None);
        assert!(ctx.state().is_empty());
    }

    #[tokio::test]
    async fn test_start_disabled_when_interval_zero() {
        let (ctx, _) = local("tcp://127.0.0.1:1", 0);
        let mut scheduler = Scheduler::new();

        assert!(!PollScheduler::new(ctx).start(&mut scheduler));
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_pull() {
        let endpoint = peer_with(Some(StateRecord::new("polled", 1, "B"))).await;
        let (ctx, clipboard) = local(&endpoint, 1);
        let mut scheduler = Scheduler::new();

        assert!(PollScheduler::new(ctx).start(&mut scheduler));

        let mut applied = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if clipboard.get_text(SelectionChannel::Clipboard).unwrap().is_some() {
                applied = true;
                break;
            }
        }
        assert!(applied);
        scheduler.cancel_all();
    }
}
