//! Shared sync context
//!
//! Everything the handlers need (configuration, identity, channel state,
//! echo flags and the clipboard) lives in one `SyncContext`, created at
//! startup and shared as `Arc<SyncContext>`. No handler keeps state of its
//! own outside of it.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::clipboard::ClipboardProvider;
use crate::config::Config;
use crate::echo::EchoSuppressor;
use crate::error::{SyncError, SyncResult};
use crate::identity::NodeIdentity;
use crate::models::{now_millis, SelectionChannel, StateRecord};
use crate::store::StateStore;
use crate::sync::message::{Request, UNKNOWN_NODE};
use crate::sync::reconcile::{decide, Decision};
use crate::sync::SyncClient;

/// An update received from the peer, with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUpdate {
    pub channel: SelectionChannel,
    pub timestamp: i64,
    pub node: String,
    pub text: String,
}

/// State shared by the server, the poller and the change listeners
pub struct SyncContext {
    config: RwLock<Config>,
    identity: NodeIdentity,
    state: StateStore,
    echo: EchoSuppressor,
    clipboard: Arc<dyn ClipboardProvider>,
}

impl SyncContext {
    pub fn new(
        config: Config,
        identity: NodeIdentity,
        clipboard: Arc<dyn ClipboardProvider>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            identity,
            state: StateStore::new(),
            echo: EchoSuppressor::new(),
            clipboard,
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the configuration
    pub fn set_config(&self, config: Config) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    pub fn node_id(&self) -> &str {
        self.identity.id()
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn echo(&self) -> &EchoSuppressor {
        &self.echo
    }

    pub fn clipboard(&self) -> &dyn ClipboardProvider {
        self.clipboard.as_ref()
    }

    /// Client for the configured peer
    pub fn client(&self) -> SyncClient {
        SyncClient::from_config(&self.config())
    }

    /// Resolve a wire selection name, defaulting to CLIPBOARD when absent
    pub fn resolve_channel(&self, selection: Option<&str>) -> SyncResult<SelectionChannel> {
        let Some(name) = selection else {
            return Ok(SelectionChannel::Clipboard);
        };
        SelectionChannel::resolve(name, self.config().sync_primary)
            .ok_or(SyncError::UnknownSelection)
    }

    /// Build a remote update from wire fields
    ///
    /// A missing timestamp becomes "now" and a missing node becomes `remote`.
    pub fn remote_update(
        &self,
        selection: Option<&str>,
        node: Option<&str>,
        timestamp: Option<i64>,
        text: Option<&str>,
    ) -> SyncResult<RemoteUpdate> {
        let channel = self.resolve_channel(selection)?;
        let text = text.ok_or(SyncError::MissingField("text"))?;
        Ok(RemoteUpdate {
            channel,
            timestamp: timestamp.unwrap_or_else(now_millis),
            node: node.unwrap_or(UNKNOWN_NODE).to_string(),
            text: text.to_string(),
        })
    }

    /// Reconcile a remote update and apply it if accepted
    ///
    /// On acceptance the channel is flagged as expecting an echo, the text is
    /// written to the clipboard, and the record is stored. The decision and
    /// the write happen under the state lock so concurrent updates to a
    /// channel are serialized. The clipboard write is synchronous and holds
    /// that lock, so a slow backend delays other store access until it
    /// returns.
    pub fn apply_remote(&self, update: &RemoteUpdate) -> SyncResult<Decision> {
        let mut outcome: SyncResult<Decision> = Ok(Decision::Accept);

        self.state.update_with(update.channel, |current| {
            let decision = decide(
                current,
                update.timestamp,
                &update.node,
                &update.text,
                self.node_id(),
            );
            if !decision.is_accept() {
                outcome = Ok(decision);
                return None;
            }

            self.echo.mark(update.channel);
            if let Err(e) = self.clipboard.set_text(update.channel, &update.text) {
                self.echo.unmark(update.channel);
                outcome = Err(e);
                return None;
            }

            Some(StateRecord::new(
                update.text.clone(),
                update.timestamp,
                update.node.clone(),
            ))
        });

        match &outcome {
            Ok(Decision::Accept) => info!(
                "Applied {} update from {} (timestamp {})",
                update.channel, update.node, update.timestamp
            ),
            Ok(decision) => debug!(
                "Ignored {} update from {}: {:?}",
                update.channel, update.node, decision
            ),
            Err(_) => {}
        }

        outcome
    }

    /// Record a user-initiated change and build the update to push
    pub fn record_local(&self, channel: SelectionChannel, text: &str) -> Request {
        let timestamp = now_millis();
        self.state.record(
            channel,
            StateRecord::new(text, timestamp, self.node_id()),
        );

        let config = self.config();
        Request::update(
            self.node_id(),
            channel,
            timestamp,
            text,
            &config.shared_secret,
        )
    }

    /// Record a user-initiated change and push it to the peer
    ///
    /// The push runs in the background; its outcome is only logged.
    pub fn publish_local(self: &Arc<Self>, channel: SelectionChannel, text: &str) {
        let request = self.record_local(channel, text);
        let client = self.client();
        if client.endpoint().is_none() {
            debug!("No peer endpoint configured, not pushing {} change", channel);
            return;
        }

        tokio::spawn(async move {
            if let Some(response) = client.send(&request, true).await {
                debug!("Push of {} answered with {:?}", channel, response.status);
            }
        });
    }

    /// React to a change notification for a channel
    ///
    /// Changes caused by a remote write are swallowed; anything else is
    /// read from the clipboard and published.
    pub fn handle_local_change(self: &Arc<Self>, channel: SelectionChannel) -> SyncResult<()> {
        if self.echo.take(channel) {
            debug!("Suppressed echo on {}", channel);
            return Ok(());
        }

        if let Some(text) = self.clipboard.get_text(channel)? {
            self.publish_local(channel, &text);
        }
        Ok(())
    }
}
