//! Polling fallback for clipboards without change notifications
//!
//! Reads every watched channel on a short fixed interval and publishes the
//! text when it differs from what was last seen. The first read of a
//! channel only establishes the baseline, so whatever was on the clipboard
//! before startup is not pushed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::context::SyncContext;
use crate::models::SelectionChannel;
use crate::scheduler::Scheduler;

/// How often watched channels are read
pub const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Detects local clipboard edits by polling
pub struct LocalChangeWatcher {
    ctx: Arc<SyncContext>,
    channels: Vec<SelectionChannel>,
    last_observed: HashMap<SelectionChannel, Option<String>>,
}

impl LocalChangeWatcher {
    pub fn new(ctx: Arc<SyncContext>, channels: Vec<SelectionChannel>) -> Self {
        Self {
            ctx,
            channels,
            last_observed: HashMap::new(),
        }
    }

    pub fn channels(&self) -> &[SelectionChannel] {
        &self.channels
    }

    /// Read every watched channel once
    ///
    /// Returns the channels whose change was published.
    pub fn tick(&mut self) -> Vec<SelectionChannel> {
        let mut published = Vec::new();

        for &channel in &self.channels {
            let text = match self.ctx.clipboard().get_text(channel) {
                Ok(text) => text,
                Err(e) => {
                    debug!("Failed to read {}: {}", channel, e);
                    continue;
                }
            };

            if self.ctx.echo().take(channel) {
                debug!("Suppressed echo on {}", channel);
                self.last_observed.insert(channel, text);
                continue;
            }

            match self.last_observed.get(&channel) {
                None => {
                    self.last_observed.insert(channel, text);
                    continue;
                }
                Some(previous) if *previous == text => continue,
                Some(_) => {}
            }

            self.last_observed.insert(channel, text.clone());
            if let Some(text) = text {
                self.ctx.publish_local(channel, &text);
                published.push(channel);
            }
        }

        published
    }

    /// Register the polling timer
    pub fn start(self, scheduler: &mut Scheduler) {
        debug!("Polling clipboard channels {:?}", self.channels);
        let mut watcher = self;
        scheduler.every("local-change-watcher", WATCH_INTERVAL, move || {
            watcher.tick();
            std::future::ready(())
        });
    }
}
