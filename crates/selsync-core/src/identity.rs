//! Node identity management
//!
//! Every node has a stable random identifier. It is stamped as the origin
//! of locally produced updates and used to drop updates that come back
//! to the node that produced them.
//!
//! The identifier is created on first use and stored in the configuration
//! as `node_id`. It is never regenerated while a value exists.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Settings;

/// The identity of this node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    id: String,
}

impl NodeIdentity {
    /// Load the persisted node id, creating and persisting one if absent or blank
    pub fn ensure(settings: &Settings) -> Result<Self> {
        if let Some(id) = settings.get().node_id() {
            return Ok(Self { id: id.to_string() });
        }

        let id = generate_id();
        settings
            .update(|config| config.node_id = Some(id.clone()))
            .context("Failed to persist node id")?;
        info!("Generated new node id {}", id);

        Ok(Self { id })
    }

    /// Use a fixed id (tests, one-shot commands)
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The node id
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
