//! Node identity command handler

use anyhow::Result;

use selsync_core::{NodeIdentity, Settings};

use crate::output::{Output, OutputFormat};

/// Show this node's id, creating it on first use
pub fn show(settings: &Settings, output: &Output) -> Result<()> {
    let identity = NodeIdentity::ensure(settings)?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "node_id": identity.id() }));
        }
        OutputFormat::Quiet => {
            println!("{}", identity.id());
        }
        OutputFormat::Human => {
            println!("Node ID: {}", identity.id());
            if let Some(path) = settings.path() {
                println!();
                println!("Stored in: {}", path.display());
            }
        }
    }

    Ok(())
}
