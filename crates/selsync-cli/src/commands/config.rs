//! Config command handlers

use anyhow::{bail, Context, Result};

use selsync_core::sync::resolve_endpoint;
use selsync_core::{Config, Settings};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(settings: &Settings, output: &Output) -> Result<()> {
    let config = settings.get();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "listen_port": config.listen_port,
                    "peer_endpoint": config.peer_endpoint,
                    "shared_secret_set": !config.shared_secret.is_empty(),
                    "poll_interval": config.poll_interval,
                    "sync_primary": config.sync_primary,
                    "node_id": config.node_id,
                    "log_file": config.log_file,
                    "config_file": settings.path(),
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(path) = settings.path() {
                println!("{}", path.display());
            }
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  listen_port:   {}", config.listen_port);
            println!(
                "  peer_endpoint: {}",
                config.peer_endpoint().unwrap_or("(not set)")
            );
            println!(
                "  shared_secret: {}",
                if config.shared_secret.is_empty() {
                    "(not set)"
                } else {
                    "********"
                }
            );
            println!("  poll_interval: {}s", config.poll_interval);
            println!("  sync_primary:  {}", config.sync_primary);
            println!(
                "  node_id:       {}",
                config.node_id().unwrap_or("(not created yet)")
            );
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            if let Some(path) = settings.path() {
                println!();
                println!("Config file: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(settings: &Settings, key: &str, value: &str, output: &Output) -> Result<()> {
    // Validate against a copy first so a bad value never reaches the file.
    // Start from the file layer so environment overrides stay out of it.
    let mut candidate = settings.file_config();
    apply(&mut candidate, key, value)?;

    settings
        .update(|config| *config = candidate)
        .context("Failed to save configuration")?;

    let shown = if key == "shared_secret" { "********" } else { value };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Apply one `key = value` assignment to a configuration
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "listen_port" => {
            config.listen_port = value
                .trim()
                .parse()
                .context("Invalid value for listen_port. Use a number from 1 to 65535.")?;
            config.listen_port()?;
        }
        "peer_endpoint" => {
            config.peer_endpoint = if value.trim().is_empty() || value == "none" {
                None
            } else {
                resolve_endpoint(value, config.listen_port)
                    .with_context(|| format!("Invalid value for peer_endpoint: '{}'", value))?;
                Some(value.trim().to_string())
            };
        }
        "shared_secret" => {
            config.shared_secret = value.to_string();
        }
        "poll_interval" => {
            config.poll_interval = value
                .trim()
                .parse()
                .context("Invalid value for poll_interval. Use a number of seconds (0 disables).")?;
        }
        "sync_primary" => {
            config.sync_primary = value
                .trim()
                .parse()
                .context("Invalid value for sync_primary. Use 'true' or 'false'.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "node_id" => {
            bail!("node_id is generated on first run and cannot be set");
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: listen_port, peer_endpoint, shared_secret, poll_interval, sync_primary, log_file",
                key
            );
        }
    }

    Ok(())
}
