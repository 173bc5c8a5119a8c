//! Status command handler

use anyhow::Result;

use selsync_core::sync::message::UNKNOWN_NODE;
use selsync_core::sync::{Request, Response, Status};
use selsync_core::{SelectionChannel, Settings};

use crate::commands::sync::exchange;
use crate::output::{format_timestamp, truncate_line, Output, OutputFormat};

/// Show status information
///
/// Probes the peer with a CLIPBOARD pull when one is configured.
pub async fn show(settings: &Settings, output: &Output) -> Result<()> {
    let config = settings.get();

    let peer = match config.peer_endpoint() {
        Some(_) => {
            let node = config.node_id().unwrap_or(UNKNOWN_NODE);
            let request = Request::pull(node, SelectionChannel::Clipboard, &config.shared_secret);
            Some(exchange(&config, &request).await)
        }
        None => None,
    };

    match output.format {
        OutputFormat::Json => {
            let peer_json = match peer {
                Some(Ok(ref response)) => serde_json::json!({
                    "reachable": true,
                    "response": response,
                }),
                Some(Err(ref e)) => serde_json::json!({
                    "reachable": false,
                    "error": format!("{:#}", e),
                }),
                None => serde_json::Value::Null,
            };
            println!(
                "{}",
                serde_json::json!({
                    "node_id": config.node_id(),
                    "listen_port": config.listen_port,
                    "peer_endpoint": config.peer_endpoint(),
                    "poll_interval": config.poll_interval,
                    "sync_primary": config.sync_primary,
                    "peer": peer_json,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.node_id().unwrap_or(""));
        }
        OutputFormat::Human => {
            println!("selsync Status");
            println!("==============");
            println!();
            println!("Node:");
            println!(
                "  ID:          {}",
                config.node_id().unwrap_or("(not created yet)")
            );
            match config.listen_port() {
                Ok(port) => println!("  Listen port: {}", port),
                Err(e) => println!("  Listen port: {} ({})", config.listen_port, e),
            }
            println!(
                "  Selections:  {}",
                SelectionChannel::enabled(config.sync_primary)
                    .iter()
                    .map(SelectionChannel::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if config.poll_interval == 0 {
                println!("  Polling:     disabled");
            } else {
                println!("  Polling:     every {}s", config.poll_interval);
            }
            if config.shared_secret.is_empty() {
                println!("  Secret:      (not set)");
            }
            println!();
            println!("Peer:");
            match config.peer_endpoint() {
                Some(endpoint) => println!("  Endpoint: {}", endpoint),
                None => println!("  Endpoint: (not set)"),
            }
            if let Some(ref result) = peer {
                println!("  Status:   {}", describe_peer(result));
            }
            if let Some(Ok(ref response)) = peer {
                if response.is_update() {
                    println!(
                        "  CLIPBOARD: {}",
                        truncate_line(response.text.as_deref().unwrap_or(""), 50)
                    );
                    if let Some(timestamp) = response.timestamp {
                        println!("  Updated:  {}", format_timestamp(timestamp));
                    }
                }
            }
        }
    }

    Ok(())
}

fn describe_peer(result: &Result<Response>) -> String {
    match result {
        Ok(response) => match response.status {
            Status::Ok | Status::Empty | Status::Ignored => "reachable".to_string(),
            Status::Unauthorized => "reachable, shared secret rejected".to_string(),
            Status::Error => format!(
                "reachable, error: {}",
                response.message.as_deref().unwrap_or("unknown")
            ),
        },
        Err(e) => format!("unreachable ({:#})", e),
    }
}
