//! One-shot push and pull against the configured peer

use std::io::Read;

use anyhow::{bail, Context, Result};

use selsync_core::models::now_millis;
use selsync_core::sync::{Request, Response, Status, SyncClient};
use selsync_core::{Config, NodeIdentity, SelectionChannel, Settings};

use crate::output::Output;

/// Push text to the peer
pub async fn push(
    settings: &Settings,
    selection: Option<String>,
    text: Option<String>,
    output: &Output,
) -> Result<()> {
    let config = settings.get();
    let channel = parse_selection(selection.as_deref())?;

    let text = match text {
        Some(text) => text,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read text from stdin")?;
            trim_trailing_newline(input)
        }
    };

    let identity = NodeIdentity::ensure(settings)?;
    let request = Request::update(
        identity.id(),
        channel,
        now_millis(),
        &text,
        &config.shared_secret,
    );

    let response = exchange(&config, &request).await?;
    output.print_response(&response);
    ensure_accepted(&response, "Push")
}

/// Fetch the peer's value of a selection
pub async fn pull(settings: &Settings, selection: Option<String>, output: &Output) -> Result<()> {
    let config = settings.get();
    let channel = parse_selection(selection.as_deref())?;

    let identity = NodeIdentity::ensure(settings)?;
    let request = Request::pull(identity.id(), channel, &config.shared_secret);

    let response = exchange(&config, &request).await?;
    output.print_response(&response);
    ensure_accepted(&response, "Pull")
}

/// Send one request to the configured peer and wait for the reply
pub(crate) async fn exchange(config: &Config, request: &Request) -> Result<Response> {
    let client = SyncClient::from_config(config);
    if client.endpoint().is_none() {
        bail!(
            "Peer endpoint not configured. Set it with:\n  \
             selsync config set peer_endpoint tcp://other-host:8765"
        );
    }

    client
        .try_send(request, true)
        .await?
        .context("Peer closed the connection without responding")
}

/// Parse a selection name given on the command line
///
/// Case-insensitive; the peer decides whether PRIMARY is enabled.
fn parse_selection(selection: Option<&str>) -> Result<SelectionChannel> {
    let Some(name) = selection else {
        return Ok(SelectionChannel::Clipboard);
    };

    match SelectionChannel::resolve(&name.trim().to_ascii_uppercase(), true) {
        Some(channel) => Ok(channel),
        None => bail!(
            "Unknown selection: '{}'\nValid selections: CLIPBOARD, PRIMARY",
            name
        ),
    }
}

fn ensure_accepted(response: &Response, action: &str) -> Result<()> {
    match response.status {
        Status::Unauthorized => bail!("{} rejected: shared secret does not match the peer", action),
        Status::Error => bail!(
            "{} failed: {}",
            action,
            response.message.as_deref().unwrap_or("peer reported an error")
        ),
        Status::Ok | Status::Ignored | Status::Empty => Ok(()),
    }
}

/// Drop the single line break `echo` and friends append
fn trim_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection(None).unwrap(), SelectionChannel::Clipboard);
        assert_eq!(
            parse_selection(Some("clipboard")).unwrap(),
            SelectionChannel::Clipboard
        );
        assert_eq!(
            parse_selection(Some("PRIMARY")).unwrap(),
            SelectionChannel::Primary
        );
        assert!(parse_selection(Some("SECONDARY")).is_err());
    }

    #[test]
    fn test_trim_trailing_newline() {
        assert_eq!(trim_trailing_newline("hello\n".to_string()), "hello");
        assert_eq!(trim_trailing_newline("hello\r\n".to_string()), "hello");
        assert_eq!(trim_trailing_newline("a\n\n".to_string()), "a\n");
        assert_eq!(trim_trailing_newline("plain".to_string()), "plain");
    }

    #[test]
    fn test_ensure_accepted() {
        assert!(ensure_accepted(&Response::ok(), "Push").is_ok());
        assert!(ensure_accepted(&Response::ignored(), "Push").is_ok());
        assert!(ensure_accepted(&Response::empty(), "Pull").is_ok());
        assert!(ensure_accepted(&Response::unauthorized(), "Push").is_err());

        let err = ensure_accepted(&Response::error("Unknown selection"), "Push").unwrap_err();
        assert_eq!(err.to_string(), "Push failed: Unknown selection");
    }

    #[tokio::test]
    async fn test_exchange_requires_peer() {
        let request = Request::pull("A", SelectionChannel::Clipboard, "s");
        let err = exchange(&Config::default(), &request).await.unwrap_err();
        assert!(err.to_string().contains("Peer endpoint not configured"));
    }
}
