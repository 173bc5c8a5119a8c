//! Sync client implementation
//!
//! Opens one TCP connection per message: write one request line, optionally
//! read one response line, close. No retries; a failed request is logged
//! and reported as "no response".

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use url::{Host, Url};

use super::message::{Request, Response};
use crate::config::Config;
use crate::error::{SyncError, SyncResult};

/// Client for the configured peer
#[derive(Debug, Clone)]
pub struct SyncClient {
    /// Peer URI as configured
    endpoint: Option<String>,
    /// Port used when the endpoint has none
    fallback_port: u32,
}

impl SyncClient {
    /// Create a new sync client
    pub fn new(endpoint: Option<&str>, fallback_port: u32) -> Self {
        Self {
            endpoint: endpoint.map(str::to_string),
            fallback_port,
        }
    }

    /// Client for the peer named in the configuration
    ///
    /// Endpoints without a port use this node's own listen port.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.peer_endpoint(), config.listen_port)
    }

    /// Configured peer endpoint
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Send a request, logging and swallowing any failure
    pub async fn send(&self, request: &Request, expect_response: bool) -> Option<Response> {
        match self.try_send(request, expect_response).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Sync request failed: {}", e);
                None
            }
        }
    }

    /// Send a request
    ///
    /// Returns `Ok(None)` when no response was requested.
    pub async fn try_send(
        &self,
        request: &Request,
        expect_response: bool,
    ) -> SyncResult<Option<Response>> {
        let Some(ref endpoint) = self.endpoint else {
            return Err(SyncError::Configuration(
                "Peer endpoint not configured".to_string(),
            ));
        };
        let (host, port) = resolve_endpoint(endpoint, self.fallback_port)?;
        let address = format!("{}:{}", host, port);
        let line = request.encode_line()?;

        debug!("Connecting to {}", address);
        let mut stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| SyncError::network(&address, e))?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SyncError::network(&address, e))?;

        if !expect_response {
            if let Err(e) = stream.shutdown().await {
                debug!("Error closing connection to {}: {}", address, e);
            }
            return Ok(None);
        }

        let mut reply = String::new();
        let read = BufReader::new(&mut stream)
            .read_line(&mut reply)
            .await
            .map_err(|e| SyncError::network(&address, e))?;

        if let Err(e) = stream.shutdown().await {
            debug!("Error closing connection to {}: {}", address, e);
        }

        if read == 0 {
            return Err(SyncError::Protocol(format!(
                "{} closed the connection without responding",
                address
            )));
        }

        let response = Response::decode(&reply)?;
        debug!("Response from {}: {:?}", address, response.status);
        Ok(Some(response))
    }
}

/// Resolve a peer URI to a host and port
///
/// A bare `host[:port]` is accepted as if it had a `tcp://` scheme.
pub fn resolve_endpoint(endpoint: &str, fallback_port: u32) -> SyncResult<(String, u16)> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(SyncError::Configuration(
            "Peer endpoint not configured".to_string(),
        ));
    }

    let uri = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("tcp://{}", endpoint)
    };

    let url = Url::parse(&uri).map_err(|e| {
        SyncError::Configuration(format!("Invalid peer endpoint '{}': {}", endpoint, e))
    })?;

    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => {
            return Err(SyncError::Configuration(format!(
                "Peer endpoint '{}' has no host",
                endpoint
            )))
        }
    };

    let port = match url.port() {
        Some(port) if port != 0 => port,
        Some(_) => {
            return Err(SyncError::Configuration(format!(
                "Peer endpoint '{}' has an invalid port",
                endpoint
            )))
        }
        None => match u16::try_from(fallback_port) {
            Ok(port) if port != 0 => port,
            _ => {
                return Err(SyncError::Configuration(format!(
                    "Peer endpoint '{}' has no port and listen port {} is invalid",
                    endpoint, fallback_port
                )))
            }
        },
    };

    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectionChannel;
    use tokio::net::TcpListener;

    #[test]
    fn test_resolve_with_port() {
        assert_eq!(
            resolve_endpoint("tcp://desktop.local:9000", 8765).unwrap(),
            ("desktop.local".to_string(), 9000)
        );
    }

    #[test]
    fn test_resolve_falls_back_to_listen_port() {
        assert_eq!(
            resolve_endpoint("tcp://desktop.local", 8765).unwrap(),
            ("desktop.local".to_string(), 8765)
        );
    }

    #[test]
    fn test_resolve_bare_host() {
        assert_eq!(
            resolve_endpoint("10.0.0.7:4000", 8765).unwrap(),
            ("10.0.0.7".to_string(), 4000)
        );
    }

    #[test]
    fn test_resolve_ipv6() {
        assert_eq!(
            resolve_endpoint("tcp://[::1]:4000", 8765).unwrap(),
            ("::1".to_string(), 4000)
        );
    }

    #[test]
    fn test_resolve_failures() {
        for endpoint in ["", "   ", "tcp://", "tcp://host:notaport", "tcp:///path"] {
            assert!(
                matches!(
                    resolve_endpoint(endpoint, 8765),
                    Err(SyncError::Configuration(_))
                ),
                "expected failure for {:?}",
                endpoint
            );
        }
    }

    #[test]
    fn test_resolve_no_port_and_bad_fallback() {
        assert!(resolve_endpoint("tcp://host", 0).is_err());
        assert!(resolve_endpoint("tcp://host", 70000).is_err());
    }

    #[tokio::test]
    async fn test_send_without_endpoint_returns_none() {
        let client = SyncClient::new(None, 8765);
        let request = Request::pull("A", SelectionChannel::Clipboard, "s");

        assert!(client.send(&request, true).await.is_none());
        assert!(matches!(
            client.try_send(&request, true).await,
            Err(SyncError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_send_connection_refused_returns_none() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = SyncClient::new(Some(&format!("tcp://127.0.0.1:{}", port)), 8765);
        let request = Request::pull("A", SelectionChannel::Clipboard, "s");
        assert!(client.send(&request, true).await.is_none());
    }

    #[tokio::test]
    async fn test_send_reads_one_response_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let peer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(&mut socket).read_line(&mut line).await.unwrap();
            socket
                .write_all(b"{\"status\":\"empty\"}\n")
                .await
                .unwrap();
            line
        });

        let client = SyncClient::new(Some(&format!("127.0.0.1:{}", port)), 8765);
        let request = Request::pull("A", SelectionChannel::Clipboard, "s");
        let response = client.send(&request, true).await.unwrap();

        assert_eq!(response, Response::empty());
        let received = peer.await.unwrap();
        assert_eq!(received, request.encode_line().unwrap());
    }

    #[tokio::test]
    async fn test_send_without_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let peer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(&mut socket).read_line(&mut line).await.unwrap();
            line
        });

        let client = SyncClient::new(Some(&format!("127.0.0.1:{}", port)), 8765);
        let request = Request::update("A", SelectionChannel::Clipboard, 5, "x", "s");
        assert!(client.send(&request, false).await.is_none());
        assert!(peer.await.unwrap().contains("\"text\":\"x\""));
    }
}
