//! Sync server implementation
//!
//! Every inbound connection carries one request line and gets one response
//! line, then the connection is closed. Connections are handled in their
//! own tasks; a failure in one never affects another.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use subtle::ConstantTimeEq;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use super::message::{
    parse_line, secret_of, Request, Response, MAX_LINE_BYTES, TYPE_PULL, TYPE_UPDATE,
};
use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};

/// Bound sync server
pub struct SyncServer {
    listener: TcpListener,
    ctx: Arc<SyncContext>,
}

impl SyncServer {
    /// Bind the listener
    pub async fn bind<A: ToSocketAddrs>(ctx: Arc<SyncContext>, addr: A) -> SyncResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, ctx })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SyncResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is cancelled
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Sync server listening on {}", addr);
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let ctx = self.ctx.clone();
                    tokio::spawn(handle_connection(ctx, stream, peer));
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    // Back off so a persistent error (e.g. out of fds) doesn't spin
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// Serve one connection: read a line, answer it, close
async fn handle_connection(ctx: Arc<SyncContext>, mut stream: TcpStream, peer: SocketAddr) {
    debug!("Connection from {}", peer);

    let response = match read_request_line(&mut stream).await {
        Ok(line) => handle_line(&ctx, &line),
        Err(e) => Response::from_error(&e),
    };

    match response.encode_line() {
        Ok(line) => {
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                warn!("Failed to write response to {}: {}", peer, e);
            }
        }
        Err(e) => warn!("Failed to encode response for {}: {}", peer, e),
    }

    if let Err(e) = stream.shutdown().await {
        debug!("Error closing connection from {}: {}", peer, e);
    }
}

/// Read one newline-terminated UTF-8 line, capped at `MAX_LINE_BYTES`
async fn read_request_line(stream: &mut TcpStream) -> SyncResult<String> {
    let mut line = String::new();
    let mut reader = BufReader::new(stream).take(MAX_LINE_BYTES as u64 + 1);

    reader.read_line(&mut line).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            SyncError::Protocol("Payload is not valid UTF-8".to_string())
        } else {
            SyncError::Io(e)
        }
    })?;

    if line.len() > MAX_LINE_BYTES {
        return Err(SyncError::Protocol("Payload too large".to_string()));
    }
    Ok(line)
}

/// Answer one protocol line
///
/// Every failure is folded into the response.
pub fn handle_line(ctx: &SyncContext, line: &str) -> Response {
    match dispatch(ctx, line) {
        Ok(response) => response,
        Err(e) => {
            if e.is_client_fault() {
                debug!("Rejected request: {}", e);
            } else {
                warn!("Failed to handle request: {}", e);
            }
            Response::from_error(&e)
        }
    }
}

fn dispatch(ctx: &SyncContext, line: &str) -> SyncResult<Response> {
    let object = parse_line(line)?;

    let config = ctx.config();
    if !secrets_match(&config.shared_secret, secret_of(&object)) {
        return Err(SyncError::Unauthorized);
    }

    let request = Request::from_object(object)?;
    match request.kind.as_deref() {
        Some(TYPE_UPDATE) => {
            let update = ctx.remote_update(
                request.selection.as_deref(),
                request.node.as_deref(),
                request.timestamp,
                request.text.as_deref(),
            )?;
            let decision = ctx.apply_remote(&update)?;
            Ok(if decision.is_accept() {
                Response::ok()
            } else {
                Response::ignored()
            })
        }
        Some(TYPE_PULL) => {
            let channel = ctx.resolve_channel(request.selection.as_deref())?;
            Ok(match ctx.state().get(channel) {
                Some(record) => Response::snapshot(ctx.node_id(), channel, &record),
                None => Response::empty(),
            })
        }
        Some(other) => Err(SyncError::UnsupportedType(other.to_string())),
        None => Err(SyncError::MissingField("type")),
    }
}

/// Compare secrets without short-circuiting on the first differing byte
fn secrets_match(expected: &str, provided: Option<&str>) -> bool {
    match provided {
        Some(provided) => expected.as_bytes().ct_eq(provided.as_bytes()).into(),
        None => false,
    }
}
