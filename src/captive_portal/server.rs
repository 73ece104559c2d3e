//! HTTP 服务器：每次循环最多处理一个连接，一问一答后关闭

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

use super::handlers::{Portal, Reply};
use crate::config::PortalConfig;
use crate::credentials::Storage;

/// Requests are cut off past this size.
const MAX_REQUEST_LEN: usize = 4096;

/// What happened to the connection serviced by [`HttpServer::serve_pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// No connection was waiting.
    Idle,
    Served,
    /// The client sent nothing and empty requests are not answered.
    Dropped,
    /// New credentials were saved; the device must restart.
    Restart,
}

pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("HTTP server listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Takes one waiting connection, if any, and runs a full exchange on it.
    pub async fn serve_pending<S: Storage>(
        &self,
        portal: &mut Portal<'_, S>,
        config: &PortalConfig,
    ) -> Exchange {
        let (mut stream, peer) = match self.listener.accept().now_or_never() {
            None => return Exchange::Idle,
            Some(Ok(accepted)) => accepted,
            Some(Err(e)) => {
                log::warn!("HTTP accept error: {:?}", e);
                return Exchange::Idle;
            }
        };

        let raw = read_request(&mut stream, config.http_read_timeout, config.http_idle_gap).await;
        if raw.is_empty() && !config.render_on_empty_request {
            log::info!("Client {} sent nothing, closing", peer);
            return Exchange::Dropped;
        }

        let request = String::from_utf8_lossy(&raw);
        log::info!(
            "HTTP {} {:?}",
            peer,
            request.lines().next().unwrap_or_default()
        );

        let reply = portal.handle(&request);
        if let Err(e) = write_reply(&mut stream, &reply).await {
            log::warn!("Failed to answer {}: {:?}", peer, e);
        }
        log::info!("HTTP {} -> {}", peer, reply.status);

        if reply.restart {
            Exchange::Restart
        } else {
            Exchange::Served
        }
    }
}

/// Reads until the peer closes, the budget runs out, or the header separator
/// has been seen and the connection stays quiet for `idle_gap`.
pub async fn read_request(stream: &mut TcpStream, budget: Duration, idle_gap: Duration) -> Vec<u8> {
    let deadline = Instant::now() + budget;
    let mut request = Vec::new();
    let mut chunk = [0u8; 512];

    while request.len() < MAX_REQUEST_LEN {
        let wait_until = if has_separator(&request) {
            deadline.min(Instant::now() + idle_gap)
        } else {
            deadline
        };

        match tokio::time::timeout_at(wait_until, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => request.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => {
                log::warn!("HTTP read error: {:?}", e);
                break;
            }
            Err(_) => break,
        }
    }

    request
}

fn has_separator(request: &[u8]) -> bool {
    request.windows(4).any(|w| w == b"\r\n\r\n")
}

pub async fn write_reply(stream: &mut TcpStream, reply: &Reply) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status.as_u16(),
        reply.status.canonical_reason().unwrap_or_default(),
        reply.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(reply.body.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}
