use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::{AppError, Result};

/// Messages buffered between the accept loop and the ingestion loop.
pub const FEED_QUEUE_CAPACITY: usize = 10_000;

/// Longest accepted TCP line, excluding the newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Parsed inbound bind address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEndpoint {
    /// Newline-delimited JSON over raw TCP.
    Tcp(String),
    /// One JSON message per WebSocket text frame.
    WebSocket(String),
}

impl FeedEndpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)?;
        let host = match url.host_str() {
            Some("*") | None => "0.0.0.0",
            Some(host) => host,
        };
        let port = url
            .port()
            .ok_or_else(|| AppError::Config(format!("feed address `{raw}` has no port")))?;
        let addr = format!("{host}:{port}");
        match url.scheme() {
            "tcp" => Ok(Self::Tcp(addr)),
            "ws" => Ok(Self::WebSocket(addr)),
            other => Err(AppError::Config(format!(
                "unsupported feed scheme `{other}` (expected tcp or ws)"
            ))),
        }
    }

    fn addr(&self) -> &str {
        match self {
            Self::Tcp(addr) | Self::WebSocket(addr) => addr,
        }
    }
}

/// Bound inbound endpoint draining into a single queue.
pub struct FeedListener {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<String>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl FeedListener {
    pub async fn bind(raw: &str) -> Result<Self> {
        let endpoint = FeedEndpoint::parse(raw)?;
        let listener = TcpListener::bind(endpoint.addr()).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel(FEED_QUEUE_CAPACITY);
        info!(%local_addr, ?endpoint, "[FEED] listening");

        let accept_task = spawn_accept_loop(listener, endpoint, tx);
        Ok(Self {
            local_addr,
            rx,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next inbound message; `None` once the accept loop has stopped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for FeedListener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn spawn_accept_loop(
    listener: TcpListener,
    endpoint: FeedEndpoint,
    tx: mpsc::Sender<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "[FEED] accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            debug!(%peer, "[FEED] pusher connected");
            let tx = tx.clone();
            match endpoint {
                FeedEndpoint::Tcp(_) => {
                    tokio::spawn(read_lines(stream, peer, tx));
                }
                FeedEndpoint::WebSocket(_) => {
                    tokio::spawn(read_frames(stream, peer, tx));
                }
            }
        }
    })
}

async fn read_lines(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let limit = MAX_LINE_BYTES as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(%peer, error = %e, "[FEED] connection error");
                break;
            }
        }
        if buf.len() > MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            warn!(%peer, max_bytes = MAX_LINE_BYTES, "[FEED] line too long, dropping pusher");
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(%peer, error = %e, "[FEED] dropping non UTF-8 message");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        if tx.send(line.to_string()).await.is_err() {
            return;
        }
    }
    debug!(%peer, "[FEED] pusher disconnected");
}

async fn read_frames(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<String>) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "[FEED] websocket handshake failed");
            return;
        }
    };
    while let Some(msg) = ws.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%peer, error = %e, "[FEED] dropping non UTF-8 frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%peer, error = %e, "[FEED] websocket message error");
                break;
            }
        };
        if tx.send(text).await.is_err() {
            return;
        }
    }
    debug!(%peer, "[FEED] pusher disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn parses_supported_endpoints() {
        assert_eq!(
            FeedEndpoint::parse("tcp://0.0.0.0:5555").unwrap(),
            FeedEndpoint::Tcp("0.0.0.0:5555".into())
        );
        assert_eq!(
            FeedEndpoint::parse("tcp://*:5555").unwrap(),
            FeedEndpoint::Tcp("0.0.0.0:5555".into())
        );
        assert_eq!(
            FeedEndpoint::parse("ws://127.0.0.1:9001").unwrap(),
            FeedEndpoint::WebSocket("127.0.0.1:9001".into())
        );
    }

    #[test]
    fn rejects_unsupported_endpoints() {
        assert!(matches!(
            FeedEndpoint::parse("udp://0.0.0.0:5555"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            FeedEndpoint::parse("tcp://0.0.0.0"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            FeedEndpoint::parse("not a url"),
            Err(AppError::UrlParse(_))
        ));
    }

    #[tokio::test]
    async fn tcp_lines_are_queued_in_order() {
        let mut feed = FeedListener::bind("tcp://127.0.0.1:0").await.unwrap();
        let mut pusher = TcpStream::connect(feed.local_addr()).await.unwrap();
        pusher.write_all(b"{\"a\":1}\n\n").await.unwrap();
        pusher.write_all(b"\xff\xfe\n").await.unwrap();
        pusher.write_all(b"{\"a\":2}\r\n").await.unwrap();
        pusher.flush().await.unwrap();

        assert_eq!(feed.recv().await.as_deref(), Some("{\"a\":1}"));
        assert_eq!(feed.recv().await.as_deref(), Some("{\"a\":2}"));
    }

    #[tokio::test]
    async fn overlong_line_drops_only_that_pusher() {
        let mut feed = FeedListener::bind("tcp://127.0.0.1:0").await.unwrap();

        let mut flooder = TcpStream::connect(feed.local_addr()).await.unwrap();
        let mut blob = vec![b'x'; MAX_LINE_BYTES + 10];
        blob.extend_from_slice(b"\n{\"a\":1}\n");
        // the listener may reset the connection before everything is written
        let _ = flooder.write_all(&blob).await;

        let mut pusher = TcpStream::connect(feed.local_addr()).await.unwrap();
        pusher.write_all(b"{\"b\":2}\n").await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .unwrap();
        assert_eq!(next.as_deref(), Some("{\"b\":2}"));
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let mut feed = FeedListener::bind("tcp://127.0.0.1:0").await.unwrap();
        let mut pusher = TcpStream::connect(feed.local_addr()).await.unwrap();
        let mut line = vec![b'y'; MAX_LINE_BYTES];
        line.push(b'\n');
        pusher.write_all(&line).await.unwrap();

        let next = feed.recv().await.unwrap();
        assert_eq!(next.len(), MAX_LINE_BYTES);
    }

    #[tokio::test]
    async fn websocket_text_frames_are_queued() {
        let mut feed = FeedListener::bind("ws://127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", feed.local_addr());
        let (mut client, _resp) = tokio_tungstenite::connect_async(url).await.unwrap();
        client
            .send(Message::Text("{\"exchange\":\"kraken\"}".into()))
            .await
            .unwrap();
        client.send(Message::Binary(b"{}".to_vec())).await.unwrap();

        assert_eq!(
            feed.recv().await.as_deref(),
            Some("{\"exchange\":\"kraken\"}")
        );
        assert_eq!(feed.recv().await.as_deref(), Some("{}"));
    }
}
