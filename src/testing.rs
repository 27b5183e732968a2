//! Loopback servers and fakes shared by the unit tests.

use crate::notice::Notice;
use crate::notifier::Notifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub enum HttpReply {
    Json(u16, String),
    /// Keep the connection open without ever answering
    Hang,
}

impl HttpReply {
    pub fn json(status: u16, body: &str) -> Self {
        HttpReply::Json(status, body.to_string())
    }
}

pub struct TestServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
}

/// Minimal HTTP/1.1 server answering GET requests through `handler(path)`
pub async fn spawn_http<F>(handler: F) -> TestServer
where
    F: Fn(&str) -> HttpReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(handler);

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                serve_connection(socket, handler.as_ref(), &counter).await;
            });
        }
    });

    TestServer {
        base_url: format!("http://{}/api", addr),
        hits,
    }
}

async fn serve_connection<F>(mut socket: TcpStream, handler: &F, counter: &AtomicUsize)
where
    F: Fn(&str) -> HttpReply,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    counter.fetch_add(1, Ordering::SeqCst);

    match handler(&path) {
        HttpReply::Json(status, body) => {
            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => "Unknown",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        HttpReply::Hang => {
            let _held = socket;
            std::future::pending::<()>().await;
        }
    }
}

/// Notifier that forwards every notice into a channel
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()> {
        self.tx.send(notice)?;
        Ok(())
    }
}
