//! Realtime block notifications from the observer WebSocket feed.

use crate::events::{self, ObserverMessage};
use crate::notice;
use crate::notifier::Notifier;
use anyhow::{bail, Result};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{timeout, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Upper bound for the TCP, TLS and WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keepalive ping period; a session silent for two periods is dropped
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(20);

/// Keeps one subscription to the event feed alive and forwards block events
pub struct NotificationListener<N> {
    url: String,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    ping_interval: Duration,
    notifier: N,
    state: watch::Sender<ListenerState>,
    failure_streak: u32,
}

impl<N: Notifier> NotificationListener<N> {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration, notifier: N) -> Self {
        let (state, _) = watch::channel(ListenerState::Disconnected);
        Self {
            url: url.into(),
            reconnect_delay,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            notifier,
            state,
            failure_streak: 0,
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, ping_interval: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.ping_interval = ping_interval;
        self
    }

    /// Observe connection state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Run until a shutdown signal arrives, reconnecting after every drop
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(url = %self.url, "WebSocket: initiating connection");

        loop {
            self.set_state(ListenerState::Connecting);

            let connected = tokio::select! {
                _ = shutdown.recv() => break,
                res = timeout(self.connect_timeout, connect_async(self.url.as_str())) => res,
            };

            match connected {
                Ok(Ok((mut stream, _))) => {
                    self.failure_streak = 0;
                    self.set_state(ListenerState::Subscribed);
                    info!(url = %self.url, "WebSocket: connected");

                    let outcome = tokio::select! {
                        _ = shutdown.recv() => None,
                        res = self.consume(&mut stream) => Some(res),
                    };
                    let Some(outcome) = outcome else {
                        let _ = stream.close(None).await;
                        break;
                    };

                    match outcome {
                        Ok(()) => self.report_failure("connection closed"),
                        Err(err) => self.report_failure(err),
                    }
                }
                Ok(Err(err)) => self.report_failure(format!("connection failed: {}", err)),
                Err(_) => self.report_failure(format!(
                    "connection attempt timed out after {}s",
                    self.connect_timeout.as_secs_f32()
                )),
            }

            self.set_state(ListenerState::Disconnected);

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ListenerState::Disconnected);
        info!("WebSocket: listener stopped");
    }

    /// Read frames until the peer closes, errors or goes quiet
    async fn consume<S>(&self, stream: &mut S) -> Result<()>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin,
    {
        let mut last_frame = Instant::now();
        let mut keepalive =
            tokio::time::interval_at(last_frame + self.ping_interval, self.ping_interval);

        loop {
            let next = tokio::select! {
                message = stream.next() => Some(message),
                _ = keepalive.tick() => None,
            };

            let Some(message) = next else {
                if last_frame.elapsed() >= self.ping_interval * 2 {
                    bail!(
                        "no frames for {}s, dropping stale connection",
                        last_frame.elapsed().as_secs_f32()
                    );
                }
                stream.send(Message::Ping(Vec::new())).await?;
                continue;
            };

            let Some(message) = message else {
                return Ok(());
            };
            last_frame = Instant::now();

            match message? {
                Message::Text(text) => {
                    self.handle_text(&text).await;
                }
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        self.handle_text(text).await;
                    }
                    Err(_) => warn!(len = bytes.len(), "WebSocket: skipping non UTF-8 frame"),
                },
                Message::Close(frame) => {
                    debug!(?frame, "WebSocket: close frame received");
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Process one frame; returns whether a notification was posted
    pub async fn handle_text(&self, text: &str) -> bool {
        match events::parse_message(text) {
            Ok(ObserverMessage::Block(event)) => {
                info!(
                    kind = event.kind.tag(),
                    height = event.height(),
                    "WebSocket: new block event"
                );
                match self.notifier.notify(notice::block_event(&event)).await {
                    Ok(()) => {
                        info!(height = event.height(), "WebSocket: sent new block notification");
                        true
                    }
                    Err(err) => {
                        error!(error = %err, "WebSocket: failed to send notification");
                        false
                    }
                }
            }
            Ok(ObserverMessage::Orphaned(payload)) => {
                info!(%payload, "WebSocket: orphaned block event received");
                false
            }
            Ok(ObserverMessage::Other(kind)) => {
                debug!(?kind, "WebSocket: unhandled event type");
                false
            }
            Err(err) => {
                warn!(error = %err, "WebSocket: skipping malformed message");
                false
            }
        }
    }

    fn report_failure(&mut self, reason: impl Display) {
        self.failure_streak += 1;
        let delay = self.reconnect_delay.as_secs_f32();
        if self.failure_streak == 1 {
            warn!("WebSocket: {}. Reconnecting in {}s", reason, delay);
        } else {
            debug!(
                attempt = self.failure_streak,
                "WebSocket: {}. Reconnecting in {}s", reason, delay
            );
        }
    }

    fn set_state(&self, state: ListenerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "WebSocket: state change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Notice;
    use crate::testing::RecordingNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    const FOUND: &str = r#"{"type":"found_block","found_block":{"height":12345,"timestamp":1700000000,"miner_address":"abc...","difficulty":50000}}"#;
    const SIDE: &str = r#"{"type":"side_block","side_block":{"side_height":12346,"timestamp":1700000010,"miner_address":"def...","difficulty":51000}}"#;

    fn listener(
        url: &str,
        delay: Duration,
    ) -> (
        NotificationListener<RecordingNotifier>,
        mpsc::UnboundedReceiver<Notice>,
    ) {
        let (notifier, rx) = RecordingNotifier::new();
        (NotificationListener::new(url, delay, notifier), rx)
    }

    #[tokio::test]
    async fn test_found_block_posts_one_notification_with_all_values() {
        let (listener, mut rx) = listener("ws://127.0.0.1:1", Duration::from_secs(1));

        assert!(listener.handle_text(FOUND).await);

        let notice = rx.recv().await.unwrap();
        let text = notice.text();
        assert!(text.contains("12345"));
        assert!(text.contains("1700000000"));
        assert!(text.contains("abc..."));
        assert!(text.contains("50000"));
        assert!(notice.title.contains("Found Block"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unrecognized_and_malformed_messages_post_nothing() {
        let (listener, mut rx) = listener("ws://127.0.0.1:1", Duration::from_secs(1));

        for text in [
            r#"{"type":"orphaned_block","orphaned_block":{"side_height":1}}"#,
            r#"{"type":"something_new","something_new":{"side_height":1}}"#,
            r#"{"no_type":true}"#,
            r#"{"type":"side_block"}"#,
            "garbage",
        ] {
            assert!(!listener.handle_text(text).await, "{text}");
        }

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reconnects_after_disconnect_and_keeps_delivering() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", server.local_addr().unwrap());

        tokio::spawn(async move {
            // First session: one event, then the server hangs up
            let (tcp, _) = server.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(FOUND.to_string())).await.unwrap();
            ws.close(None).await.unwrap();
            drop(ws);

            // Second session stays open
            let (tcp, _) = server.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"type":"ping"}"#.to_string())).await.unwrap();
            ws.send(Message::Text("garbage".to_string())).await.unwrap();
            ws.send(Message::Text(SIDE.to_string())).await.unwrap();
            std::future::pending::<()>().await;
        });

        let (listener, mut rx) = listener(&url, Duration::from_millis(50));
        let mut states = listener.subscribe_state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.field_value("Height"), Some("12345"));

        let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second.field_value("Sidechain Height"), Some("12346"));
        assert!(second.title.contains("Side Block"));

        assert_eq!(*states.borrow_and_update(), ListenerState::Subscribed);

        shutdown_tx.send(()).unwrap();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert_eq!(*states.borrow(), ListenerState::Disconnected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_reconnect_delay() {
        // Grab a free port and release it so connections are refused
        let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", reserved.local_addr().unwrap());
        drop(reserved);

        let (listener, _rx) = listener(&url, Duration::from_secs(3600));
        let mut states = listener.subscribe_state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        // Wait until the first attempt failed and the listener is sleeping
        timeout(Duration::from_secs(5), async {
            loop {
                states.changed().await.unwrap();
                if *states.borrow_and_update() == ListenerState::Disconnected {
                    break;
                }
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(()).unwrap();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    /// Accept connections forever, counting them and holding each socket open
    fn count_accepts(server: TcpListener, upgrade: bool) -> Arc<AtomicUsize> {
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            let mut sockets = Vec::new();
            let mut sessions = Vec::new();
            loop {
                let (tcp, _) = server.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                if upgrade {
                    // Complete the handshake, then never read or write again
                    sessions.push(tokio_tungstenite::accept_async(tcp).await.unwrap());
                } else {
                    // Never answer the HTTP upgrade request
                    sockets.push(tcp);
                }
            }
        });
        accepts
    }

    async fn wait_for_accepts(accepts: &AtomicUsize, count: usize) {
        timeout(Duration::from_secs(5), async {
            while accepts.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out_and_retries() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", server.local_addr().unwrap());
        let accepts = count_accepts(server, false);

        let (listener, _rx) = listener(&url, Duration::from_millis(50));
        let listener = listener.with_timeouts(Duration::from_millis(200), Duration::from_secs(20));
        let mut states = listener.subscribe_state();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        wait_for_accepts(&accepts, 2).await;
        assert_ne!(*states.borrow_and_update(), ListenerState::Subscribed);

        shutdown_tx.send(()).unwrap();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_silent_peer_is_dropped_and_reconnected() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", server.local_addr().unwrap());
        let accepts = count_accepts(server, true);

        let (listener, _rx) = listener(&url, Duration::from_millis(50));
        let listener = listener.with_timeouts(Duration::from_secs(5), Duration::from_millis(100));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        // The first session never answers pings, so the listener must dial again
        wait_for_accepts(&accepts, 2).await;

        shutdown_tx.send(()).unwrap();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
