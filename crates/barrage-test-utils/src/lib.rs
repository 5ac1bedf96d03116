//! Common test helpers for the Barrage crates
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - An in-memory [`MockTransport`] that hands each connection to the test
//! - Frame builders for server-side replies

use async_trait::async_trait;
use barrage_core::{decode_all, encode, Frame, Operation, ProtocolVersion};
use barrage_transport::{
    Result as TransportResult, Transport, TransportError, TransportEvent, TransportReceiver,
    TransportSender,
};
use bytes::Bytes;
use flate2::{write::ZlibEncoder, Compression};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::{timeout, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout. Uses Tokio's clock, so it also works
/// under paused time.
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

// ============================================================================
// Frame Builders
// ============================================================================

/// AUTH_REPLY with `{"code": code}`
pub fn auth_reply(code: i64) -> Bytes {
    let body = format!(r#"{{"code":{}}}"#, code);
    encode(
        Operation::AuthReply.code(),
        ProtocolVersion::Heartbeat.code(),
        1,
        body.as_bytes(),
    )
    .unwrap()
}

/// HEARTBEAT_REPLY carrying a popularity value
pub fn heartbeat_reply(value: u32) -> Bytes {
    encode(
        Operation::HeartbeatReply.code(),
        ProtocolVersion::Heartbeat.code(),
        1,
        &value.to_be_bytes(),
    )
    .unwrap()
}

/// Plain COMMAND frame
pub fn command(json: &str) -> Bytes {
    encode(
        Operation::Command.code(),
        ProtocolVersion::Plain.code(),
        0,
        json.as_bytes(),
    )
    .unwrap()
}

/// A `DANMU_MSG` command body
pub fn danmu_json(text: &str, user_id: u64, user_name: &str) -> String {
    format!(
        r#"{{"cmd":"DANMU_MSG","info":[[0,1,25,16777215,1700000000000],"{}",[{},"{}"]]}}"#,
        text, user_id, user_name
    )
}

/// Wrap already-encoded frames in one zlib-compressed COMMAND frame
pub fn zlib_batch(frames: &[Bytes]) -> Bytes {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for frame in frames {
        encoder.write_all(frame).unwrap();
    }
    let compressed = encoder.finish().unwrap();
    encode(
        Operation::Command.code(),
        ProtocolVersion::Zlib.code(),
        0,
        &compressed,
    )
    .unwrap()
}

/// Decode a message the client sent; panics unless it holds exactly one frame
pub fn single_frame(bytes: &[u8]) -> Frame {
    let mut frames = decode_all(bytes);
    assert_eq!(frames.len(), 1, "expected exactly one frame");
    frames.remove(0)
}

// ============================================================================
// Mock Transport
// ============================================================================

/// In-memory transport. Every successful `connect` produces a
/// [`MockConnection`] that the test receives from [`MockServer::accept`].
#[derive(Clone)]
pub struct MockTransport {
    connections: mpsc::UnboundedSender<MockConnection>,
    urls: Arc<Mutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
    failing_sends: Arc<AtomicU32>,
}

/// Test side of a [`MockTransport`]
pub struct MockServer {
    connections: mpsc::UnboundedReceiver<MockConnection>,
    urls: Arc<Mutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
    failing_sends: Arc<AtomicU32>,
}

impl MockTransport {
    pub fn new() -> (Self, MockServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let urls = Arc::new(Mutex::new(Vec::new()));
        let refuse = Arc::new(AtomicBool::new(false));
        let failing_sends = Arc::new(AtomicU32::new(0));
        (
            Self {
                connections: tx,
                urls: urls.clone(),
                refuse: refuse.clone(),
                failing_sends: failing_sends.clone(),
            },
            MockServer {
                connections: rx,
                urls,
                refuse,
                failing_sends,
            },
        )
    }
}

impl MockServer {
    /// Next accepted connection, or `None` after `max_wait`
    pub async fn accept(&mut self, max_wait: Duration) -> Option<MockConnection> {
        timeout(max_wait, self.connections.recv()).await.ok().flatten()
    }

    /// Every URL the client tried, including refused ones
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.urls.lock().len()
    }

    /// Make subsequent connects fail with `ConnectionFailed`
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make the next `count` sends (on any connection) fail with `SendFailed`.
    /// The link itself stays open and silent.
    pub fn fail_sends(&self, count: u32) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Sender = MockSender;
    type Receiver = MockReceiver;

    async fn connect(&self, url: &str) -> TransportResult<(MockSender, MockReceiver)> {
        self.urls.lock().push(url.to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Mutex::new(None));
        let close_notify = Arc::new(Notify::new());

        let connection = MockConnection {
            url: url.to_string(),
            sent: sent_rx,
            events: events_tx,
            closed: closed.clone(),
            close_notify: close_notify.clone(),
        };
        self.connections
            .send(connection)
            .map_err(|_| TransportError::ConnectionFailed("mock server gone".into()))?;

        Ok((
            MockSender {
                sent: sent_tx,
                closed,
                close_notify,
                failing_sends: self.failing_sends.clone(),
            },
            MockReceiver { events: events_rx },
        ))
    }
}

/// Sender half handed to the client
pub struct MockSender {
    sent: mpsc::UnboundedSender<Bytes>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
    close_notify: Arc<Notify>,
    failing_sends: Arc<AtomicU32>,
}

#[async_trait]
impl TransportSender for MockSender {
    async fn send(&self, data: Bytes) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let fail = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(TransportError::SendFailed("injected failure".into()));
        }
        self.sent
            .send(data)
            .map_err(|_| TransportError::SendFailed("mock connection dropped".into()))
    }

    fn is_connected(&self) -> bool {
        self.closed.lock().is_none()
    }

    async fn close(&self, code: u16, reason: &str) -> TransportResult<()> {
        let mut closed = self.closed.lock();
        if closed.is_none() {
            *closed = Some((code, reason.to_string()));
            self.close_notify.notify_one();
        }
        Ok(())
    }
}

/// Receiver half handed to the client
pub struct MockReceiver {
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for MockReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

/// Server end of one mock connection
pub struct MockConnection {
    pub url: String,
    sent: mpsc::UnboundedReceiver<Bytes>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
    close_notify: Arc<Notify>,
}

impl MockConnection {
    /// Next message the client sent
    pub async fn next_sent(&mut self, max_wait: Duration) -> Option<Bytes> {
        timeout(max_wait, self.sent.recv()).await.ok().flatten()
    }

    /// Next sent frame with the given operation, skipping others
    pub async fn next_sent_op(&mut self, op: Operation, max_wait: Duration) -> Option<Frame> {
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let bytes = self.next_sent(remaining).await?;
            let frame = single_frame(&bytes);
            if frame.op() == Some(op) {
                return Some(frame);
            }
        }
    }

    /// Deliver a binary message to the client
    pub fn push(&self, data: Bytes) {
        let _ = self.events.send(TransportEvent::Data(data));
    }

    /// Deliver a text message to the client
    pub fn push_text(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Text(text.to_string()));
    }

    /// Close from the server side
    pub fn close_remote(&self, reason: Option<&str>) {
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: reason.map(str::to_string),
        });
    }

    /// Code and reason of a local close, if the client closed
    pub fn close_info(&self) -> Option<(u16, String)> {
        self.closed.lock().clone()
    }

    /// Wait for the client to close this connection
    pub async fn wait_closed(&self, max_wait: Duration) -> Option<(u16, String)> {
        if let Some(info) = self.close_info() {
            return Some(info);
        }
        timeout(max_wait, self.close_notify.notified()).await.ok()?;
        self.close_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_roundtrip() {
        let (transport, mut server) = MockTransport::new();
        let (sender, mut receiver) = transport.connect("wss://h:443/sub").await.unwrap();
        let mut conn = server.accept(DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(conn.url, "wss://h:443/sub");

        sender.send(heartbeat_reply(3)).await.unwrap();
        let frame = single_frame(&conn.next_sent(DEFAULT_TIMEOUT).await.unwrap());
        assert_eq!(frame.op(), Some(Operation::HeartbeatReply));

        conn.push_text("hi");
        assert_eq!(
            receiver.recv().await,
            Some(TransportEvent::Text("hi".to_string()))
        );

        sender.close(1000, "bye").await.unwrap();
        assert!(!sender.is_connected());
        assert_eq!(
            conn.wait_closed(DEFAULT_TIMEOUT).await,
            Some((1000, "bye".to_string()))
        );
    }

    #[tokio::test]
    async fn test_injected_send_failure() {
        let (transport, mut server) = MockTransport::new();
        let (sender, _receiver) = transport.connect("wss://h:443/sub").await.unwrap();
        let mut conn = server.accept(DEFAULT_TIMEOUT).await.unwrap();

        server.fail_sends(1);
        assert!(matches!(
            sender.send(command("{}")).await,
            Err(TransportError::SendFailed(_))
        ));
        sender.send(command("{}")).await.unwrap();
        assert!(conn.next_sent(DEFAULT_TIMEOUT).await.is_some());
        assert!(sender.is_connected());
    }

    #[tokio::test]
    async fn test_refused() {
        let (transport, server) = MockTransport::new();
        server.refuse_connections(true);
        assert!(transport.connect("wss://h:443/sub").await.is_err());
        assert_eq!(server.attempts(), 1);
    }

    #[test]
    fn test_zlib_batch_expands() {
        let batch = zlib_batch(&[command("{}"), command("{}")]);
        assert_eq!(decode_all(&batch).len(), 2);
    }
}
