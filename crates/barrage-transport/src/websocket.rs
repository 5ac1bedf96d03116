//! WebSocket transport implementation

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header, HeaderValue},
        protocol::{frame::coding::CloseCode, CloseFrame, Message as WsMessage},
    },
};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportEvent, TransportReceiver, TransportSender};

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// User-Agent header sent with the upgrade request
    pub user_agent: String,
    /// Origin header sent with the upgrade request
    pub origin: Option<String>,
    /// Time allowed for TCP + TLS + upgrade
    pub connect_timeout: Duration,
    /// Outbound message buffer
    pub send_buffer: usize,
    /// Inbound event buffer
    pub event_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            origin: Some("https://live.bilibili.com".to_string()),
            connect_timeout: Duration::from_secs(10),
            send_buffer: 100,
            event_buffer: 256,
        }
    }
}

/// WebSocket transport
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

/// WebSocket sender
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    connected: Arc<Mutex<bool>>,
}

#[async_trait]
impl TransportSender for WebSocketSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(WsMessage::Binary(data.to_vec()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        let _ = self.tx.send(WsMessage::Close(Some(frame))).await;
        *self.connected.lock() = false;
        Ok(())
    }
}

/// WebSocket receiver
///
/// Dropping the receiver stops the reader task, so a half-dead socket
/// cannot outlive the attempt that opened it.
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<TransportEvent>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl TransportReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

impl Drop for WebSocketReceiver {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(&self, url: &str) -> Result<(Self::Sender, Self::Receiver)> {
        info!("Connecting to WebSocket: {}", url);

        url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let headers = request.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(header::USER_AGENT, value);
        }
        if let Some(origin) = self.config.origin.as_deref() {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(header::ORIGIN, value);
            }
        }

        let (ws_stream, response) =
            tokio::time::timeout(self.config.connect_timeout, connect_async(request))
                .await
                .map_err(|_| TransportError::Timeout)?
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("WebSocket connected, response: {:?}", response.status());

        let (write, read) = ws_stream.split();

        let (send_tx, mut send_rx) = mpsc::channel::<WsMessage>(self.config.send_buffer);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.config.event_buffer);

        let connected = Arc::new(Mutex::new(true));
        let connected_write = connected.clone();
        let connected_read = connected.clone();

        // Writer task
        tokio::spawn(async move {
            let mut write = write;
            while let Some(msg) = send_rx.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = write.send(msg).await {
                    error!("WebSocket write error: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            *connected_write.lock() = false;
        });

        // Reader task
        let reader = tokio::spawn(async move {
            let mut read = read;

            let _ = event_tx.send(TransportEvent::Connected).await;

            while let Some(result) = read.next().await {
                match result {
                    Ok(WsMessage::Binary(data)) => {
                        if event_tx.send(TransportEvent::Data(Bytes::from(data))).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Text(text)) => {
                        if event_tx.send(TransportEvent::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                        // Pong is handled automatically by tungstenite
                    }
                    Ok(WsMessage::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.trim().is_empty());
                        info!("WebSocket closed: {:?}", reason);
                        let _ = event_tx.send(TransportEvent::Disconnected { reason }).await;
                        break;
                    }
                    Ok(WsMessage::Frame(_)) => {}
                    Err(e) => {
                        warn!("WebSocket read error: {}", e);
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        let _ = event_tx
                            .send(TransportEvent::Disconnected {
                                reason: Some(e.to_string()),
                            })
                            .await;
                        break;
                    }
                }
            }

            *connected_read.lock() = false;
        });

        let sender = WebSocketSender {
            tx: send_tx,
            connected,
        };
        let receiver = WebSocketReceiver {
            rx: event_rx,
            reader,
        };

        Ok((sender, receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_config() {
        let config = WebSocketConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.origin.is_some());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let transport = WebSocketTransport::new();
        let result = transport.connect("not a url").await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }
}
