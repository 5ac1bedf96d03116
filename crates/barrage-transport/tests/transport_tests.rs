//! Transport Layer Tests
//!
//! Tests for the WebSocket transport against a local tungstenite server:
//! - Connection establishment
//! - Binary and text message delivery
//! - Close codes and reasons in both directions

use barrage_transport::{
    Transport, TransportError, TransportEvent, TransportReceiver, TransportSender,
    WebSocketConfig, WebSocketTransport,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::{
    frame::coding::CloseCode, CloseFrame, Message as WsMessage,
};

/// What the test server observed from the client
#[derive(Debug)]
enum ServerSaw {
    Binary(Vec<u8>),
    Close(Option<(u16, String)>),
}

/// Start a one-connection server that sends `script` then records what it receives.
async fn start_server(script: Vec<WsMessage>) -> (String, mpsc::UnboundedReceiver<ServerSaw>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        for msg in script {
            ws.send(msg).await.unwrap();
        }

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                WsMessage::Binary(data) => {
                    let _ = tx.send(ServerSaw::Binary(data));
                }
                WsMessage::Close(frame) => {
                    let _ = tx.send(ServerSaw::Close(
                        frame.map(|f| (u16::from(f.code), f.reason.to_string())),
                    ));
                    break;
                }
                _ => {}
            }
        }
    });

    (format!("ws://{}/sub", addr), rx)
}

async fn next_event(receiver: &mut impl TransportReceiver) -> TransportEvent {
    timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("timed out waiting for event")
        .expect("receiver closed")
}

#[tokio::test]
async fn test_connect_and_receive_binary() {
    let (url, _server) = start_server(vec![WsMessage::Binary(vec![1, 2, 3])]).await;

    let transport = WebSocketTransport::new();
    let (sender, mut receiver) = transport.connect(&url).await.expect("connect failed");
    assert!(sender.is_connected());

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Data(Bytes::from_static(&[1, 2, 3]))
    );
}

#[tokio::test]
async fn test_text_messages_are_kept_separate() {
    let (url, _server) = start_server(vec![WsMessage::Text(r#"{"cmd":"X"}"#.to_string())]).await;

    let (_sender, mut receiver) = WebSocketTransport::new().connect(&url).await.unwrap();

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Text(r#"{"cmd":"X"}"#.to_string())
    );
}

#[tokio::test]
async fn test_send_reaches_server() {
    let (url, mut server) = start_server(vec![]).await;

    let (sender, _receiver) = WebSocketTransport::new().connect(&url).await.unwrap();
    sender.send(Bytes::from_static(b"hello")).await.unwrap();

    match timeout(Duration::from_secs(5), server.recv()).await.unwrap() {
        Some(ServerSaw::Binary(data)) => assert_eq!(data, b"hello"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_local_close_carries_code_and_reason() {
    let (url, mut server) = start_server(vec![]).await;

    let (sender, _receiver) = WebSocketTransport::new().connect(&url).await.unwrap();
    sender.close(1008, "auth failed").await.unwrap();
    assert!(!sender.is_connected());

    match timeout(Duration::from_secs(5), server.recv()).await.unwrap() {
        Some(ServerSaw::Close(Some((code, reason)))) => {
            assert_eq!(code, 1008);
            assert_eq!(reason, "auth failed");
        }
        other => panic!("unexpected: {:?}", other),
    }

    let result = sender.send(Bytes::from_static(b"late")).await;
    assert!(matches!(result, Err(TransportError::NotConnected)));
}

#[tokio::test]
async fn test_remote_close_reports_reason() {
    let close = WsMessage::Close(Some(CloseFrame {
        code: CloseCode::Away,
        reason: Cow::Borrowed("server restart"),
    }));
    let (url, _server) = start_server(vec![close]).await;

    let (_sender, mut receiver) = WebSocketTransport::new().connect(&url).await.unwrap();

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Disconnected {
            reason: Some("server restart".to_string())
        }
    );
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop to get a port nobody is listening on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let transport = WebSocketTransport::with_config(WebSocketConfig {
        connect_timeout: Duration::from_secs(2),
        ..Default::default()
    });
    let result = transport.connect(&format!("ws://127.0.0.1:{}/sub", port)).await;
    assert!(result.is_err());
}
