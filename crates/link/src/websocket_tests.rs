// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the WebSocket session, against a local tungstenite server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use yare::parameterized;

const BANNER: &str = r#"{"server_id":"0"}"#;

#[parameterized(
    connected = { r#"{"msg":"connected","session":"abc"}"#, Handshake::Connected("abc".into()) },
    failed = { r#"{"msg":"failed","version":"pre2"}"#, Handshake::Failed("pre2".into()) },
    banner = { BANNER, Handshake::Banner },
    added = { r#"{"msg":"added","collection":"x","id":"1"}"#, Handshake::Other },
    not_json = { "hello", Handshake::Other },
)]
fn classify_frames(text: &str, expected: Handshake) {
    assert_eq!(classify(text), expected);
}

#[test]
fn connect_frame_offers_version() {
    let frame: serde_json::Value = serde_json::from_str(&connect_frame("1").unwrap()).unwrap();
    assert_eq!(frame["msg"], "connect");
    assert_eq!(frame["version"], "1");
    assert_eq!(frame["support"][0], "1");
}

#[test]
fn factory_uses_config() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let config = SessionConfig { path: "/core".into(), ..SessionConfig::new("core.local", 3000) };
    let session = WebSocketFactory.create(&config, tx);
    assert_eq!(session.url(), "ws://core.local:3000/core/websocket");
    assert!(!session.is_open());
}

async fn listen() -> (TcpListener, SessionConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, SessionConfig::new("127.0.0.1", port))
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Greets, checks the client's connect frame and answers with `reply`.
async fn handshake(ws: &mut WebSocketStream<TcpStream>, reply: &str) {
    ws.send(Message::text(BANNER.to_string())).await.unwrap();
    let hello = ws.next().await.unwrap().unwrap();
    assert!(hello.to_text().unwrap().contains(r#""msg":"connect""#));
    ws.send(Message::text(reply.to_string())).await.unwrap();
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn connects_and_forwards_frames() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, r#"{"msg":"connected","session":"abc"}"#).await;
        ws.send(Message::text(r#"{"msg":"added"}"#.to_string())).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = WebSocketSession::new(config, tx);
    assert_eq!(session.connect().await.unwrap(), "abc");
    assert!(session.is_open());

    assert_eq!(next_event(&mut rx).await, SessionEvent::Info(BANNER.to_string()));
    assert_eq!(next_event(&mut rx).await, SessionEvent::Connected { session_id: "abc".into() });
    assert_eq!(next_event(&mut rx).await, SessionEvent::Message(r#"{"msg":"added"}"#.into()));
    assert_eq!(next_event(&mut rx).await, SessionEvent::SocketClose);
    assert!(!session.is_open());

    server.await.unwrap();
}

#[tokio::test]
async fn rejected_handshake_reports_failure() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, r#"{"msg":"failed","version":"pre2"}"#).await;
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = WebSocketSession::new(config, tx);
    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::HandshakeFailed(ref m) if m.contains("pre2")));
    assert!(!session.is_open());

    assert_eq!(next_event(&mut rx).await, SessionEvent::Info(BANNER.to_string()));
    assert_eq!(next_event(&mut rx).await, SessionEvent::Failed(err));

    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_connection_failed() {
    let (listener, config) = listen().await;
    drop(listener);

    let (tx, _rx) = mpsc::unbounded_channel();
    let session = WebSocketSession::new(config, tx);
    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::ConnectionFailed(_)));
}

#[tokio::test]
async fn send_reaches_server_and_close_is_idempotent() {
    let (listener, config) = listen().await;
    let (got_tx, got_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        handshake(&mut ws, r#"{"msg":"connected","session":"s1"}"#).await;
        let frame = ws.next().await.unwrap().unwrap();
        got_tx.send(frame.to_text().unwrap().to_string()).unwrap();
        // Drain until the client closes.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, _rx) = mpsc::unbounded_channel();
    let session = WebSocketSession::new(config, tx);
    session.connect().await.unwrap();
    session.send(r#"{"msg":"ping"}"#.to_string()).await.unwrap();
    assert_eq!(got_rx.await.unwrap(), r#"{"msg":"ping"}"#);

    session.close().await.unwrap();
    assert!(!session.is_open());
    session.close().await.unwrap();
    assert_eq!(session.send("late".to_string()).await, Err(SessionError::ConnectionClosed));

    server.await.unwrap();
}
