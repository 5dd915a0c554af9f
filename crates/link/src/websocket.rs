// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket session using tokio-tungstenite.
//!
//! Speaks just enough DDP to open a session: it sends `connect`, waits for
//! `connected` (or `failed`), and from then on hands every text frame to the
//! event channel untouched. Everything above the handshake belongs to the
//! caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::SessionError;
use crate::session::{
    Session, SessionConfig, SessionEvent, SessionEventSender, SessionFactory, SessionFuture,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds [`WebSocketSession`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketFactory;

impl SessionFactory for WebSocketFactory {
    type Session = WebSocketSession;

    fn create(&self, config: &SessionConfig, events: SessionEventSender) -> WebSocketSession {
        WebSocketSession::new(config.clone(), events)
    }
}

/// DDP-over-WebSocket session.
pub struct WebSocketSession {
    config: SessionConfig,
    events: SessionEventSender,
    sink: tokio::sync::Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    open: Arc<AtomicBool>,
}

impl WebSocketSession {
    pub fn new(config: SessionConfig, events: SessionEventSender) -> Self {
        WebSocketSession {
            config,
            events,
            sink: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> String {
        self.config.url()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn handshake(
        &self,
        sink: &mut SplitSink<WsStream, Message>,
        stream: &mut SplitStream<WsStream>,
    ) -> Result<String, SessionError> {
        let hello = connect_frame(&self.config.ddp_version)?;
        sink.send(Message::Text(hello.into()))
            .await
            .map_err(|e| SessionError::SendFailed(e.to_string()))?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match classify(text.as_str()) {
                    Handshake::Connected(session_id) => return Ok(session_id),
                    Handshake::Failed(version) => {
                        let err = SessionError::HandshakeFailed(format!(
                            "server does not speak version {}, suggested {version}",
                            self.config.ddp_version
                        ));
                        self.emit(SessionEvent::Failed(err.clone()));
                        return Err(err);
                    }
                    Handshake::Banner => self.emit(SessionEvent::Info(text.as_str().to_string())),
                    Handshake::Other => self.emit(SessionEvent::Message(text.as_str().to_string())),
                },
                Some(Ok(Message::Close(_))) | None => return Err(SessionError::ConnectionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SessionError::ReceiveFailed(e.to_string())),
            }
        }
    }

    fn stop_reader(&self) {
        let reader = lock(&self.reader).take();
        if let Some(reader) = reader {
            reader.abort();
        }
    }
}

impl Session for WebSocketSession {
    fn connect(&self) -> SessionFuture<'_, String> {
        Box::pin(async move {
            self.stop_reader();
            self.open.store(false, Ordering::SeqCst);

            let url = self.config.url();
            debug!(url = %url, "opening websocket");
            let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;
            let (mut sink, mut stream) = ws.split();

            let session_id = self.handshake(&mut sink, &mut stream).await?;

            *self.sink.lock().await = Some(sink);
            self.open.store(true, Ordering::SeqCst);
            // Announce before the reader can forward anything.
            self.emit(SessionEvent::Connected { session_id: session_id.clone() });

            let reader =
                tokio::spawn(read_frames(stream, self.events.clone(), Arc::clone(&self.open)));
            let previous = lock(&self.reader).replace(reader);
            if let Some(previous) = previous {
                previous.abort();
            }
            Ok(session_id)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            self.stop_reader();
            self.open.store(false, Ordering::SeqCst);
            if let Some(mut sink) = self.sink.lock().await.take() {
                let _ = sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&self, raw: String) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            let mut guard = self.sink.lock().await;
            let sink = guard.as_mut().ok_or(SessionError::ConnectionClosed)?;

            if let Err(e) = sink.send(Message::Text(raw.into())).await {
                // Connection is broken, clear it
                *guard = None;
                self.open.store(false, Ordering::SeqCst);
                return Err(SessionError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

/// Forwards frames until the socket goes away, then reports the close.
async fn read_frames(
    mut stream: SplitStream<WsStream>,
    events: SessionEventSender,
    open: Arc<AtomicBool>,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let _ = events.send(SessionEvent::Message(text.as_str().to_string()));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                let _ = events
                    .send(SessionEvent::SocketError(SessionError::ReceiveFailed(e.to_string())));
                break;
            }
        }
    }
    open.store(false, Ordering::SeqCst);
    let _ = events.send(SessionEvent::SocketClose);
}

/// Handshake-relevant view of a server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Handshake {
    Connected(String),
    Failed(String),
    /// Server greeting sent before the handshake, e.g. `{"server_id":"0"}`.
    Banner,
    Other,
}

#[derive(Deserialize)]
struct Frame {
    msg: Option<String>,
    session: Option<String>,
    version: Option<String>,
    server_id: Option<String>,
}

pub(crate) fn connect_frame(version: &str) -> Result<String, SessionError> {
    let frame = serde_json::json!({
        "msg": "connect",
        "version": version,
        "support": [version],
    });
    serde_json::to_string(&frame).map_err(|e| SessionError::Serialization(e.to_string()))
}

pub(crate) fn classify(text: &str) -> Handshake {
    let Ok(frame) = serde_json::from_str::<Frame>(text) else {
        return Handshake::Other;
    };
    match frame.msg.as_deref() {
        Some("connected") => Handshake::Connected(frame.session.unwrap_or_default()),
        Some("failed") => Handshake::Failed(frame.version.unwrap_or_default()),
        None if frame.server_id.is_some() => Handshake::Banner,
        _ => Handshake::Other,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "websocket_tests.rs"]
mod tests;
