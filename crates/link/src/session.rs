// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session abstraction for duplex real-time links.
//!
//! A [`Session`] is one connection attempt's worth of transport: it can be
//! connected, closed and written to, and it reports what happens on the wire
//! as [`SessionEvent`]s. The connection manager never mutates a session to
//! point it somewhere else; it asks a [`SessionFactory`] for a new one.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{SessionError, SessionResult};

/// Future returned by [`Session`] operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = SessionResult<T>> + Send + 'a>>;

/// Channel a session reports its events on.
pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;

/// Receiving half of [`SessionEventSender`].
pub type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Something that happened on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake completed; the server assigned `session_id`.
    Connected { session_id: String },
    /// The server refused the handshake.
    Failed(SessionError),
    /// The underlying socket closed.
    SocketClose,
    /// A frame arrived after the handshake.
    Message(String),
    /// The socket reported an error.
    SocketError(SessionError),
    /// Informational frame outside the message stream.
    Info(String),
}

/// Duplex session capability.
///
/// Methods take `&self` so a session can be closed while a connect is still
/// pending on it.
pub trait Session: Send + Sync {
    /// Opens the transport and performs the handshake.
    ///
    /// Resolves to the server-assigned session id.
    fn connect(&self) -> SessionFuture<'_, String>;

    /// Closes the transport. Closing a closed session is a no-op.
    fn close(&self) -> SessionFuture<'_, ()>;

    /// Sends one raw frame.
    fn send(&self, raw: String) -> SessionFuture<'_, ()>;

    /// Whether the transport is currently open.
    fn is_open(&self) -> bool;
}

/// Builds sessions for a connection target.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Session + 'static;

    /// Creates a new, unconnected session reporting on `events`.
    fn create(&self, config: &SessionConfig, events: SessionEventSender) -> Self::Session;
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix the server is mounted under, e.g. `/core`.
    pub path: String,
    /// Use `wss://`.
    pub ssl: bool,
    /// Opaque TLS settings handed to custom session factories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_opts: Option<serde_json::Value>,
    /// Protocol version offered during the handshake.
    pub ddp_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            path: String::new(),
            ssl: false,
            tls_opts: None,
            ddp_version: "1".to_string(),
        }
    }
}

impl SessionConfig {
    /// Creates a config for `host:port` with defaults for everything else.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        SessionConfig { host: host.into(), port, ..SessionConfig::default() }
    }

    /// WebSocket endpoint for this target.
    pub fn url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!("{scheme}://{}:{}/websocket", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}/{path}/websocket", self.host, self.port)
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
