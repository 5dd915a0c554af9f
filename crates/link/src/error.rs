// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sessions and the connection manager.

use thiserror::Error;

/// Error reported by a [`Session`](crate::Session).
///
/// Clone so it can be fanned out to every event subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server refused the session handshake.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Error type for connection manager operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// The session could not be established.
    #[error("connect failed: {0}")]
    Connect(#[source] SessionError),

    /// The session failed after it was established.
    #[error("transport error: {0}")]
    Transport(#[source] SessionError),

    #[error("no session\n  hint: call connect() first")]
    NoSession,

    #[error("a connect attempt is already in flight")]
    ConnectInProgress,
}

/// Result type for connection manager operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
