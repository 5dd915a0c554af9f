// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-link: a self-healing client link to a real-time server.
//!
//! [`ConnectionManager`] drives a [`Session`] built by a
//! [`SessionFactory`], publishes lifecycle changes as [`ConnectorEvent`]s
//! and rebuilds the session whenever it drops while the link is wanted.
//! [`WebSocketSession`] is the stock session.

pub mod error;
pub mod manager;
pub mod options;
pub mod session;
pub mod state;
pub mod websocket;

#[cfg(test)]
mod test_helpers;

pub use error::{ConnectorError, ConnectorResult, SessionError, SessionResult};
pub use manager::{ConnectionManager, ConnectorEvent};
pub use options::{ConnectorOptions, FailurePolicy};
pub use session::{
    Session, SessionConfig, SessionEvent, SessionEventReceiver, SessionEventSender,
    SessionFactory, SessionFuture,
};
pub use state::{Effects, LinkState, Phase, Transition};
pub use websocket::{WebSocketFactory, WebSocketSession};
