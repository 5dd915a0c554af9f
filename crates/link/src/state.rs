// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Link state machine.
//!
//! [`LinkState`] is a plain value. [`LinkState::apply`] moves it along and
//! reports what the manager should do about it; emitting events and running
//! timers is left to the caller.
//!
//! ```text
//!   Idle ──connect──► Connecting ──established──► Connected
//!                        │                           │
//!                        │ failed                    │ socket closed
//!                        ▼                           ▼
//!                     Monitoring ◄────────────────────┘
//!                        │ tick: rebuild session
//!                        └──────────► Connecting
//! ```

/// Flags describing one link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Between a handshake and the next socket close.
    pub connected: bool,
    /// A connect attempt is in flight.
    pub connecting: bool,
    /// The caller wants the link up; drives automatic reconnection.
    pub session_open: bool,
    /// Server-assigned id of the live session.
    pub connection_id: Option<String>,
}

/// Coarse view of a [`LinkState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Connected,
    /// Disconnected while the caller still wants the link up.
    Monitoring,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A connect attempt begins, replacing any live socket.
    ConnectStarted,
    Established { session_id: String },
    ConnectFailed,
    /// The caller's connect succeeded; keep the link up from now on.
    Opened,
    /// The socket went away.
    Lost,
    /// The caller closed the link, abandoning any attempt in flight.
    Closed,
}

/// What the manager has to do after a transition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Effects {
    /// New value of `connected`, if it flipped.
    pub changed: Option<bool>,
    /// (Re)start the reconnect monitor.
    pub restart_monitor: bool,
}

impl LinkState {
    pub fn phase(&self) -> Phase {
        if self.connected {
            Phase::Connected
        } else if self.connecting {
            Phase::Connecting
        } else if self.session_open {
            Phase::Monitoring
        } else {
            Phase::Idle
        }
    }

    /// Whether a monitor tick should rebuild the session.
    pub fn should_reconnect(&self, auto_reconnect: bool) -> bool {
        auto_reconnect && self.session_open && !self.connected
    }

    /// `connected` implies an id, and never together with `connecting`.
    pub fn is_consistent(&self) -> bool {
        (!self.connected || self.connection_id.is_some()) && !(self.connected && self.connecting)
    }

    pub fn apply(&mut self, transition: Transition) -> Effects {
        match transition {
            Transition::ConnectStarted => {
                // A new attempt replaces whatever socket was live.
                let changed = self.drop_connection().then_some(false);
                self.connecting = true;
                Effects { changed, restart_monitor: false }
            }
            Transition::Established { session_id } => {
                self.connecting = false;
                if self.connected {
                    return Effects::default();
                }
                self.connected = true;
                self.connection_id = Some(session_id);
                Effects { changed: Some(true), restart_monitor: false }
            }
            Transition::ConnectFailed => {
                self.connecting = false;
                Effects { changed: None, restart_monitor: true }
            }
            Transition::Opened => {
                self.session_open = true;
                Effects::default()
            }
            Transition::Lost => {
                if !self.drop_connection() {
                    return Effects::default();
                }
                Effects { changed: Some(false), restart_monitor: true }
            }
            Transition::Closed => {
                // An attempt still in flight is abandoned.
                self.session_open = false;
                self.connecting = false;
                let changed = self.drop_connection().then_some(false);
                Effects { changed, restart_monitor: false }
            }
        }
    }

    fn drop_connection(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.connected = false;
        self.connection_id = None;
        true
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
