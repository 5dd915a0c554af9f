// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;

const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 1000;
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What to do with a session `Failed` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure; subscribers never see it.
    #[default]
    Log,
    /// Publish it as [`ConnectorEvent::Failed`](crate::ConnectorEvent::Failed).
    Emit,
}

/// Options for [`ConnectionManager`](crate::ConnectionManager).
///
/// The session target is flattened, so a JSON object like
/// `{"host": "core", "port": 3000, "auto_reconnect": true}` deserializes
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorOptions {
    #[serde(flatten)]
    pub session: SessionConfig,
    /// Rebuild the session while the link is wanted but down.
    pub auto_reconnect: bool,
    /// Reconnect monitor period. Zero means the default.
    pub auto_reconnect_timer_ms: u64,
    pub on_failure: FailurePolicy,
    /// Buffer per event subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        ConnectorOptions {
            session: SessionConfig::default(),
            auto_reconnect: true,
            auto_reconnect_timer_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            on_failure: FailurePolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ConnectorOptions {
    pub fn new(session: SessionConfig) -> Self {
        ConnectorOptions { session, ..ConnectorOptions::default() }
    }

    pub fn reconnect_interval(&self) -> Duration {
        match self.auto_reconnect_timer_ms {
            0 => Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            ms => Duration::from_millis(ms),
        }
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
