// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-line summaries of link events.

use tether_link::ConnectorEvent;

/// Longest message excerpt printed.
const EXCERPT_LEN: usize = 120;

/// Describe `event` for the log, or `None` if it should not be printed.
///
/// `ConnectionChanged` is always paired with `Connected`/`Disconnected`,
/// so only the latter is shown.
pub fn describe(event: &ConnectorEvent, messages: bool) -> Option<String> {
    match event {
        ConnectorEvent::ConnectionChanged(_) => None,
        ConnectorEvent::Connected => Some("connected".to_string()),
        ConnectorEvent::Disconnected => Some("disconnected, waiting for reconnect".to_string()),
        ConnectorEvent::Message(raw) if messages => Some(format!("message: {}", excerpt(raw))),
        ConnectorEvent::Message(_) => None,
        ConnectorEvent::Error(e) => Some(format!("error: {e}")),
        ConnectorEvent::Info(raw) => Some(format!("server: {}", excerpt(raw))),
        ConnectorEvent::Failed(e) => Some(format!("rejected: {e}")),
    }
}

fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(EXCERPT_LEN) {
        Some((end, _)) => format!("{}...", &raw[..end]),
        None => raw.to_string(),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
