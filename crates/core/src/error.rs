// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether-core operations.

use thiserror::Error;

/// Errors raised by clock synchronization.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// The time source could not produce an answer for one attempt.
    #[error("time source failed: {0}")]
    TimeSource(String),

    #[error("invalid sync options: {0}\n  hint: min_try_count must not exceed max_try_count")]
    InvalidOptions(String),
}

/// A specialized Result type for tether-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
