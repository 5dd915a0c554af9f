// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tuning knobs for clock synchronization rounds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_SYNC_PERIOD_MS: u64 = 10 * 60 * 1000;
const DEFAULT_MIN_SYNC_QUALITY: f64 = 1000.0 / 50.0;
const DEFAULT_MIN_TRY_COUNT: u32 = 3;
const DEFAULT_MAX_TRY_COUNT: u32 = 10;
const DEFAULT_RETRY_WAIT_MS: u64 = 300;

/// Options for [`TimeSync`](crate::TimeSync).
///
/// A zero value in any field means "use the default", so partially filled
/// option sets behave the same whether they come from code or from serde.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// How long a sync result stays fresh before the background trigger
    /// starts another round.
    pub sync_period_ms: u64,
    /// Quality (half round-trip, ms) a measurement must beat to be accepted
    /// as good.
    pub min_sync_quality: f64,
    /// Attempts made before the round starts evaluating early acceptance.
    pub min_try_count: u32,
    /// Upper bound on attempts per round.
    pub max_try_count: u32,
    /// Pause after an attempt that produced no measurement.
    pub retry_wait_ms: u64,
    /// Known server-side processing delay subtracted from each estimate.
    pub server_delay_ms: f64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            sync_period_ms: DEFAULT_SYNC_PERIOD_MS,
            min_sync_quality: DEFAULT_MIN_SYNC_QUALITY,
            min_try_count: DEFAULT_MIN_TRY_COUNT,
            max_try_count: DEFAULT_MAX_TRY_COUNT,
            retry_wait_ms: DEFAULT_RETRY_WAIT_MS,
            server_delay_ms: 0.0,
        }
    }
}

impl SyncOptions {
    /// Replaces zero fields with their defaults and checks the try bounds.
    pub fn normalized(self) -> Result<Self> {
        let defaults = SyncOptions::default();
        let opts = SyncOptions {
            sync_period_ms: non_zero(self.sync_period_ms, defaults.sync_period_ms),
            min_sync_quality: if self.min_sync_quality > 0.0 {
                self.min_sync_quality
            } else {
                defaults.min_sync_quality
            },
            min_try_count: non_zero(self.min_try_count, defaults.min_try_count),
            max_try_count: non_zero(self.max_try_count, defaults.max_try_count),
            retry_wait_ms: non_zero(self.retry_wait_ms, defaults.retry_wait_ms),
            server_delay_ms: self.server_delay_ms,
        };

        if opts.min_try_count > opts.max_try_count {
            return Err(Error::InvalidOptions(format!(
                "min_try_count {} > max_try_count {}",
                opts.min_try_count, opts.max_try_count
            )));
        }
        Ok(opts)
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_millis(self.sync_period_ms)
    }

    /// Cadence of the background freshness check.
    pub fn trigger_interval(&self) -> Duration {
        Duration::from_millis((self.sync_period_ms / 2).max(1))
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }
}

fn non_zero<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() {
        default
    } else {
        value
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
