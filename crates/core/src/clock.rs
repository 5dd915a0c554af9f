// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local clocks that sync rounds measure against.
//!
//! Round-trip math works on whole milliseconds since the Unix epoch, so a
//! clock only has to produce that one number. Rounds take the clock by
//! value; shared or borrowed clocks go through the forwarding impls.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Local wall clock in Unix milliseconds.
pub trait ClockSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The host's wall clock.
///
/// Reads before the epoch (a badly set host clock) come back as 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        UNIX_EPOCH
            .elapsed()
            .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX))
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        C::now_ms(self)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> u64 {
        C::now_ms(self)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
