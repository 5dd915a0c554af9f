// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: clock synchronization for tether links.
//!
//! [`TimeSync`] estimates how far the local clock is from a server clock by
//! timing requests against a caller-supplied [`TimeSource`], and keeps the
//! best estimate fresh in the background.

pub mod clock;
pub mod error;
pub mod options;
pub mod source;
pub mod timesync;

pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use options::SyncOptions;
pub use source::{SourceFuture, TimeSource};
pub use timesync::{best_measurement, Measurement, TimeSync};
