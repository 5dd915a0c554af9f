// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Clock synchronization against a remote time source.
//!
//! Each round takes several round-trip measurements and keeps the one with
//! the shortest transport time, on the assumption that the fastest exchange
//! carries the least asymmetric delay. Rounds are repeated in the background
//! once the previous result is older than the sync period.
//!
//! Held results never regress: a round only replaces the held offset if it
//! is good enough outright or strictly better than what is held.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, info, warn};

use crate::clock::{ClockSource, SystemClock};
use crate::error::Result;
use crate::options::SyncOptions;
use crate::source::TimeSource;

/// Delay between a background trigger and the round it schedules.
const TRIGGER_DELAY: Duration = Duration::from_millis(1);

/// Without a held result, a weak round is kept only below this quality.
const FALLBACK_QUALITY_LIMIT: f64 = 99_990.0;

/// One round-trip measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Estimated server minus local clock, in milliseconds.
    pub diff: f64,
    /// Half the transport duration. Lower is better.
    pub quality: f64,
}

impl Measurement {
    /// Builds a measurement from a request sent at `start_ms` and answered
    /// at `end_ms` (both local) with the server's `server_time`.
    ///
    /// The server is assumed to have read its clock halfway through the
    /// exchange, plus any known processing delay.
    pub fn from_round_trip(
        start_ms: u64,
        server_time: f64,
        end_ms: u64,
        server_delay_ms: f64,
    ) -> Self {
        let transport = end_ms.saturating_sub(start_ms) as f64;
        let midpoint = start_ms as f64 + transport / 2.0 + server_delay_ms;
        Measurement { diff: server_time - midpoint, quality: transport / 2.0 }
    }
}

/// Returns the measurement with the lowest quality value, first one wins
/// on ties.
pub fn best_measurement(results: &[Measurement]) -> Option<Measurement> {
    results.iter().copied().fold(None, |best, m| match best {
        Some(b) if b.quality <= m.quality => Some(b),
        _ => Some(m),
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct SyncState {
    diff: f64,
    quality: Option<f64>,
    last_sync_ms: u64,
}

type InvalidationCallback = Arc<dyn Fn() + Send + Sync>;

struct Inner<S, C> {
    options: SyncOptions,
    source: S,
    clock: C,
    state: Mutex<SyncState>,
    /// Held for the whole of a round so rounds never interleave.
    round: tokio::sync::Mutex<()>,
    on_invalidate: Mutex<Option<InvalidationCallback>>,
    trigger: Mutex<Option<JoinHandle<()>>>,
}

/// Estimates the offset between the local clock and a server clock.
///
/// Cheap to clone; clones share the same estimate.
pub struct TimeSync<S: TimeSource, C: ClockSource = SystemClock> {
    inner: Arc<Inner<S, C>>,
}

impl<S: TimeSource, C: ClockSource> Clone for TimeSync<S, C> {
    fn clone(&self) -> Self {
        TimeSync { inner: Arc::clone(&self.inner) }
    }
}

impl<S: TimeSource + 'static> TimeSync<S, SystemClock> {
    /// Creates an engine measuring against the system clock.
    pub fn new(options: SyncOptions, source: S) -> Result<Self> {
        Self::with_clock(options, source, SystemClock)
    }
}

impl<S: TimeSource + 'static, C: ClockSource + 'static> TimeSync<S, C> {
    /// Creates an engine with a custom local clock.
    pub fn with_clock(options: SyncOptions, source: S, clock: C) -> Result<Self> {
        let options = options.normalized()?;
        Ok(TimeSync {
            inner: Arc::new(Inner {
                options,
                source,
                clock,
                state: Mutex::new(SyncState::default()),
                round: tokio::sync::Mutex::new(()),
                on_invalidate: Mutex::new(None),
                trigger: Mutex::new(None),
            }),
        })
    }

    /// Registers a callback run whenever a round replaces the held offset,
    /// so consumers can drop values derived from [`current_time`](Self::current_time).
    pub fn set_invalidation_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        *lock(&self.inner.on_invalidate) = Some(Arc::new(callback));
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    /// Local clock, in milliseconds since Unix epoch.
    pub fn local_time(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Local clock corrected by the held offset.
    pub fn current_time(&self) -> f64 {
        self.local_time() as f64 + self.diff()
    }

    /// Half round-trip of the held measurement; `None` until a round has
    /// been accepted.
    pub fn quality(&self) -> Option<f64> {
        lock(&self.inner.state).quality
    }

    /// Held offset (server minus local), in milliseconds.
    pub fn diff(&self) -> f64 {
        lock(&self.inner.state).diff
    }

    pub fn last_sync_ms(&self) -> u64 {
        lock(&self.inner.state).last_sync_ms
    }

    /// True once the held quality is below `min_sync_quality`.
    pub fn is_good(&self) -> bool {
        self.quality().is_some_and(|q| q < self.inner.options.min_sync_quality)
    }

    /// Starts the background trigger and runs a first round.
    ///
    /// Returns whether that round met the quality bar.
    pub async fn init(&self) -> bool {
        self.inner.start_trigger();
        self.sync_time().await
    }

    /// Runs one synchronization round.
    ///
    /// Returns `true` only if a measurement beat `min_sync_quality`. A
    /// weaker result may still be stored if it improves on the held one.
    pub async fn sync_time(&self) -> bool {
        self.inner.sync_round().await
    }

    /// Schedules a round if the held result is older than the sync period.
    ///
    /// Returns whether a round was scheduled. Outside a tokio runtime
    /// nothing can be scheduled and this returns `false`.
    pub fn maybe_trigger_sync(&self) -> bool {
        self.inner.maybe_trigger()
    }

    /// Whether the background trigger is running.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.trigger).as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the background trigger. Rounds already scheduled still finish.
    pub fn close(&self) {
        if let Some(handle) = lock(&self.inner.trigger).take() {
            handle.abort();
        }
    }
}

impl<S: TimeSource + 'static, C: ClockSource + 'static> Inner<S, C> {
    fn start_trigger(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.options.trigger_interval();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.maybe_trigger();
            }
        });

        if let Some(previous) = lock(&self.trigger).replace(handle) {
            previous.abort();
        }
    }

    fn maybe_trigger(self: &Arc<Self>) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, time sync not triggered");
            return false;
        };
        let now = self.clock.now_ms();
        {
            let mut state = lock(&self.state);
            let age = now.saturating_sub(state.last_sync_ms);
            if age <= self.options.sync_period_ms {
                return false;
            }
            // Recorded up front so the next tick cannot schedule a second
            // round before this one starts.
            state.last_sync_ms = now;
            debug!(age_ms = age, "triggering time sync");
        }

        let inner = Arc::clone(self);
        runtime.spawn(async move {
            tokio::time::sleep(TRIGGER_DELAY).await;
            let good = inner.sync_round().await;
            if !good {
                info!("background time sync did not reach the quality bar");
            }
        });
        true
    }

    async fn sync_round(&self) -> bool {
        let _round = self.round.lock().await;
        let opts = &self.options;

        let mut results = Vec::with_capacity(opts.max_try_count as usize);
        let mut selected = None;
        let mut good = false;

        for try_count in 0..opts.max_try_count {
            match self.attempt().await {
                Some(measurement) => results.push(measurement),
                None if try_count + 1 < opts.max_try_count => {
                    tokio::time::sleep(opts.retry_wait()).await;
                }
                None => {}
            }

            if try_count >= opts.min_try_count {
                if let Some(best) = best_measurement(&results) {
                    if best.quality < opts.min_sync_quality {
                        selected = Some(best);
                        good = true;
                        break;
                    }
                }
            }
        }

        if selected.is_none() {
            let held = lock(&self.state).quality.unwrap_or(FALLBACK_QUALITY_LIMIT);
            selected = best_measurement(&results).filter(|best| best.quality < held);
        }

        let Some(result) = selected else {
            debug!(attempts = results.len(), "time sync round produced no usable result");
            return false;
        };

        self.accept(result);
        debug!(diff = result.diff, quality = result.quality, good, "time sync round accepted");
        good
    }

    async fn attempt(&self) -> Option<Measurement> {
        let start = self.clock.now_ms();
        match self.source.server_time().await {
            Ok(Some(server_time)) if server_time.is_finite() => {
                let end = self.clock.now_ms();
                Some(Measurement::from_round_trip(
                    start,
                    server_time,
                    end,
                    self.options.server_delay_ms,
                ))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "time sync attempt failed");
                None
            }
        }
    }

    fn accept(&self, result: Measurement) {
        {
            let mut state = lock(&self.state);
            state.diff = result.diff;
            state.quality = Some(result.quality);
            state.last_sync_ms = self.clock.now_ms();
        }

        let callback = lock(&self.on_invalidate).clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl<S, C> Drop for Inner<S, C> {
    fn drop(&mut self) {
        let trigger = self.trigger.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = trigger.take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "timesync_tests.rs"]
mod tests;
