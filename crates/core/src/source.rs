// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server time sources.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Future returned by [`TimeSource::server_time`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<f64>>> + Send + 'a>>;

/// Something that can ask the server what time it is.
///
/// Resolves to the server's clock in milliseconds since Unix epoch, or
/// `None` when the server gave no usable answer for this attempt. This is
/// usually a request routed over an established link.
pub trait TimeSource: Send + Sync {
    /// Queries the server once.
    fn server_time(&self) -> SourceFuture<'_>;
}

impl<F, Fut> TimeSource for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<f64>>> + Send + 'static,
{
    fn server_time(&self) -> SourceFuture<'_> {
        Box::pin(self())
    }
}
