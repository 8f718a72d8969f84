// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for tableau.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafRequester`]: `requestAnimationFrame` frame requester
//! - [`DomHost`]: container size, device pixel ratio and canvas origin
//! - [`PerformanceClock`]: `performance.now()` clock for phase timestamps

#![no_std]

extern crate alloc;

mod host;
mod raf;

pub use host::DomHost;
pub use raf::RafRequester;

use tableau_core::backend::Clock;
use tableau_core::time::HostTime;

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks, the same unit frame
/// callbacks deliver.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}

/// [`Clock`] reading `performance.now()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> HostTime {
        now()
    }
}
