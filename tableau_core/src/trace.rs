// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the frame loop.
//!
//! [`TraceSink`] has one method per event; every method defaults to a no-op,
//! so a sink only overrides what it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. With the `trace` feature
//! **off** every `Tracer` method compiles to nothing. With it **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! These hooks are for structured frame timelines (see `tableau_debug`).
//! Warnings and lifecycle messages go through the `tracing` crate instead.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies.

use crate::action::PendingAction;
use crate::entity::EntityId;
use crate::resize::ResizeDescriptor;
use crate::scheduler::{FrameStats, RunState};
use crate::time::{Duration, HostTime};

/// Which phase of a scheduler tick is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Update listeners.
    Listeners,
    /// Physics step and collision dispatch.
    Physics,
    /// Entity updates in z-order, between surface clear and flush.
    Update,
    /// Scene renderer advance.
    Render,
}

impl PhaseKind {
    /// Short name, used by debug sinks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listeners => "listeners",
            Self::Physics => "physics",
            Self::Update => "update",
            Self::Render => "render",
        }
    }
}

/// Emitted when a tick consumes banked time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTickEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of the frame callback.
    pub now: HostTime,
    /// Seconds of simulation time consumed.
    pub dt: f64,
    /// Whether per-second stats were published on this tick.
    pub once_second: bool,
}

/// Emitted when a tick banks its elapsed time instead of running.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSkippedEvent {
    /// Host time of the frame callback.
    pub now: HostTime,
    /// Time banked so far, including this callback.
    pub banked: Duration,
}

/// Marks the beginning of a tick phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a tick phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Per-interval statistics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatsEvent {
    /// Host time of publication.
    pub now: HostTime,
    /// The published counters.
    pub stats: FrameStats,
}

/// Emitted when the scheduler's run state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStateEvent {
    /// Previous state.
    pub from: RunState,
    /// New state.
    pub to: RunState,
}

/// Emitted when the resize controller settles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeEvent {
    /// Host time of settlement.
    pub now: HostTime,
    /// The broadcast descriptor.
    pub descriptor: ResizeDescriptor,
    /// Number of entities the new scale was applied to.
    pub entities: usize,
}

/// Emitted for every queued action an entity dequeued this tick.
#[derive(Clone, Copy, Debug)]
pub struct ActionEvent<'a> {
    /// Frame counter.
    pub frame_index: u64,
    /// Entity that owns the queue.
    pub entity: EntityId,
    /// The dequeued action.
    pub action: &'a PendingAction,
    /// Whether it applied cleanly.
    pub applied: bool,
}

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a tick runs.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// Called when a tick is skipped and its time banked.
    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        _ = e;
    }

    /// Called at the beginning of a tick phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a tick phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when per-interval stats are published.
    fn on_stats(&mut self, e: &StatsEvent) {
        _ = e;
    }

    /// Called when the run state changes.
    fn on_run_state(&mut self, e: &RunStateEvent) {
        _ = e;
    }

    /// Called when a resize settles.
    fn on_resize(&mut self, e: &ResizeEvent) {
        _ = e;
    }

    /// Called for each dequeued action.
    fn on_action(&mut self, e: &ActionEvent<'_>) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameTickEvent`].
    #[inline]
    pub fn frame_tick(&mut self, e: &FrameTickEvent) {
        dispatch!(self, on_frame_tick, e);
    }

    /// Emits a [`FrameSkippedEvent`].
    #[inline]
    pub fn frame_skipped(&mut self, e: &FrameSkippedEvent) {
        dispatch!(self, on_frame_skipped, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        dispatch!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        dispatch!(self, on_phase_end, e);
    }

    /// Emits a [`StatsEvent`].
    #[inline]
    pub fn stats(&mut self, e: &StatsEvent) {
        dispatch!(self, on_stats, e);
    }

    /// Emits a [`RunStateEvent`].
    #[inline]
    pub fn run_state(&mut self, e: &RunStateEvent) {
        dispatch!(self, on_run_state, e);
    }

    /// Emits a [`ResizeEvent`].
    #[inline]
    pub fn resize(&mut self, e: &ResizeEvent) {
        dispatch!(self, on_resize, e);
    }

    /// Emits an [`ActionEvent`].
    #[inline]
    pub fn action(&mut self, e: &ActionEvent<'_>) {
        dispatch!(self, on_action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick() -> FrameTickEvent {
        FrameTickEvent {
            frame_index: 42,
            now: HostTime(1_000_000),
            dt: 0.016,
            once_second: false,
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_frame_tick(&sample_tick());
        sink.on_frame_skipped(&FrameSkippedEvent {
            now: HostTime(0),
            banked: Duration::from_millis(4),
        });
        sink.on_run_state(&RunStateEvent {
            from: RunState::Stopped,
            to: RunState::Running,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_tick(&sample_tick());
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Update,
            timestamp: HostTime(0),
        });
    }

    #[test]
    fn phase_names() {
        assert_eq!(PhaseKind::Listeners.as_str(), "listeners");
        assert_eq!(PhaseKind::Render.as_str(), "render");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_tick(&mut self, e: &FrameTickEvent) {
                self.ticks.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_tick(&sample_tick());
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
    }
}
