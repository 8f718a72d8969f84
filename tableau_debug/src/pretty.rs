// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds.

use std::io::Write;

use tableau_core::trace::{
    ActionEvent, FrameSkippedEvent, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, ResizeEvent,
    RunStateEvent, StatsEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    skipped: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            skipped: false,
        }
    }

    /// Also print banked (skipped) callbacks. Off by default; at display
    /// rates above the minimum step they outnumber ticks.
    #[must_use]
    pub fn with_skipped(mut self, skipped: bool) -> Self {
        self.skipped = skipped;
        self
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.1}ms dt={:.1}ms{}",
            e.frame_index,
            e.now.as_millis_f64(),
            e.dt * 1000.0,
            if e.once_second { " (stats)" } else { "" },
        );
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        if !self.skipped {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[skip] now={:.1}ms banked={:.1}ms",
            e.now.as_millis_f64(),
            e.banked.as_millis_f64(),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}ms",
            e.frame_index,
            e.phase.as_str(),
            e.timestamp.as_millis_f64(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}ms",
            e.frame_index,
            e.phase.as_str(),
            e.timestamp.as_millis_f64(),
        );
    }

    fn on_stats(&mut self, e: &StatsEvent) {
        let _ = writeln!(
            self.writer,
            "[stats] fps={:.1} iterations={} skipped={}",
            e.stats.fps, e.stats.iterations, e.stats.skipped,
        );
    }

    fn on_run_state(&mut self, e: &RunStateEvent) {
        let _ = writeln!(
            self.writer,
            "[state] {} -> {}",
            e.from.as_str(),
            e.to.as_str(),
        );
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        let d = &e.descriptor;
        let _ = writeln!(
            self.writer,
            "[resize] {}x{} scale={:.3} margin=({:.1}, {:.1}) entities={}",
            d.width, d.height, d.scale, d.margin.x, d.margin.y, e.entities,
        );
    }

    fn on_action(&mut self, e: &ActionEvent<'_>) {
        let status = if e.applied { "ok" } else { "FAILED" };
        let _ = writeln!(
            self.writer,
            "[action] frame={} entity={} target={} {status}",
            e.frame_index,
            e.entity,
            e.action.target(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableau_core::scheduler::RunState;
    use tableau_core::time::{Duration, HostTime};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_tick(&FrameTickEvent {
            frame_index: 1,
            now: HostTime(1_500_000),
            dt: 0.016,
            once_second: false,
        });
        let output = output(sink);
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=1500.0ms"), "got: {output}");
    }

    #[test]
    fn skipped_callbacks_are_opt_in() {
        let skipped = FrameSkippedEvent {
            now: HostTime(4_000),
            banked: Duration::from_millis(4),
        };
        let mut quiet = PrettyPrintSink::with_writer(Vec::<u8>::new());
        quiet.on_frame_skipped(&skipped);
        assert!(output(quiet).is_empty());

        let mut loud = PrettyPrintSink::with_writer(Vec::<u8>::new()).with_skipped(true);
        loud.on_frame_skipped(&skipped);
        assert!(output(loud).contains("banked=4.0ms"));
    }

    #[test]
    fn run_state_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_run_state(&RunStateEvent {
            from: RunState::Running,
            to: RunState::Paused,
        });
        assert_eq!(output(sink), "[state] running -> paused\n");
    }
}
