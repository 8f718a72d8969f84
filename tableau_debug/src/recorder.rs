// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Action events keep the action kind and target name but not the value.

use kurbo::Vec2;
use tableau_core::action::PendingAction;
use tableau_core::resize::ResizeDescriptor;
use tableau_core::scheduler::{FrameStats, RunState};
use tableau_core::time::{Duration, HostTime};
use tableau_core::trace::{
    ActionEvent, FrameSkippedEvent, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ResizeEvent, RunStateEvent, StatsEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_TICK: u8 = 1;
const TAG_FRAME_SKIPPED: u8 = 2;
const TAG_PHASE_BEGIN: u8 = 3;
const TAG_PHASE_END: u8 = 4;
const TAG_STATS: u8 = 5;
const TAG_RUN_STATE: u8 = 6;
const TAG_RESIZE: u8 = 7;
const TAG_ACTION: u8 = 8;

/// Which kind of state-machine action was dequeued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// [`PendingAction::Enum`].
    Enum,
    /// [`PendingAction::Trigger`].
    Trigger,
    /// [`PendingAction::Boolean`].
    Boolean,
    /// [`PendingAction::Number`].
    Number,
}

impl ActionKind {
    fn of(action: &PendingAction) -> Self {
        match action {
            PendingAction::Enum { .. } => Self::Enum,
            PendingAction::Trigger { .. } => Self::Trigger,
            PendingAction::Boolean { .. } => Self::Boolean,
            PendingAction::Number { .. } => Self::Number,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enum => "enum",
            Self::Trigger => "trigger",
            Self::Boolean => "boolean",
            Self::Number => "number",
        }
    }
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_len(&mut self, len: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "lengths capped at u32::MAX for recording"
        )]
        self.write_u32(len.min(u32::MAX as usize) as u32);
    }

    fn write_str(&mut self, s: &str) {
        // Truncated strings are cut on a char boundary.
        let mut end = s.len().min(u32::MAX as usize);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.write_len(end);
        self.buf.extend_from_slice(&s.as_bytes()[..end]);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Listeners => 0,
            PhaseKind::Physics => 1,
            PhaseKind::Update => 2,
            PhaseKind::Render => 3,
        });
    }

    fn write_run_state(&mut self, s: RunState) {
        self.write_u8(match s {
            RunState::Stopped => 0,
            RunState::Running => 1,
            RunState::Paused => 2,
        });
    }

    fn write_action_kind(&mut self, k: ActionKind) {
        self.write_u8(match k {
            ActionKind::Enum => 0,
            ActionKind::Trigger => 1,
            ActionKind::Boolean => 2,
            ActionKind::Number => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.write_u8(TAG_FRAME_TICK);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.ticks());
        self.write_f64(e.dt);
        self.write_bool(e.once_second);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.write_u8(TAG_FRAME_SKIPPED);
        self.write_u64(e.now.ticks());
        self.write_u64(e.banked.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_stats(&mut self, e: &StatsEvent) {
        self.write_u8(TAG_STATS);
        self.write_u64(e.now.ticks());
        self.write_f64(e.stats.fps);
        self.write_u32(e.stats.iterations);
        self.write_u32(e.stats.skipped);
    }

    fn on_run_state(&mut self, e: &RunStateEvent) {
        self.write_u8(TAG_RUN_STATE);
        self.write_run_state(e.from);
        self.write_run_state(e.to);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        self.write_u8(TAG_RESIZE);
        self.write_u64(e.now.ticks());
        self.write_f64(e.descriptor.width);
        self.write_f64(e.descriptor.height);
        self.write_f64(e.descriptor.scale);
        self.write_f64(e.descriptor.margin.x);
        self.write_f64(e.descriptor.margin.y);
        self.write_len(e.entities);
    }

    fn on_action(&mut self, e: &ActionEvent<'_>) {
        self.write_u8(TAG_ACTION);
        self.write_u64(e.frame_index);
        self.write_u64(e.entity.get());
        self.write_action_kind(ActionKind::of(e.action));
        self.write_bool(e.applied);
        self.write_str(e.action.target());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A dequeued action as recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedAction {
    /// Frame counter.
    pub frame_index: u64,
    /// Raw id of the entity that owns the queue.
    pub entity: u64,
    /// Action kind.
    pub kind: ActionKind,
    /// Input name or property path.
    pub target: String,
    /// Whether it applied cleanly.
    pub applied: bool,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameTickEvent`].
    FrameTick(FrameTickEvent),
    /// A [`FrameSkippedEvent`].
    FrameSkipped(FrameSkippedEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`StatsEvent`].
    Stats(StatsEvent),
    /// A [`RunStateEvent`].
    RunState(RunStateEvent),
    /// A [`ResizeEvent`].
    Resize(ResizeEvent),
    /// An [`ActionEvent`].
    Action(RecordedAction),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_bytes(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.read_bytes(8)?.try_into().ok()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        Some(f64::from_le_bytes(self.read_bytes(8)?.try_into().ok()?))
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Listeners,
            1 => PhaseKind::Physics,
            2 => PhaseKind::Update,
            _ => PhaseKind::Render,
        })
    }

    fn read_run_state(&mut self) -> Option<RunState> {
        Some(match self.read_u8()? {
            0 => RunState::Stopped,
            1 => RunState::Running,
            _ => RunState::Paused,
        })
    }

    fn read_action_kind(&mut self) -> Option<ActionKind> {
        Some(match self.read_u8()? {
            0 => ActionKind::Enum,
            1 => ActionKind::Trigger,
            2 => ActionKind::Boolean,
            _ => ActionKind::Number,
        })
    }

    fn decode_frame_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameTick(FrameTickEvent {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            dt: self.read_f64()?,
            once_second: self.read_bool()?,
        }))
    }

    fn decode_frame_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSkipped(FrameSkippedEvent {
            now: HostTime(self.read_u64()?),
            banked: Duration(self.read_u64()?),
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_stats(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Stats(StatsEvent {
            now: HostTime(self.read_u64()?),
            stats: FrameStats {
                fps: self.read_f64()?,
                iterations: self.read_u32()?,
                skipped: self.read_u32()?,
            },
        }))
    }

    fn decode_run_state(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RunState(RunStateEvent {
            from: self.read_run_state()?,
            to: self.read_run_state()?,
        }))
    }

    fn decode_resize(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Resize(ResizeEvent {
            now: HostTime(self.read_u64()?),
            descriptor: ResizeDescriptor {
                width: self.read_f64()?,
                height: self.read_f64()?,
                scale: self.read_f64()?,
                margin: Vec2::new(self.read_f64()?, self.read_f64()?),
            },
            entities: self.read_u32()? as usize,
        }))
    }

    fn decode_action(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Action(RecordedAction {
            frame_index: self.read_u64()?,
            entity: self.read_u64()?,
            kind: self.read_action_kind()?,
            applied: self.read_bool()?,
            target: self.read_string()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_TICK => self.decode_frame_tick(),
            TAG_FRAME_SKIPPED => self.decode_frame_skipped(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_STATS => self.decode_stats(),
            TAG_RUN_STATE => self.decode_run_state(),
            TAG_RESIZE => self.decode_resize(),
            TAG_ACTION => self.decode_action(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
