// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Host times are already microseconds, which is the unit the format expects.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Run-state events carry no timestamp of their own; they are placed at the
/// time of the event recorded just before them.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0_u64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameTick(e) => {
                last_ts = e.now.ticks();
                events.push(json!({
                    "ph": "i",
                    "name": "FrameTick",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "dt_ms": e.dt * 1000.0,
                        "once_second": e.once_second,
                    }
                }));
            }
            RecordedEvent::FrameSkipped(e) => {
                last_ts = e.now.ticks();
                events.push(json!({
                    "ph": "C",
                    "name": "Banked",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "banked_ms": e.banked.as_millis_f64(),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_ts = e.timestamp.ticks();
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.as_str(),
                    "cat": "Frame",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_ts = e.timestamp.ticks();
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.as_str(),
                    "cat": "Frame",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Stats(e) => {
                last_ts = e.now.ticks();
                events.push(json!({
                    "ph": "C",
                    "name": "Stats",
                    "cat": "Summary",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "fps": e.stats.fps,
                        "iterations": e.stats.iterations,
                        "skipped": e.stats.skipped,
                    }
                }));
            }
            RecordedEvent::RunState(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RunState",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "from": e.from.as_str(),
                        "to": e.to.as_str(),
                    }
                }));
            }
            RecordedEvent::Resize(e) => {
                last_ts = e.now.ticks();
                events.push(json!({
                    "ph": "i",
                    "name": "Resize",
                    "cat": "Layout",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "width": e.descriptor.width,
                        "height": e.descriptor.height,
                        "scale": e.descriptor.scale,
                        "entities": e.entities,
                    }
                }));
            }
            RecordedEvent::Action(a) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Action",
                    "cat": "Entity",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": a.entity,
                    "s": "t",
                    "args": {
                        "frame_index": a.frame_index,
                        "kind": a.kind.as_str(),
                        "target": a.target,
                        "applied": a.applied,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use tableau_core::scheduler::RunState;
    use tableau_core::time::HostTime;
    use tableau_core::trace::{
        FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RunStateEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_tick(&FrameTickEvent {
            frame_index: 0,
            now: HostTime(1_000),
            dt: 0.016,
            once_second: false,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Update,
            timestamp: HostTime(1_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Update,
            timestamp: HostTime(1_100),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameTick");
        assert_eq!(parsed[0]["ts"], 1_000);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "update");

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1_100);
    }

    #[test]
    fn run_state_borrows_previous_timestamp() {
        let mut rec = RecorderSink::new();
        rec.on_frame_tick(&FrameTickEvent {
            frame_index: 3,
            now: HostTime(50_000),
            dt: 0.016,
            once_second: false,
        });
        rec.on_run_state(&RunStateEvent {
            from: RunState::Running,
            to: RunState::Paused,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[1]["name"], "RunState");
        assert_eq!(parsed[1]["ts"], 50_000);
        assert_eq!(parsed[1]["args"]["to"], "paused");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
