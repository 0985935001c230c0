// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Vsyncs and dispatches land on thread 0. Each client gets its own thread
//! track keyed by its id. The display and source rates are also emitted as
//! counter tracks.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use framesync_core::client::FrameControl;
use framesync_core::time::HostTime;
use framesync_core::trace::EvictReason;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Timestamps are in microseconds. Rate-range events carry no timestamp of
/// their own and are placed at the most recent vsync.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut now = HostTime::default();

    for recorded in decode(bytes) {
        if let Some(t) = recorded.timestamp() {
            now = t;
        }
        match recorded {
            RecordedEvent::Vsync(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Vsync",
                    "cat": "Vsync",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "period_ns": e.period.nanos(),
                        "source_rate": e.source_rate,
                        "period_changed": e.period_changed,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "SourceRate",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "args": { "hz": e.source_rate }
                }));
            }
            RecordedEvent::ClientFrame(e) => {
                let name = if e.skipped { "Skip" } else { "Frame" };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Client",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": e.id.0,
                    "s": "t",
                    "args": {
                        "stop": e.control == FrameControl::Stop,
                    }
                }));
            }
            RecordedEvent::Evict(e) => {
                let name = match e.reason {
                    EvictReason::Expired => "Expired",
                    EvictReason::Stopped => "Stopped",
                };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Registry",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": e.id.0,
                    "s": "t",
                }));
            }
            RecordedEvent::Dispatch(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dispatch",
                    "cat": "Vsync",
                    "ts": us(s.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "ticked": s.ticked,
                        "skipped": s.skipped,
                        "evicted": s.evicted,
                        "stopped": s.stopped,
                        "min": s.aggregate.min,
                        "max": s.aggregate.max,
                        "preferred": s.aggregate.preferred,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "DisplayRate",
                    "ts": us(s.timestamp),
                    "pid": 0,
                    "args": { "hz": s.preferred_rate() }
                }));
            }
            RecordedEvent::RateRange(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "RateRange",
                    "cat": "Client",
                    "ts": us(now),
                    "pid": 0,
                    "tid": e.id.0,
                    "s": "t",
                    "args": {
                        "min": e.range.min,
                        "max": e.range.max,
                        "preferred": e.range.preferred,
                        "merged": e.merged,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use framesync_core::client::SyncId;
    use framesync_core::coordinator::DispatchSummary;
    use framesync_core::rate::RateRange;
    use framesync_core::time::Duration;
    use framesync_core::trace::{ClientFrameEvent, RateRangeEvent, TraceSink, VsyncEvent};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_vsync(&VsyncEvent {
            timestamp: HostTime(1_000_000),
            period: Duration(16_666_667),
            source_rate: 60,
            period_changed: true,
        });
        rec.on_rate_range(&RateRangeEvent {
            id: SyncId(5),
            range: RateRange::fixed(30),
            merged: true,
        });
        rec.on_client_frame(&ClientFrameEvent {
            id: SyncId(5),
            timestamp: HostTime(1_000_000),
            skipped: false,
            control: FrameControl::Continue,
        });
        rec.on_dispatch(&DispatchSummary {
            timestamp: HostTime(1_000_000),
            ticked: 1,
            skipped: 0,
            evicted: 0,
            stopped: 0,
            aggregate: RateRange::fixed(30),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 6);

        assert_eq!(parsed[0]["name"], "Vsync");
        assert_eq!(parsed[0]["ts"], 1000.0);
        assert_eq!(parsed[1]["ph"], "C");
        assert_eq!(parsed[1]["args"]["hz"], 60);

        // Rate ranges inherit the vsync timestamp.
        assert_eq!(parsed[2]["name"], "RateRange");
        assert_eq!(parsed[2]["ts"], 1000.0);
        assert_eq!(parsed[2]["tid"], 5);

        assert_eq!(parsed[3]["name"], "Frame");
        assert_eq!(parsed[4]["name"], "Dispatch");
        assert_eq!(parsed[5]["name"], "DisplayRate");
        assert_eq!(parsed[5]["args"]["hz"], 30);
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
