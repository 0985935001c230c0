// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds.

use std::io::Write;

use framesync_core::client::FrameControl;
use framesync_core::coordinator::DispatchSummary;
use framesync_core::rate::RateRange;
use framesync_core::time::HostTime;
use framesync_core::trace::{
    ClientFrameEvent, EvictEvent, EvictReason, RateRangeEvent, TraceSink, VsyncEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    show_skipped: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("show_skipped", &self.show_skipped)
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
            show_skipped: true,
        }
    }

    /// Whether to print a line for clients skipped by rate division.
    /// Defaults to `true`.
    #[must_use]
    pub fn show_skipped(mut self, show: bool) -> Self {
        self.show_skipped = show;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

fn range(r: RateRange) -> String {
    if r.is_zero() {
        "none".to_owned()
    } else {
        format!("{}Hz [{}..{}]", r.preferred, r.min, r.max)
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        let changed = if e.period_changed { " (changed)" } else { "" };
        let _ = writeln!(
            self.writer,
            "[vsync] at {:.1}µs period={}ns rate={}Hz{changed}",
            us(e.timestamp),
            e.period.nanos(),
            e.source_rate,
        );
    }

    fn on_client_frame(&mut self, e: &ClientFrameEvent) {
        if e.skipped && !self.show_skipped {
            return;
        }
        let what = if e.skipped { "skip" } else { "run" };
        let stop = match e.control {
            FrameControl::Continue => "",
            FrameControl::Stop => " stop",
        };
        let _ = writeln!(self.writer, "[frame] client={} {what}{stop}", e.id.0);
    }

    fn on_evict(&mut self, e: &EvictEvent) {
        let reason = match e.reason {
            EvictReason::Expired => "expired",
            EvictReason::Stopped => "stopped",
        };
        let _ = writeln!(self.writer, "[evict] client={} {reason}", e.id.0);
    }

    fn on_dispatch(&mut self, s: &DispatchSummary) {
        let _ = writeln!(
            self.writer,
            "[dispatch] at {:.1}µs ran={} skipped={} evicted={} stopped={} display={}",
            us(s.timestamp),
            s.ticked,
            s.skipped,
            s.evicted,
            s.stopped,
            range(s.aggregate),
        );
    }

    fn on_rate_range(&mut self, e: &RateRangeEvent) {
        let ignored = if e.merged { "" } else { " (ignored)" };
        let _ = writeln!(
            self.writer,
            "[range] client={} wants {}{ignored}",
            e.id.0,
            range(e.range),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framesync_core::client::SyncId;
    use framesync_core::time::Duration;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_vsync() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_vsync(&VsyncEvent {
            timestamp: HostTime(1_500_000),
            period: Duration(8_333_333),
            source_rate: 120,
            period_changed: true,
        });
        let output = output(sink);
        assert!(output.contains("[vsync] at 1500.0µs"), "got: {output}");
        assert!(output.contains("rate=120Hz (changed)"), "got: {output}");
    }

    #[test]
    fn pretty_print_dispatch() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_dispatch(&DispatchSummary {
            timestamp: HostTime(0),
            ticked: 2,
            skipped: 1,
            evicted: 0,
            stopped: 0,
            aggregate: RateRange::new(60, 120, 90),
        });
        let output = output(sink);
        assert!(output.contains("ran=2 skipped=1"), "got: {output}");
        assert!(output.contains("display=90Hz [60..120]"), "got: {output}");
    }

    #[test]
    fn skipped_frames_can_be_hidden() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).show_skipped(false);
        for skipped in [true, false] {
            sink.on_client_frame(&ClientFrameEvent {
                id: SyncId(3),
                timestamp: HostTime(0),
                skipped,
                control: FrameControl::Continue,
            });
        }
        let output = output(sink);
        assert_eq!(output, "[frame] client=3 run\n");
    }

    #[test]
    fn empty_range_prints_none() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_rate_range(&RateRangeEvent {
            id: SyncId(4),
            range: RateRange::ZERO,
            merged: false,
        });
        let output = output(sink);
        assert_eq!(output, "[range] client=4 wants none (ignored)\n");
    }
}
