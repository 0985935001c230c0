// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for vsync dispatch.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`DisplaySyncCoordinator`](crate::coordinator::DisplaySyncCoordinator)
//! calls while handling a vsync. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`DispatchStats`] is a ready-made sink that keeps running totals.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-client [`RateRangeEvent`]s.

use crate::client::{FrameControl, SyncId};
use crate::coordinator::DispatchSummary;
#[cfg(feature = "trace-rich")]
use crate::rate::RateRange;
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the platform delivers a vsync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VsyncEvent {
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Hardware period reported with this vsync.
    pub period: Duration,
    /// Display rate after the period was applied.
    pub source_rate: u32,
    /// Whether the period differed from the previous one.
    pub period_changed: bool,
}

/// Emitted once per live client per dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientFrameEvent {
    /// The client.
    pub id: SyncId,
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Whether rate division skipped this client's callback.
    pub skipped: bool,
    /// What the client asked for after the frame.
    pub control: FrameControl,
}

/// Why a client left the registry during a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvictReason {
    /// Its owner dropped the last strong reference.
    Expired,
    /// It returned [`FrameControl::Stop`].
    Stopped,
}

/// Emitted when a client is removed by the coordinator during a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictEvent {
    /// The client.
    pub id: SyncId,
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Why it was removed.
    pub reason: EvictReason,
}

/// A client's rate request as seen by the aggregator.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateRangeEvent {
    /// The client.
    pub id: SyncId,
    /// Its requested range.
    pub range: RateRange,
    /// Whether the range was valid and merged into the aggregate.
    pub merged: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the coordinator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a vsync is received, before dispatch.
    fn on_vsync(&mut self, e: &VsyncEvent) {
        _ = e;
    }

    /// Called after each live client was ticked.
    fn on_client_frame(&mut self, e: &ClientFrameEvent) {
        _ = e;
    }

    /// Called when a client is evicted or stops.
    fn on_evict(&mut self, e: &EvictEvent) {
        _ = e;
    }

    /// Called at the end of a non-empty dispatch.
    fn on_dispatch(&mut self, s: &DispatchSummary) {
        _ = s;
    }

    /// Called with each client's rate request (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_rate_range(&mut self, e: &RateRangeEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
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

    /// Emits a [`VsyncEvent`].
    #[inline]
    pub fn vsync(&mut self, e: &VsyncEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_vsync(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ClientFrameEvent`].
    #[inline]
    pub fn client_frame(&mut self, e: &ClientFrameEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_client_frame(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EvictEvent`].
    #[inline]
    pub fn evict(&mut self, e: &EvictEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_evict(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DispatchSummary`].
    #[inline]
    pub fn dispatch(&mut self, s: &DispatchSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_dispatch(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`RateRangeEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn rate_range(&mut self, e: &RateRangeEvent) {
        if let Some(s) = &mut self.sink {
            s.on_rate_range(e);
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchStats
// ---------------------------------------------------------------------------

/// Running totals over a stream of trace events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Vsyncs received.
    pub vsyncs: u64,
    /// Vsyncs whose period differed from the previous one.
    pub period_changes: u64,
    /// Non-empty dispatches.
    pub dispatches: u64,
    /// Client callbacks that ran.
    pub frames_run: u64,
    /// Client callbacks skipped by rate division.
    pub frames_skipped: u64,
    /// Clients dropped because their owner went away.
    pub expired: u64,
    /// Clients that stopped themselves.
    pub stopped: u64,
    /// Times the preferred display rate changed between dispatches.
    pub rate_changes: u64,
    /// Preferred display rate after the last dispatch.
    pub last_preferred_rate: u32,
}

impl TraceSink for DispatchStats {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.vsyncs += 1;
        if e.period_changed {
            self.period_changes += 1;
        }
    }

    fn on_client_frame(&mut self, e: &ClientFrameEvent) {
        if e.skipped {
            self.frames_skipped += 1;
        } else {
            self.frames_run += 1;
        }
    }

    fn on_evict(&mut self, e: &EvictEvent) {
        match e.reason {
            EvictReason::Expired => self.expired += 1,
            EvictReason::Stopped => self.stopped += 1,
        }
    }

    fn on_dispatch(&mut self, s: &DispatchSummary) {
        if self.dispatches > 0 && s.preferred_rate() != self.last_preferred_rate {
            self.rate_changes += 1;
        }
        self.dispatches += 1;
        self.last_preferred_rate = s.preferred_rate();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::RateRange as Range;

    fn summary(preferred: u32) -> DispatchSummary {
        DispatchSummary {
            timestamp: HostTime(0),
            ticked: 1,
            skipped: 0,
            evicted: 0,
            stopped: 0,
            aggregate: Range::fixed(preferred),
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_vsync(&VsyncEvent {
            timestamp: HostTime(0),
            period: Duration(16_666_667),
            source_rate: 60,
            period_changed: true,
        });
        sink.on_dispatch(&summary(60));
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.dispatch(&summary(60));
        tracer.evict(&EvictEvent {
            id: SyncId(1),
            timestamp: HostTime(0),
            reason: EvictReason::Expired,
        });
    }

    #[test]
    fn stats_count_frames_and_evictions() {
        let mut stats = DispatchStats::default();
        for skipped in [false, true, false] {
            stats.on_client_frame(&ClientFrameEvent {
                id: SyncId(1),
                timestamp: HostTime(0),
                skipped,
                control: FrameControl::Continue,
            });
        }
        stats.on_evict(&EvictEvent {
            id: SyncId(2),
            timestamp: HostTime(0),
            reason: EvictReason::Stopped,
        });
        assert_eq!(stats.frames_run, 2);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.stopped, 1);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn stats_track_rate_changes() {
        let mut stats = DispatchStats::default();
        stats.on_dispatch(&summary(60));
        stats.on_dispatch(&summary(60));
        stats.on_dispatch(&summary(120));
        assert_eq!(stats.dispatches, 3);
        assert_eq!(stats.rate_changes, 1, "first dispatch is not a change");
        assert_eq!(stats.last_preferred_rate, 120);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        let mut stats = DispatchStats::default();
        let mut tracer = Tracer::new(&mut stats);
        tracer.vsync(&VsyncEvent {
            timestamp: HostTime(0),
            period: Duration(8_333_333),
            source_rate: 120,
            period_changed: true,
        });
        tracer.dispatch(&summary(120));
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(stats.vsyncs, 1);
        assert_eq!(stats.period_changes, 1);
        assert_eq!(stats.last_preferred_rate, 120);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn coordinator_reports_through_tracer() {
        use alloc::rc::Rc;

        use crate::client::{DisplaySync, FrameHandler, SyncFrame};
        use crate::coordinator::DisplaySyncCoordinator;

        struct Idle;
        impl FrameHandler for Idle {
            fn on_frame(&mut self, _frame: &SyncFrame) -> FrameControl {
                FrameControl::Continue
            }
        }

        let coordinator = DisplaySyncCoordinator::new();
        let half = Rc::new(DisplaySync::with_range(Idle, Range::fixed(30)));
        let gone = Rc::new(DisplaySync::with_range(Idle, Range::fixed(60)));
        coordinator.register(&half);
        coordinator.register(&gone);
        drop(gone);

        let mut stats = DispatchStats::default();
        let mut tracer = Tracer::new(&mut stats);
        for n in 0..4 {
            coordinator.on_vsync_traced(HostTime(n * 16_666_667), Duration(16_666_667), &mut tracer);
        }
        drop(tracer);

        assert_eq!(stats.vsyncs, 4);
        assert_eq!(stats.period_changes, 1);
        assert_eq!(stats.dispatches, 4);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.frames_run, 2);
        assert_eq!(stats.frames_skipped, 2);
        assert_eq!(stats.last_preferred_rate, 30);
    }
}
