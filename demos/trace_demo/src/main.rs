// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated vsync loop that exercises the coordinator and the diagnostics
//! pipeline.
//!
//! Drives a coordinator with 40 vsyncs at 60 Hz followed by 40 at 120 Hz.
//! Four clients ask for different rates; one stops itself and one is dropped
//! by its owner halfway through. Events go to both a
//! [`PrettyPrintSink`](framesync_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](framesync_debug::recorder::RecorderSink), and the
//! recording is exported as a Chrome trace JSON file.

use std::fs::File;
use std::io::{self, BufWriter};
use std::rc::Rc;

use framesync_core::client::{DisplaySync, FrameControl, FrameHandler, SyncFrame};
use framesync_core::coordinator::{DispatchSummary, DisplaySyncCoordinator};
use framesync_core::mode::RefreshRateMode;
use framesync_core::rate::RateRange;
use framesync_core::time::{Duration, HostTime};
use framesync_core::trace::{
    ClientFrameEvent, DispatchStats, EvictEvent, RateRangeEvent, TraceSink, Tracer, VsyncEvent,
};

use framesync_debug::pretty::PrettyPrintSink;
use framesync_debug::recorder::RecorderSink;

const VSYNCS_PER_PHASE: u64 = 40;
const PERIOD_60: Duration = Duration::from_rate(60);
const PERIOD_120: Duration = Duration::from_rate(120);

/// Counts frames and optionally stops after a fixed number of them.
struct Animation {
    name: &'static str,
    frames: u32,
    stop_after: Option<u32>,
}

impl Animation {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            frames: 0,
            stop_after: None,
        }
    }
}

impl FrameHandler for Animation {
    fn on_frame(&mut self, _frame: &SyncFrame) -> FrameControl {
        self.frames += 1;
        match self.stop_after {
            Some(n) if self.frames >= n => FrameControl::Stop,
            _ => FrameControl::Continue,
        }
    }
}

/// Forwards every event to several sinks.
struct Tee<'a>(Vec<&'a mut dyn TraceSink>);

impl TraceSink for Tee<'_> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.0.iter_mut().for_each(|s| s.on_vsync(e));
    }

    fn on_client_frame(&mut self, e: &ClientFrameEvent) {
        self.0.iter_mut().for_each(|s| s.on_client_frame(e));
    }

    fn on_evict(&mut self, e: &EvictEvent) {
        self.0.iter_mut().for_each(|s| s.on_evict(e));
    }

    fn on_dispatch(&mut self, s: &DispatchSummary) {
        self.0.iter_mut().for_each(|sink| sink.on_dispatch(s));
    }

    fn on_rate_range(&mut self, e: &RateRangeEvent) {
        self.0.iter_mut().for_each(|s| s.on_rate_range(e));
    }
}

fn main() -> io::Result<()> {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(io::stdout())).show_skipped(false);
    let mut recorder = RecorderSink::new();
    let mut stats = DispatchStats::default();

    // -- clients -----------------------------------------------------------
    let coordinator = DisplaySyncCoordinator::new();

    let spinner = Rc::new(DisplaySync::with_range(
        Animation::new("spinner"),
        RateRange::fixed(30),
    ));
    let scroll = Rc::new(DisplaySync::with_range(
        Animation::new("scroll"),
        RateRange::fixed(60),
    ));
    let fling = Rc::new(DisplaySync::with_range(
        Animation {
            stop_after: Some(50),
            ..Animation::new("fling")
        },
        RateRange::new(60, 120, 90),
    ));
    let mut toast = Some(Rc::new(DisplaySync::with_range(
        Animation::new("toast"),
        RateRange::fixed(60),
    )));

    for client in [&spinner, &scroll, &fling] {
        coordinator.register(client);
    }
    if let Some(toast) = &toast {
        coordinator.register(toast);
    }

    // -- simulated loop ----------------------------------------------------
    let mut now = HostTime(1_000_000_000); // start at 1s
    {
        let mut tee = Tee(vec![&mut pretty as &mut dyn TraceSink, &mut recorder, &mut stats]);
        let mut tracer = Tracer::new(&mut tee);

        for phase in [PERIOD_60, PERIOD_120] {
            if phase == PERIOD_120 {
                coordinator.set_refresh_rate_mode(RefreshRateMode::Auto);
            }
            for n in 0..VSYNCS_PER_PHASE {
                if n == VSYNCS_PER_PHASE / 2 && phase == PERIOD_60 {
                    // The owner lets go; the coordinator notices on the next vsync.
                    drop(toast.take());
                }
                coordinator.on_vsync_traced(now, phase, &mut tracer);
                now = now + phase;
            }
        }
    }

    // -- report ------------------------------------------------------------
    println!();
    for client in [&spinner, &scroll, &fling] {
        if let Some((name, frames)) = client.with_handler(|a| (a.name, a.frames)) {
            println!(
                "{name}: {frames} frames, divisor {}, registered={}",
                client.divisor(),
                coordinator.has_client(&**client),
            );
        }
    }
    println!("{stats:#?}");
    println!("display rate: {}Hz", coordinator.display_sync_rate());

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    framesync_debug::chrome::export(recorder.as_bytes(), &mut writer)?;

    println!("Wrote {path} ({} vsyncs)", stats.vsyncs);
    Ok(())
}
