// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync multiplexing and refresh-rate aggregation for frame-driven clients.
//!
//! `framesync_core` lets any number of animations, timers, and UI effects
//! share a single hardware vsync signal. Each client asks for a refresh-rate
//! range; once per vsync the coordinator ticks every client, divides the
//! display rate for clients that want to run slower, and folds all requests
//! into one preferred rate for the display pipeline. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   Platform vsync (timestamp, period)
//!       │
//!       ▼
//!   DisplaySyncCoordinator::on_vsync()
//!       │  set_vsync_period() ── snap to standard rate
//!       │  dispatch()
//!       ▼
//!   for each SyncClient (weakly held, snapshot):
//!       rate_range() ──► RateRange::merge ──► display_sync_rate()
//!       check_rate() ─ update() ─ judge_skip() ─ on_frame()
//!                                                   │
//!                                                   ▼
//!                                     FrameHandler::on_frame(&SyncFrame)
//! ```
//!
//! **[`coordinator`]**: The [`DisplaySyncCoordinator`](coordinator::DisplaySyncCoordinator)
//! registry and dispatch loop, plus its configuration.
//!
//! **[`client`]**: The [`SyncClient`](client::SyncClient) capability trait,
//! the [`FrameHandler`](client::FrameHandler) callback trait, and the
//! rate-dividing [`DisplaySync`](client::DisplaySync) client.
//!
//! **[`rate`]**: [`RateRange`](rate::RateRange) requests, merging,
//! standard-rate snapping, and rate division.
//!
//! **[`mode`]**: The refresh-rate policy selector.
//!
//! **[`time`]**: Nanosecond timestamps and periods.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! dispatch instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! Operational logging goes through the [`tracing`] macros.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-client
//!   rate-range events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod client;
pub mod coordinator;
pub mod mode;
pub mod rate;
pub mod time;
pub mod trace;
