// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sync clients: anything that wants a callback once per frame.
//!
//! The [`DisplaySyncCoordinator`](crate::coordinator::DisplaySyncCoordinator)
//! talks to clients only through the [`SyncClient`] capability trait. Every
//! method takes `&self`, so a client can call back into the coordinator (for
//! instance to unregister itself) from inside its own frame callback.
//!
//! Most users do not implement [`SyncClient`] directly. [`DisplaySync`] is the
//! standard client: it owns a [`FrameHandler`], tracks the requested
//! [`RateRange`], and divides the display rate so that a 30 Hz handler on a
//! 60 Hz display runs on every second vsync.
//!
//! # Per-dispatch sequence
//!
//! ```text
//!   check_rate(source_rate, mode)   recompute divisor
//!   update(timestamp, period)       record timestamp, target timestamp
//!   judge_skip()                    advance skip counter
//!   on_frame()                      run handler unless skipped
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::mode::RefreshRateMode;
use crate::rate::{RateRange, divisor_for};
use crate::time::{Duration, HostTime};

/// Process-unique identifier of a sync client.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncId(pub u64);

impl SyncId {
    /// Allocates a fresh id.
    ///
    /// The counter is 32 bits wide so that targets without 64-bit atomics
    /// can allocate ids; it wraps after `u32::MAX` allocations.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(u64::from(NEXT.fetch_add(1, Ordering::Relaxed)))
    }
}

impl fmt::Debug for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncId({})", self.0)
    }
}

/// What a client wants after its frame callback ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FrameControl {
    /// Keep receiving frames.
    #[default]
    Continue,
    /// Unregister after this frame.
    Stop,
}

/// Data handed to a [`FrameHandler`] on every frame it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncFrame {
    /// The client being ticked.
    pub id: SyncId,
    /// Vsync timestamp of this frame.
    pub timestamp: HostTime,
    /// When the handler's next frame is due: `timestamp + period * divisor`.
    pub target_timestamp: HostTime,
    /// The client's preferred rate.
    pub preferred_rate: u32,
    /// The display's current rate.
    pub source_rate: u32,
    /// Number of vsyncs between runs of this handler.
    pub divisor: u32,
    /// Policy selector forwarded by the coordinator.
    pub mode: RefreshRateMode,
}

impl SyncFrame {
    /// Time until the handler's next frame.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.target_timestamp
            .saturating_duration_since(self.timestamp)
    }
}

/// Coordinator-facing capability interface of a sync client.
///
/// The coordinator calls these in the order shown in the
/// [module docs](self), once per dispatch, for each live client.
pub trait SyncClient {
    /// Stable identity of this client.
    fn id(&self) -> SyncId;

    /// The refresh-rate range this client currently requests.
    fn rate_range(&self) -> RateRange;

    /// Recomputes the rate divisor for the given display rate and policy.
    fn check_rate(&self, source_rate: u32, mode: RefreshRateMode);

    /// Advances timing state to the given vsync.
    fn update(&self, timestamp: HostTime, period: Duration);

    /// Advances the skip counter. Returns `true` if this vsync is skipped.
    fn judge_skip(&self) -> bool;

    /// Runs the frame callback unless the last [`judge_skip`](Self::judge_skip)
    /// decided to skip.
    fn on_frame(&self) -> FrameControl;
}

/// User-facing per-frame callback.
pub trait FrameHandler {
    /// Called on every frame that is not skipped by rate division.
    fn on_frame(&mut self, frame: &SyncFrame) -> FrameControl;
}

/// The standard rate-dividing [`SyncClient`].
///
/// Wrap it in an [`Rc`](alloc::rc::Rc) and register it with a coordinator.
/// The coordinator only keeps a weak reference, so dropping the last `Rc`
/// retires the client.
pub struct DisplaySync<H> {
    id: SyncId,
    range: Cell<RateRange>,
    source_rate: Cell<u32>,
    mode: Cell<RefreshRateMode>,
    divisor: Cell<u32>,
    rate_changed: Cell<bool>,
    count: Cell<u32>,
    timestamp: Cell<HostTime>,
    target_timestamp: Cell<HostTime>,
    skip: Cell<bool>,
    handler: RefCell<Option<H>>,
}

impl<H> fmt::Debug for DisplaySync<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplaySync")
            .field("id", &self.id)
            .field("range", &self.range.get())
            .field("source_rate", &self.source_rate.get())
            .field("divisor", &self.divisor.get())
            .field("timestamp", &self.timestamp.get())
            .field("target_timestamp", &self.target_timestamp.get())
            .finish_non_exhaustive()
    }
}

impl<H: FrameHandler> DisplaySync<H> {
    /// Creates a client with no rate preference.
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self::with_range(handler, RateRange::ZERO)
    }

    /// Creates a client requesting `range` (normalized).
    #[must_use]
    pub fn with_range(handler: H, range: RateRange) -> Self {
        Self {
            id: SyncId::next(),
            range: Cell::new(range.normalized()),
            source_rate: Cell::new(0),
            mode: Cell::new(RefreshRateMode::default()),
            divisor: Cell::new(1),
            rate_changed: Cell::new(true),
            count: Cell::new(0),
            timestamp: Cell::new(HostTime::default()),
            target_timestamp: Cell::new(HostTime::default()),
            skip: Cell::new(false),
            handler: RefCell::new(Some(handler)),
        }
    }

    /// Replaces the requested range. Out-of-domain values are clamped.
    pub fn set_expected_rate_range(&self, range: RateRange) {
        self.range.set(range.normalized());
    }

    /// Timestamp of the last vsync this client saw.
    #[must_use]
    pub fn timestamp(&self) -> HostTime {
        self.timestamp.get()
    }

    /// When the handler's next frame is due.
    #[must_use]
    pub fn target_timestamp(&self) -> HostTime {
        self.target_timestamp.get()
    }

    /// Current rate divisor (1 = every vsync).
    #[must_use]
    pub fn divisor(&self) -> u32 {
        self.divisor.get()
    }

    /// Display rate observed on the last dispatch.
    #[must_use]
    pub fn source_rate(&self) -> u32 {
        self.source_rate.get()
    }

    /// Policy selector observed on the last dispatch.
    #[must_use]
    pub fn refresh_rate_mode(&self) -> RefreshRateMode {
        self.mode.get()
    }

    /// Returns `true` if the last vsync was skipped.
    #[must_use]
    pub fn is_skipping(&self) -> bool {
        self.skip.get()
    }

    /// Runs `f` with the handler. Returns `None` if the handler was taken or
    /// is currently running (re-entrant access from its own callback).
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        let mut handler = self.handler.try_borrow_mut().ok()?;
        handler.as_mut().map(f)
    }

    /// Detaches the frame handler while the client stays registered.
    ///
    /// The client keeps contributing its rate range and advancing its
    /// timing state, but no callback runs until
    /// [`set_handler`](Self::set_handler) installs a new one. Returns `None`
    /// if there was no handler or it is currently running.
    pub fn take_handler(&self) -> Option<H> {
        self.handler.try_borrow_mut().ok()?.take()
    }

    /// Installs a frame handler, returning the previous one.
    ///
    /// Returns `Err(handler)` unchanged if called from the running handler.
    pub fn set_handler(&self, handler: H) -> Result<Option<H>, H> {
        match self.handler.try_borrow_mut() {
            Ok(mut slot) => Ok(slot.replace(handler)),
            Err(_) => Err(handler),
        }
    }

    /// Returns `true` while a frame handler is installed.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        // A running handler is installed by definition.
        match self.handler.try_borrow() {
            Ok(handler) => handler.is_some(),
            Err(_) => true,
        }
    }

    /// Consumes the client and returns its handler, if any.
    #[must_use]
    pub fn into_handler(self) -> Option<H> {
        self.handler.into_inner()
    }

    fn frame(&self) -> SyncFrame {
        SyncFrame {
            id: self.id,
            timestamp: self.timestamp.get(),
            target_timestamp: self.target_timestamp.get(),
            preferred_rate: self.range.get().preferred,
            source_rate: self.source_rate.get(),
            divisor: self.divisor.get(),
            mode: self.mode.get(),
        }
    }
}

impl<H: FrameHandler> SyncClient for DisplaySync<H> {
    fn id(&self) -> SyncId {
        self.id
    }

    fn rate_range(&self) -> RateRange {
        self.range.get()
    }

    fn check_rate(&self, source_rate: u32, mode: RefreshRateMode) {
        self.source_rate.set(source_rate);
        self.mode.set(mode);

        let Some(divisor) = divisor_for(self.range.get().preferred, source_rate) else {
            return;
        };
        if divisor != self.divisor.get() {
            self.divisor.set(divisor);
            self.rate_changed.set(true);
            tracing::debug!(id = self.id.0, divisor, source_rate, "sync client divisor changed");
        }
    }

    fn update(&self, timestamp: HostTime, period: Duration) {
        self.timestamp.set(timestamp);
        self.target_timestamp
            .set(timestamp.saturating_add(period.saturating_mul(self.divisor.get())));
    }

    fn judge_skip(&self) -> bool {
        if self.rate_changed.replace(false) {
            self.count.set(0);
        }

        let count = self.count.get() + 1;
        let run = count % self.divisor.get().max(1) == 0;
        self.count.set(if run { 0 } else { count });
        self.skip.set(!run);
        !run
    }

    fn on_frame(&self) -> FrameControl {
        if self.skip.get() {
            return FrameControl::Continue;
        }
        let frame = self.frame();
        match self.handler.try_borrow_mut() {
            Ok(mut handler) => handler
                .as_mut()
                .map_or(FrameControl::Continue, |h| h.on_frame(&frame)),
            Err(_) => FrameControl::Continue,
        }
    }
}
