// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync multiplexing across sync clients.
//!
//! The [`DisplaySyncCoordinator`] turns one hardware vsync signal into one
//! frame dispatch for every registered [`SyncClient`], and folds the clients'
//! [`RateRange`] requests into a single preferred display rate.
//!
//! # Ownership
//!
//! The coordinator holds clients by [`Weak`] reference only. Dropping the last
//! [`Rc`] of a client retires it; the stale registry entry is evicted on the
//! next dispatch.
//!
//! # Re-entrancy
//!
//! All methods take `&self`. [`dispatch`](DisplaySyncCoordinator::dispatch)
//! snapshots the registry before ticking clients and never holds a registry
//! borrow across a client call, so a client may register or unregister clients
//! (itself included) from its frame callback. Such changes take effect on the
//! next dispatch. The coordinator is `!Send` and is driven from a single
//! thread.
//!
//! # Usage
//!
//! ```rust,ignore
//! let coordinator = DisplaySyncCoordinator::new();
//! let client = Rc::new(DisplaySync::with_range(handler, RateRange::fixed(30)));
//! coordinator.register(&client);
//!
//! // From the platform vsync callback:
//! coordinator.on_vsync(timestamp, period);
//! renderer.request_rate(coordinator.display_sync_rate());
//! ```

use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::client::{FrameControl, SyncClient, SyncId};
use crate::mode::RefreshRateMode;
use crate::rate::{RateRange, SNAP_TOLERANCE, STANDARD_RATES, snap_rate};
use crate::time::{Duration, HostTime};
use crate::trace::{ClientFrameEvent, EvictEvent, EvictReason, Tracer, VsyncEvent};

/// Configuration for the [`DisplaySyncCoordinator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Ascending allow-list that measured rates snap to.
    pub standard_rates: &'static [u32],
    /// Maximum distance, in Hz, for a measured rate to snap.
    pub snap_tolerance: u32,
    /// Display rate assumed before the first vsync period is observed.
    pub initial_rate: u32,
    /// Policy selector in effect before one is set.
    pub initial_mode: RefreshRateMode,
}

impl CoordinatorConfig {
    /// Snaps to the common display rates `{30, 60, 72, 90, 120, 144}` within
    /// ±2 Hz.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            standard_rates: STANDARD_RATES,
            snap_tolerance: SNAP_TOLERANCE,
            initial_rate: 0,
            initial_mode: RefreshRateMode::Null,
        }
    }

    /// Only exact standard rates snap; anything else keeps its measured rate.
    #[must_use]
    pub const fn exact() -> Self {
        Self {
            snap_tolerance: 0,
            ..Self::standard()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of a single [`dispatch`](DisplaySyncCoordinator::dispatch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Vsync timestamp that was dispatched.
    pub timestamp: HostTime,
    /// Clients whose frame callback ran.
    pub ticked: u32,
    /// Live clients skipped by rate division.
    pub skipped: u32,
    /// Expired clients dropped from the registry.
    pub evicted: u32,
    /// Clients that asked to stop and were unregistered.
    pub stopped: u32,
    /// Merged rate request of all live clients in this pass.
    pub aggregate: RateRange,
}

impl DispatchSummary {
    fn empty(timestamp: HostTime, aggregate: RateRange) -> Self {
        Self {
            timestamp,
            ticked: 0,
            skipped: 0,
            evicted: 0,
            stopped: 0,
            aggregate,
        }
    }

    /// The preferred display rate after this pass.
    #[must_use]
    pub const fn preferred_rate(&self) -> u32 {
        self.aggregate.preferred
    }

    /// Number of live clients visited.
    #[must_use]
    pub const fn visited(&self) -> u32 {
        self.ticked + self.skipped
    }
}

/// Registry of sync clients driven by a single vsync source.
///
/// One coordinator is created per render loop and handed to whatever owns
/// frame pacing; there is no process-global instance.
pub struct DisplaySyncCoordinator {
    config: CoordinatorConfig,
    registry: RefCell<BTreeMap<SyncId, Weak<dyn SyncClient>>>,
    vsync_period: Cell<Option<Duration>>,
    source_rate: Cell<u32>,
    mode: Cell<RefreshRateMode>,
    aggregate: Cell<RateRange>,
}

impl fmt::Debug for DisplaySyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplaySyncCoordinator")
            .field("config", &self.config)
            .field("clients", &self.client_count())
            .field("vsync_period", &self.vsync_period.get())
            .field("source_rate", &self.source_rate.get())
            .field("mode", &self.mode.get())
            .field("aggregate", &self.aggregate.get())
            .finish()
    }
}

impl Default for DisplaySyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySyncCoordinator {
    /// Creates a coordinator with [`CoordinatorConfig::standard`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::standard())
    }

    /// Creates a coordinator with the given configuration.
    #[must_use]
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            registry: RefCell::new(BTreeMap::new()),
            vsync_period: Cell::new(None),
            source_rate: Cell::new(config.initial_rate),
            mode: Cell::new(config.initial_mode),
            aggregate: Cell::new(RateRange::ZERO),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // -- registry ---------------------------------------------------------

    /// Starts delivering frames to `client`.
    ///
    /// Only a weak reference is kept. Returns `false` (and changes nothing)
    /// if a live client with the same id is already registered. An entry
    /// whose owner was dropped is replaced.
    pub fn register<T: SyncClient + 'static>(&self, client: &Rc<T>) -> bool {
        let id = client.id();
        let mut registry = self.registry.borrow_mut();
        if registry
            .get(&id)
            .is_some_and(|entry| entry.strong_count() > 0)
        {
            return false;
        }
        let weak = Rc::downgrade(client);
        let weak: Weak<dyn SyncClient> = weak;
        let replaced = registry.insert(id, weak).is_some();
        tracing::debug!(
            id = id.0,
            replaced,
            clients = registry.len(),
            "sync client registered"
        );
        true
    }

    /// Stops delivering frames to `client`. Returns `false` if it was not
    /// registered.
    pub fn unregister<T: SyncClient + ?Sized>(&self, client: &T) -> bool {
        self.unregister_id(client.id())
    }

    /// Removes the client with the given id. Returns `false` if absent.
    pub fn unregister_id(&self, id: SyncId) -> bool {
        let removed = self.registry.borrow_mut().remove(&id).is_some();
        if removed {
            tracing::debug!(id = id.0, "sync client unregistered");
        }
        removed
    }

    /// Returns `true` if `client` is registered.
    #[must_use]
    pub fn has_client<T: SyncClient + ?Sized>(&self, client: &T) -> bool {
        self.contains(client.id())
    }

    /// Returns `true` if a live client with the given id is registered.
    ///
    /// Entries whose owner has been dropped are reported as absent even
    /// before the next dispatch evicts them.
    #[must_use]
    pub fn contains(&self, id: SyncId) -> bool {
        self.registry
            .borrow()
            .get(&id)
            .is_some_and(|client| client.strong_count() > 0)
    }

    /// Number of registry entries, including expired ones not yet evicted.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Returns `true` if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().is_empty()
    }

    /// Removes the entry for `id` only if it is still `entry`.
    fn remove_entry(&self, id: SyncId, entry: &Weak<dyn SyncClient>) -> bool {
        let mut registry = self.registry.borrow_mut();
        if !registry.get(&id).is_some_and(|live| Weak::ptr_eq(live, entry)) {
            return false;
        }
        registry.remove(&id);
        true
    }

    /// Ids of all registry entries, in dispatch order.
    #[must_use]
    pub fn client_ids(&self) -> Vec<SyncId> {
        self.registry.borrow().keys().copied().collect()
    }

    /// Returns `true` while any client is registered; the host should keep
    /// requesting vsync callbacks.
    #[must_use]
    pub fn wants_frame(&self) -> bool {
        !self.is_empty()
    }

    // -- vsync state ------------------------------------------------------

    /// Sets the display's nominal rate. Returns `false` if unchanged.
    pub fn set_vsync_rate(&self, rate: u32) -> bool {
        let previous = self.source_rate.replace(rate);
        if previous == rate {
            return false;
        }
        tracing::debug!(previous, rate, "vsync rate changed");
        true
    }

    /// Records the hardware vsync period and derives the display rate from it.
    ///
    /// The measured rate `round(1e9 / period)` snaps to the first standard
    /// rate within tolerance, or is used as-is when none is close. Returns
    /// `true` whenever the period changed, even if the rate did not. A zero
    /// period is ignored and returns `false`.
    pub fn set_vsync_period(&self, period: Duration) -> bool {
        let Some(measured) = period.rate() else {
            tracing::warn!("ignoring zero vsync period");
            return false;
        };
        if self.vsync_period.get() == Some(period) {
            return false;
        }
        self.vsync_period.set(Some(period));

        let rate = snap_rate(measured, self.config.standard_rates, self.config.snap_tolerance)
            .unwrap_or(measured);
        tracing::debug!(period = period.0, measured, rate, "vsync period changed");
        self.set_vsync_rate(rate);
        true
    }

    /// Stores the policy selector handed to clients on each dispatch.
    pub fn set_refresh_rate_mode(&self, mode: RefreshRateMode) {
        self.mode.set(mode);
    }

    /// The display's current nominal rate.
    #[must_use]
    pub fn vsync_rate(&self) -> u32 {
        self.source_rate.get()
    }

    /// The last observed hardware period, if any.
    #[must_use]
    pub fn vsync_period(&self) -> Option<Duration> {
        self.vsync_period.get()
    }

    /// The current policy selector.
    #[must_use]
    pub fn refresh_rate_mode(&self) -> RefreshRateMode {
        self.mode.get()
    }

    /// The preferred display rate computed by the last non-empty dispatch
    /// (zero before any).
    #[must_use]
    pub fn display_sync_rate(&self) -> u32 {
        self.aggregate.get().preferred
    }

    /// The merged rate request computed by the last non-empty dispatch.
    #[must_use]
    pub fn display_sync_range(&self) -> RateRange {
        self.aggregate.get()
    }

    // -- dispatch ---------------------------------------------------------

    /// Handles a platform vsync: records `period`, then dispatches.
    pub fn on_vsync(&self, timestamp: HostTime, period: Duration) -> DispatchSummary {
        self.on_vsync_traced(timestamp, period, &mut Tracer::none())
    }

    /// [`on_vsync`](Self::on_vsync) with instrumentation.
    pub fn on_vsync_traced(
        &self,
        timestamp: HostTime,
        period: Duration,
        tracer: &mut Tracer<'_>,
    ) -> DispatchSummary {
        let period_changed = self.set_vsync_period(period);
        tracer.vsync(&VsyncEvent {
            timestamp,
            period,
            source_rate: self.vsync_rate(),
            period_changed,
        });
        self.dispatch_traced(timestamp, tracer)
    }

    /// Ticks every client registered at the start of the call.
    ///
    /// Does nothing, and leaves [`display_sync_rate`](Self::display_sync_rate)
    /// unchanged, when no clients are registered.
    pub fn dispatch(&self, timestamp: HostTime) -> DispatchSummary {
        self.dispatch_traced(timestamp, &mut Tracer::none())
    }

    /// [`dispatch`](Self::dispatch) with instrumentation.
    pub fn dispatch_traced(&self, timestamp: HostTime, tracer: &mut Tracer<'_>) -> DispatchSummary {
        let snapshot: Vec<(SyncId, Weak<dyn SyncClient>)> = {
            let registry = self.registry.borrow();
            if registry.is_empty() {
                return DispatchSummary::empty(timestamp, self.aggregate.get());
            }
            registry
                .iter()
                .map(|(id, client)| (*id, client.clone()))
                .collect()
        };

        let period = self.vsync_period.get().unwrap_or(Duration::ZERO);
        let source_rate = self.source_rate.get();
        let mode = self.mode.get();
        let mut aggregate = RateRange::ZERO;
        let mut summary = DispatchSummary::empty(timestamp, aggregate);

        for (id, entry) in snapshot {
            let Some(client) = entry.upgrade() else {
                // Already replaced by a live client registered under this id.
                if !self.remove_entry(id, &entry) {
                    continue;
                }
                summary.evicted += 1;
                tracing::debug!(id = id.0, "evicted expired sync client");
                tracer.evict(&EvictEvent {
                    id,
                    timestamp,
                    reason: EvictReason::Expired,
                });
                continue;
            };

            let range = client.rate_range();
            let merged = range.is_valid();
            if merged {
                aggregate = aggregate.merge(range);
            }
            #[cfg(feature = "trace-rich")]
            tracer.rate_range(&crate::trace::RateRangeEvent { id, range, merged });

            client.check_rate(source_rate, mode);
            client.update(timestamp, period);
            let skipped = client.judge_skip();
            let control = client.on_frame();

            if skipped {
                summary.skipped += 1;
            } else {
                summary.ticked += 1;
            }
            tracer.client_frame(&ClientFrameEvent {
                id,
                timestamp,
                skipped,
                control,
            });

            if control == FrameControl::Stop && self.remove_entry(id, &entry) {
                tracing::debug!(id = id.0, "sync client stopped");
                summary.stopped += 1;
                tracer.evict(&EvictEvent {
                    id,
                    timestamp,
                    reason: EvictReason::Stopped,
                });
            }
        }

        self.aggregate.set(aggregate);
        summary.aggregate = aggregate;
        tracing::trace!(
            timestamp = timestamp.0,
            ticked = summary.ticked,
            skipped = summary.skipped,
            evicted = summary.evicted,
            preferred_rate = aggregate.preferred,
            "dispatched vsync"
        );
        tracer.dispatch(&summary);
        summary
    }
}
