// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Refresh-rate ranges, standard-rate snapping, and rate division.
//!
//! Every sync client expresses the refresh rate it would like as a
//! [`RateRange`]. Once per vsync the coordinator folds all client ranges
//! together with [`RateRange::merge`] and reports the winning `preferred`
//! rate to the display pipeline.
//!
//! # Merge policy
//!
//! The range with the greater `(preferred, max, min)` key wins wholesale.
//! Because this is a maximum over a total order, merging is commutative and
//! associative and [`RateRange::ZERO`] is its identity. The merged
//! `preferred` is always one of the inputs' `preferred` rates, so it stays
//! inside the union of the requested ranges.
//!
//! # Snapping
//!
//! Hardware periods rarely convert to an exact integer rate. [`snap_rate`]
//! maps a raw rate onto the first entry of an ascending allow-list that lies
//! within a tolerance, so that 59.8 Hz is treated as 60 Hz. The scan returns
//! on the first match: when two standard rates are both within tolerance the
//! lower one wins.

use core::fmt;

/// The highest refresh rate a [`RateRange`] may request.
pub const MAX_REFRESH_RATE: u32 = 144;

/// Standard display refresh rates, ascending.
pub const STANDARD_RATES: &[u32] = &[30, 60, 72, 90, 120, 144];

/// Default distance, in Hz, within which a raw rate snaps to a standard rate.
pub const SNAP_TOLERANCE: u32 = 2;

/// A `{min, max, preferred}` refresh-rate request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RateRange {
    /// Lowest acceptable rate.
    pub min: u32,
    /// Highest acceptable rate.
    pub max: u32,
    /// Rate the client would like to run at. Zero means "no preference".
    pub preferred: u32,
}

impl RateRange {
    /// The empty request; identity element of [`merge`](Self::merge).
    pub const ZERO: Self = Self {
        min: 0,
        max: 0,
        preferred: 0,
    };

    /// Creates a range without validating it.
    #[inline]
    #[must_use]
    pub const fn new(min: u32, max: u32, preferred: u32) -> Self {
        Self {
            min,
            max,
            preferred,
        }
    }

    /// A fixed-rate request (`min == max == preferred`).
    #[inline]
    #[must_use]
    pub const fn fixed(rate: u32) -> Self {
        Self::new(rate, rate, rate)
    }

    /// Returns `true` if no rate is preferred.
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.preferred == 0
    }

    /// Returns `true` for a non-zero, ordered range within
    /// [`MAX_REFRESH_RATE`].
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.is_zero()
            && self.min <= self.preferred
            && self.preferred <= self.max
            && self.max <= MAX_REFRESH_RATE
    }

    /// Returns `true` for a valid range that allows more than one rate.
    #[inline]
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.is_valid() && self.min != self.max
    }

    /// Clamps an out-of-domain request into a valid shape.
    ///
    /// `max` is capped at [`MAX_REFRESH_RATE`], `min` at `max`, and
    /// `preferred` is clamped into `[min, max]`. A zero `preferred` stays
    /// zero, so an empty request remains empty.
    #[must_use]
    pub fn normalized(self) -> Self {
        let max = self.max.min(MAX_REFRESH_RATE);
        let min = self.min.min(max);
        let preferred = if self.preferred == 0 {
            0
        } else {
            self.preferred.clamp(min, max)
        };
        Self {
            min,
            max,
            preferred,
        }
    }

    /// Combines two requests; see the [module docs](self) for the policy.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if other.key() > self.key() {
            other
        } else {
            self
        }
    }

    /// Returns `true` if `rate` lies within `[min, max]`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, rate: u32) -> bool {
        self.min <= rate && rate <= self.max
    }

    const fn key(&self) -> (u32, u32, u32) {
        (self.preferred, self.max, self.min)
    }
}

impl fmt::Debug for RateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RateRange({}..={} @{})",
            self.min, self.max, self.preferred
        )
    }
}

/// Returns the first rate in `standard_rates` within `tolerance` of `raw`.
///
/// `standard_rates` is scanned in order, so for an ascending list the lowest
/// qualifying rate wins. Returns `None` when nothing is close enough.
#[must_use]
pub fn snap_rate(raw: u32, standard_rates: &[u32], tolerance: u32) -> Option<u32> {
    standard_rates
        .iter()
        .copied()
        .find(|&rate| raw.abs_diff(rate) <= tolerance)
}

/// Computes how many vsyncs a client preferring `preferred` Hz should span on
/// a `source_rate` Hz display.
///
/// Returns `None` when either rate is zero, or when the integer ratio does not
/// evenly divide the source rate; callers then keep their previous divisor.
/// A preferred rate at or above the source rate runs on every vsync.
#[must_use]
pub fn divisor_for(preferred: u32, source_rate: u32) -> Option<u32> {
    if preferred == 0 || source_rate == 0 {
        return None;
    }
    let n = (source_rate / preferred).max(1);
    (source_rate % n == 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_range_is_invalid() {
        assert!(RateRange::ZERO.is_zero());
        assert!(!RateRange::ZERO.is_valid());
    }

    #[test]
    fn validity_checks_ordering_and_ceiling() {
        assert!(RateRange::new(30, 60, 60).is_valid());
        assert!(!RateRange::new(60, 30, 45).is_valid(), "inverted bounds");
        assert!(!RateRange::new(30, 60, 90).is_valid(), "preferred above max");
        assert!(!RateRange::new(30, 240, 120).is_valid(), "max above ceiling");
        assert!(RateRange::new(30, 60, 60).is_dynamic());
        assert!(!RateRange::fixed(60).is_dynamic());
    }

    #[test]
    fn normalized_clamps_out_of_domain_values() {
        assert_eq!(
            RateRange::new(30, 240, 200).normalized(),
            RateRange::new(30, 144, 144)
        );
        assert_eq!(
            RateRange::new(90, 60, 120).normalized(),
            RateRange::new(60, 60, 60)
        );
        assert_eq!(
            RateRange::new(60, 120, 10).normalized(),
            RateRange::new(60, 120, 60)
        );
        assert_eq!(RateRange::new(30, 60, 0).normalized().preferred, 0);
        assert!(RateRange::new(0, 500, 300).normalized().is_valid());
    }

    #[test]
    fn merge_keeps_higher_preferred() {
        let c1 = RateRange::new(30, 60, 60);
        let c2 = RateRange::new(60, 120, 90);
        assert_eq!(c1.merge(c2), c2);
        assert_eq!(c2.merge(c1), c2);
    }

    #[test]
    fn merge_tie_breaks_on_bounds() {
        let a = RateRange::new(30, 120, 60);
        let b = RateRange::new(60, 60, 60);
        assert_eq!(a.merge(b), a, "larger max wins");
        assert_eq!(b.merge(a), a);

        let c = RateRange::new(48, 120, 60);
        assert_eq!(a.merge(c), c, "then larger min");
        assert_eq!(c.merge(a), c);
    }

    #[test]
    fn zero_is_merge_identity() {
        let r = RateRange::new(30, 90, 72);
        assert_eq!(RateRange::ZERO.merge(r), r);
        assert_eq!(r.merge(RateRange::ZERO), r);
    }

    #[test]
    fn snapping_uses_tolerance() {
        assert_eq!(snap_rate(60, STANDARD_RATES, SNAP_TOLERANCE), Some(60));
        assert_eq!(snap_rate(59, STANDARD_RATES, SNAP_TOLERANCE), Some(60));
        assert_eq!(snap_rate(121, STANDARD_RATES, SNAP_TOLERANCE), Some(120));
        assert_eq!(snap_rate(146, STANDARD_RATES, SNAP_TOLERANCE), Some(144));
        assert_eq!(snap_rate(50, STANDARD_RATES, SNAP_TOLERANCE), None);
        assert_eq!(snap_rate(117, STANDARD_RATES, SNAP_TOLERANCE), None);
    }

    #[test]
    fn snapping_first_match_wins() {
        // Both 60 and 62 are within tolerance of 61; the scan stops at 60.
        assert_eq!(snap_rate(61, &[60, 62], 1), Some(60));
        assert_eq!(snap_rate(61, &[62, 60], 1), Some(62));
    }

    #[test]
    fn divisor_splits_source_rate() {
        assert_eq!(divisor_for(30, 60), Some(2));
        assert_eq!(divisor_for(60, 60), Some(1));
        assert_eq!(divisor_for(30, 120), Some(4));
        assert_eq!(divisor_for(40, 120), Some(3));
        assert_eq!(divisor_for(90, 60), Some(1), "faster than source");
        assert_eq!(divisor_for(7, 60), None, "60 / 8 is not integral");
        assert_eq!(divisor_for(0, 60), None);
        assert_eq!(divisor_for(30, 0), None);
    }
}
