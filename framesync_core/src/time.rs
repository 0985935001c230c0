// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync timestamps and periods.
//!
//! [`HostTime`] is a point on the platform's monotonic clock, expressed in
//! nanoseconds, as delivered by the vsync source. [`Duration`] is a span in
//! the same unit and is used for vsync periods and target-timestamp offsets.
//!
//! Rate conversions ([`Duration::from_rate`], [`Duration::rate`]) round to the
//! nearest integer and never divide by zero.

use core::fmt;
use core::ops::{Add, Sub};

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A point in time on the monotonic clock, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Saturating addition of a duration.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

/// Saturates at `u64::MAX` nanoseconds.
impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        self.saturating_add(rhs)
    }
}

/// Saturates at zero when `rhs` is later than `self`.
impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns `true` for a zero-length duration.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The period of a display refreshing at `hz`, rounded to the nearest
    /// nanosecond. A zero rate yields [`Duration::ZERO`].
    #[inline]
    #[must_use]
    pub const fn from_rate(hz: u32) -> Self {
        if hz == 0 {
            return Self::ZERO;
        }
        let hz = hz as u64;
        Self((NANOS_PER_SECOND + hz / 2) / hz)
    }

    /// The refresh rate implied by this period, rounded to the nearest
    /// integer (`round(1e9 / period)`).
    ///
    /// Returns `None` for a zero period.
    #[inline]
    #[must_use]
    pub const fn rate(self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let rate = (NANOS_PER_SECOND + self.0 / 2) / self.0;
        if rate > u32::MAX as u64 {
            return Some(u32::MAX);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "bounds-checked against u32::MAX above"
        )]
        let rate = rate as u32;
        Some(rate)
    }

    /// Multiplies the duration by a frame count, saturating on overflow.
    #[inline]
    #[must_use]
    pub const fn saturating_mul(self, frames: u32) -> Self {
        Self(self.0.saturating_mul(frames as u64))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// Saturates at `u64::MAX` nanoseconds.
impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_rounds_to_nearest() {
        assert_eq!(Duration(16_666_667).rate(), Some(60));
        assert_eq!(Duration(16_722_408).rate(), Some(60), "59.8 Hz");
        assert_eq!(Duration(8_264_463).rate(), Some(121));
        assert_eq!(Duration(20_000_000).rate(), Some(50));
        assert_eq!(Duration(6_944_444).rate(), Some(144));
    }

    #[test]
    fn zero_period_has_no_rate() {
        assert_eq!(Duration::ZERO.rate(), None);
        assert!(Duration::ZERO.is_zero());
    }

    #[test]
    fn tiny_period_saturates_rate() {
        assert_eq!(Duration(1).rate(), Some(1_000_000_000));
    }

    #[test]
    fn from_rate_matches_nominal_periods() {
        assert_eq!(Duration::from_rate(60), Duration(16_666_667));
        assert_eq!(Duration::from_rate(120), Duration(8_333_333));
        assert_eq!(Duration::from_rate(0), Duration::ZERO);
    }

    #[test]
    fn saturating_mul_does_not_overflow() {
        assert_eq!(Duration(10).saturating_mul(3), Duration(30));
        assert_eq!(Duration(u64::MAX).saturating_mul(2), Duration(u64::MAX));
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration(200);
        assert_eq!((t + d).nanos(), 1200);
        assert_eq!(t.saturating_duration_since(HostTime(1500)), Duration::ZERO);
        assert_eq!(t.saturating_duration_since(HostTime(400)), Duration(600));
        assert_eq!(HostTime(u64::MAX).saturating_add(d), HostTime(u64::MAX));
        assert_eq!(HostTime(u64::MAX).checked_add(d), None);
    }

    #[test]
    fn operators_saturate() {
        assert_eq!(HostTime(u64::MAX - 1) + Duration(5), HostTime(u64::MAX));
        assert_eq!(HostTime(10) - HostTime(25), Duration::ZERO);
        assert_eq!(HostTime(25) - HostTime(10), Duration(15));
        assert_eq!(Duration(u64::MAX) + Duration(1), Duration(u64::MAX));
    }
}
