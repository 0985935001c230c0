// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Refresh-rate policy selector.

/// Policy hint forwarded to every sync client on each dispatch.
///
/// The coordinator stores the mode and hands it to
/// [`SyncClient::check_rate`](crate::client::SyncClient::check_rate); it never
/// triggers a recomputation by itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RefreshRateMode {
    /// Adaptive: clients may pick their own rate.
    Auto,
    /// No policy set.
    #[default]
    Null,
    /// Power-saving.
    Low,
    /// Balanced.
    Medium,
    /// Performance.
    High,
}

impl RefreshRateMode {
    /// Converts a platform mode value. Unknown values map to
    /// [`RefreshRateMode::Null`].
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            -1 => Self::Auto,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Null,
        }
    }

    /// Returns the platform mode value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Auto => -1,
            Self::Null => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Returns `true` when adaptive rate selection is enabled.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_round_trip() {
        for mode in [
            RefreshRateMode::Auto,
            RefreshRateMode::Null,
            RefreshRateMode::Low,
            RefreshRateMode::Medium,
            RefreshRateMode::High,
        ] {
            assert_eq!(RefreshRateMode::from_raw(mode.as_raw()), mode);
        }
    }

    #[test]
    fn unknown_raw_defaults_to_null() {
        assert_eq!(RefreshRateMode::from_raw(42), RefreshRateMode::Null);
        assert_eq!(RefreshRateMode::from_raw(-7), RefreshRateMode::Null);
        assert!(RefreshRateMode::from_raw(-1).is_auto());
    }
}
