//! Monotonic instant abstraction shared by every deadline-driven component.

use core::ops::Add;
use core::time::Duration;

/// Monotonic timestamp used to schedule and compare deadlines.
///
/// Firmware wraps the Embassy instant, the emulator and tests use plain
/// microsecond counters.
pub trait TripInstant: Copy + Ord + Add<Duration, Output = Self> {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct MockInstant(pub u64);

    impl MockInstant {
        pub fn millis(value: u64) -> Self {
            Self(value * 1_000)
        }
    }

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX))
        }
    }

    impl TripInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }
}
