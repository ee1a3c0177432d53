#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Embassy clock adapter for the trip state machines.

use core::ops::Add;
use core::time::Duration;

use embassy_time::{Duration as EmbassyDuration, Instant};
use trip_core::time::TripInstant;

/// Monotonic beacon timestamp backed by the Embassy time driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BeaconInstant(Instant);

impl BeaconInstant {
    /// Reads the time driver.
    #[cfg(target_os = "none")]
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(Instant::from_micros(micros))
    }

    #[must_use]
    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.0.as_millis()
    }
}

impl From<Instant> for BeaconInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<Duration> for BeaconInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(
            self.0
                .checked_add(EmbassyDuration::from_micros(micros))
                .unwrap_or(Instant::MAX),
        )
    }
}

impl TripInstant for BeaconInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let elapsed = self
            .0
            .checked_duration_since(earlier.0)
            .unwrap_or(EmbassyDuration::from_ticks(0));
        Duration::from_micros(elapsed.as_micros())
    }
}
