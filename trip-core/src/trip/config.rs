//! Construction-time trip configuration.

use core::fmt;
use core::time::Duration;

use crate::phases::{PhasePlan, STANDARD_PLAN};

/// Speed reported before the first simulated sample.
pub const INITIAL_SPEED_KMH: u16 = 35;
/// Period between progress ticks.
pub const PROGRESS_PERIOD: Duration = Duration::from_millis(500);
/// Percentage points added per progress tick.
pub const PROGRESS_STEP: u8 = 2;
/// Period between simulated speed samples.
pub const SPEED_PERIOD: Duration = Duration::from_millis(3_000);
/// Slowest simulated speed.
pub const SPEED_MIN_KMH: u16 = 30;
/// Fastest simulated speed.
pub const SPEED_MAX_KMH: u16 = 59;
/// Samples strictly above this value raise the overspeed alert.
pub const SPEED_ALERT_THRESHOLD_KMH: u16 = 55;
/// How long the overspeed alert stays raised.
pub const SPEED_ALERT_PULSE: Duration = Duration::from_millis(2_000);
/// Delay after entering the ride phase before the simulated deviation.
pub const DEVIATION_DELAY: Duration = Duration::from_millis(10_000);
/// Distance off route reported by the simulated deviation.
pub const DEVIATION_DISTANCE_M: u32 = 250;

/// Reasons a [`TripConfig`] cannot drive a trip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// A zero progress period would re-fire the progress timer forever.
    ZeroProgressPeriod,
    /// Progress would never reach completion.
    ZeroProgressStep,
    /// A zero speed period would re-fire the speed timer forever.
    ZeroSpeedPeriod,
    SpeedRangeInverted { min_kmh: u16, max_kmh: u16 },
    /// A deviation must report a distance off route.
    ZeroDeviationDistance,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroProgressPeriod => f.write_str("progress period is zero"),
            ConfigError::ZeroProgressStep => f.write_str("progress step is zero"),
            ConfigError::ZeroSpeedPeriod => f.write_str("speed period is zero"),
            ConfigError::SpeedRangeInverted { min_kmh, max_kmh } => {
                write!(f, "speed range {min_kmh}..{max_kmh}kmh is inverted")
            }
            ConfigError::ZeroDeviationDistance => f.write_str("deviation distance is zero"),
        }
    }
}

/// Timing and threshold parameters for a [`TripController`](super::TripController).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TripConfig {
    pub plan: PhasePlan,
    pub initial_speed_kmh: u16,
    pub progress_period: Duration,
    pub progress_step: u8,
    pub speed_period: Duration,
    pub speed_min_kmh: u16,
    pub speed_max_kmh: u16,
    pub speed_alert_threshold_kmh: u16,
    pub speed_alert_pulse: Duration,
    pub deviation_delay: Duration,
    pub deviation_distance_m: u32,
}

impl TripConfig {
    /// Standard passenger trip timings.
    pub const STANDARD: TripConfig = TripConfig {
        plan: STANDARD_PLAN,
        initial_speed_kmh: INITIAL_SPEED_KMH,
        progress_period: PROGRESS_PERIOD,
        progress_step: PROGRESS_STEP,
        speed_period: SPEED_PERIOD,
        speed_min_kmh: SPEED_MIN_KMH,
        speed_max_kmh: SPEED_MAX_KMH,
        speed_alert_threshold_kmh: SPEED_ALERT_THRESHOLD_KMH,
        speed_alert_pulse: SPEED_ALERT_PULSE,
        deviation_delay: DEVIATION_DELAY,
        deviation_distance_m: DEVIATION_DISTANCE_M,
    };

    /// Replaces the phase plan.
    #[must_use]
    pub const fn with_plan(mut self, plan: PhasePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Replaces the deviation delay.
    #[must_use]
    pub const fn with_deviation_delay(mut self, delay: Duration) -> Self {
        self.deviation_delay = delay;
        self
    }

    /// Checks the parameters the timers and simulators rely on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_period.is_zero() {
            return Err(ConfigError::ZeroProgressPeriod);
        }
        if self.progress_step == 0 {
            return Err(ConfigError::ZeroProgressStep);
        }
        if self.speed_period.is_zero() {
            return Err(ConfigError::ZeroSpeedPeriod);
        }
        if self.speed_min_kmh > self.speed_max_kmh {
            return Err(ConfigError::SpeedRangeInverted {
                min_kmh: self.speed_min_kmh,
                max_kmh: self.speed_max_kmh,
            });
        }
        if self.deviation_distance_m == 0 {
            return Err(ConfigError::ZeroDeviationDistance);
        }
        Ok(())
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}
