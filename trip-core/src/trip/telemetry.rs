//! Progress and speed simulation while the ride is in progress.

use crate::random::RandomSource;
use crate::scope::{CancelScope, Deadline, Interval, ScopeToken};
use crate::time::TripInstant;

use super::config::TripConfig;
use super::state::TripState;

/// Result of a progress tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProgressTick {
    Advanced(u8),
    /// Progress just reached 100; the progress timer has been stopped.
    Completed,
}

/// Result of a speed sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpeedSample {
    Normal(u16),
    /// The sample exceeded the threshold and (re)started the alert pulse.
    Overspeed(u16),
}

/// Periodic progress and speed timers plus the overspeed pulse.
#[derive(Copy, Clone, Debug)]
pub struct TelemetrySimulator<I> {
    progress: Interval<I>,
    speed: Interval<I>,
    pulse: Deadline<I>,
}

impl<I: TripInstant> TelemetrySimulator<I> {
    #[must_use]
    pub const fn new(config: &TripConfig) -> Self {
        Self {
            progress: Interval::new(config.progress_period),
            speed: Interval::new(config.speed_period),
            pulse: Deadline::new(),
        }
    }

    /// Starts both periodic timers from `now`.
    pub fn arm(&mut self, now: I, token: ScopeToken) {
        self.progress.start(now, token);
        self.speed.start(now, token);
        self.pulse.disarm();
    }

    /// Stops every timer owned by the simulator.
    pub fn stop(&mut self) {
        self.progress.stop();
        self.speed.stop();
        self.pulse.disarm();
    }

    #[must_use]
    pub fn progress_due(&self, scope: &CancelScope) -> Option<I> {
        self.progress.pending(scope)
    }

    #[must_use]
    pub fn speed_due(&self, scope: &CancelScope) -> Option<I> {
        self.speed.pending(scope)
    }

    #[must_use]
    pub fn pulse_due(&self, scope: &CancelScope) -> Option<I> {
        self.pulse.pending(scope)
    }

    /// Applies a due progress tick.
    pub fn fire_progress(
        &mut self,
        now: I,
        scope: &CancelScope,
        state: &mut TripState,
        config: &TripConfig,
    ) -> Option<ProgressTick> {
        self.progress.fire(now, scope)?;

        state.progress_percent = state
            .progress_percent
            .saturating_add(config.progress_step)
            .min(100);

        if state.progress_percent >= 100 {
            self.progress.stop();
            Some(ProgressTick::Completed)
        } else {
            Some(ProgressTick::Advanced(state.progress_percent))
        }
    }

    /// Applies a due speed sample, drawing from `rng`.
    pub fn fire_speed<R: RandomSource>(
        &mut self,
        now: I,
        scope: &CancelScope,
        state: &mut TripState,
        config: &TripConfig,
        rng: &mut R,
    ) -> Option<SpeedSample> {
        let at = self.speed.fire(now, scope)?;

        let drawn = rng.next_in_range(
            u32::from(config.speed_min_kmh)..=u32::from(config.speed_max_kmh),
        );
        let speed = u16::try_from(drawn).unwrap_or(config.speed_max_kmh);
        state.current_speed_kmh = speed;

        if speed <= config.speed_alert_threshold_kmh {
            return Some(SpeedSample::Normal(speed));
        }

        state.speed_alert_active = true;
        if let Some(token) = scope.token() {
            self.pulse.arm(at + config.speed_alert_pulse, token);
        }
        Some(SpeedSample::Overspeed(speed))
    }

    /// Clears the overspeed alert when its pulse has elapsed.
    pub fn fire_pulse(&mut self, now: I, scope: &CancelScope, state: &mut TripState) -> bool {
        if self.pulse.fire(now, scope).is_none() {
            return false;
        }

        state.speed_alert_active = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use core::ops::RangeInclusive;
    use core::time::Duration;

    use super::*;
    use crate::time::mock::MockInstant;

    struct Fixed(u32);

    impl RandomSource for Fixed {
        fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
            self.0.clamp(*range.start(), *range.end())
        }
    }

    fn armed() -> (TelemetrySimulator<MockInstant>, CancelScope, TripState) {
        let config = TripConfig::STANDARD;
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("token");
        let mut simulator = TelemetrySimulator::new(&config);
        simulator.arm(MockInstant::millis(0), token);
        (simulator, scope, TripState::new(config.initial_speed_kmh))
    }

    #[test]
    fn progress_below_one_hundred_keeps_ticking() {
        let config = TripConfig::STANDARD;
        let (mut simulator, scope, mut state) = armed();
        state.progress_percent = 97;

        let now = MockInstant::millis(500);
        assert_eq!(
            simulator.fire_progress(now, &scope, &mut state, &config),
            Some(ProgressTick::Advanced(99))
        );
        assert_eq!(simulator.progress_due(&scope), Some(MockInstant::millis(1_000)));
    }

    #[test]
    fn progress_clamps_and_stops_at_one_hundred() {
        let config = TripConfig::STANDARD;
        let (mut simulator, scope, mut state) = armed();
        state.progress_percent = 99;

        let now = MockInstant::millis(10_000);
        assert_eq!(
            simulator.fire_progress(now, &scope, &mut state, &config),
            Some(ProgressTick::Completed)
        );
        assert_eq!(state.progress_percent, 100);
        assert_eq!(simulator.progress_due(&scope), None);
        assert_eq!(simulator.fire_progress(now, &scope, &mut state, &config), None);
    }

    #[test]
    fn overspeed_sample_arms_the_pulse() {
        let config = TripConfig::STANDARD;
        let (mut simulator, scope, mut state) = armed();

        let sample = simulator.fire_speed(
            MockInstant::millis(3_000),
            &scope,
            &mut state,
            &config,
            &mut Fixed(58),
        );
        assert_eq!(sample, Some(SpeedSample::Overspeed(58)));
        assert!(state.speed_alert_active);
        assert_eq!(
            simulator.pulse_due(&scope),
            Some(MockInstant::millis(3_000) + Duration::from_millis(2_000))
        );

        assert!(!simulator.fire_pulse(MockInstant::millis(4_999), &scope, &mut state));
        assert!(simulator.fire_pulse(MockInstant::millis(5_000), &scope, &mut state));
        assert!(!state.speed_alert_active);
    }

    #[test]
    fn threshold_itself_is_not_overspeed() {
        let config = TripConfig::STANDARD;
        let (mut simulator, scope, mut state) = armed();

        let sample = simulator.fire_speed(
            MockInstant::millis(3_000),
            &scope,
            &mut state,
            &config,
            &mut Fixed(55),
        );
        assert_eq!(sample, Some(SpeedSample::Normal(55)));
        assert!(!state.speed_alert_active);
        assert_eq!(simulator.pulse_due(&scope), None);
    }
}
