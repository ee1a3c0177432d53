//! Trip lifecycle controller.
//!
//! The controller walks a [`PhasePlan`], runs the telemetry simulator and the
//! deviation monitor once the ride is in progress, and reports every
//! observable transition through [`TripEffects`]. It never blocks or sleeps:
//! callers feed it the current instant through [`TripController::drive`] and
//! sleep until [`TripController::next_deadline`] themselves.

use core::fmt;

use crate::events::TripEventKind;
use crate::phases::{PhaseDwell, TripPhase};
use crate::random::RandomSource;
use crate::scope::{CancelScope, Deadline};
use crate::time::TripInstant;

pub mod config;
pub mod deviation;
pub mod state;
pub mod telemetry;

pub use config::{ConfigError, TripConfig};
pub use deviation::{DeviationMonitor, GeoFenceEscalation, NoEscalation, WarningTimeout};
pub use state::{GeoFenceStatus, Lifecycle, TripState};
pub use telemetry::{ProgressTick, SpeedSample, TelemetrySimulator};

/// Errors returned by [`TripController::start`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TripError {
    AlreadyStarted,
    TornDown,
    EmptyPlan,
    InvalidConfig(ConfigError),
}

impl fmt::Display for TripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripError::AlreadyStarted => f.write_str("trip already started"),
            TripError::TornDown => f.write_str("trip has been torn down"),
            TripError::EmptyPlan => f.write_str("phase plan has no steps"),
            TripError::InvalidConfig(error) => write!(f, "invalid trip config: {error}"),
        }
    }
}

/// Timers owned by the controller, in tie-break priority order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TripTimer {
    PhaseDwell,
    Progress,
    Speed,
    SpeedPulse,
    Deviation,
    EscalationReview,
}

/// Side effects the controller asks its owner to carry out.
pub trait TripEffects<I> {
    /// Records an observable transition.
    fn record(&mut self, event: TripEventKind, at: I);

    /// Sounds the deviation chime.
    fn deviation_alert(&mut self, at: I);

    /// Notified after the trip enters `phase`.
    fn phase_entered(&mut self, _phase: TripPhase, _at: I) {}
}

/// Phase sequencer plus the simulators it arms.
pub struct TripController<I, R, E = NoEscalation> {
    config: TripConfig,
    rng: R,
    escalation: E,
    scope: CancelScope,
    lifecycle: Lifecycle,
    state: Option<TripState>,
    step_index: usize,
    phase_deadline: Deadline<I>,
    telemetry: TelemetrySimulator<I>,
    deviation: DeviationMonitor<I>,
    completed: bool,
}

impl<I, R> TripController<I, R, NoEscalation>
where
    I: TripInstant,
    R: RandomSource,
{
    /// Creates an idle controller that never escalates past `Warning`.
    #[must_use]
    pub fn new(config: TripConfig, rng: R) -> Self {
        Self::with_escalation(config, rng, NoEscalation)
    }
}

impl<I, R, E> TripController<I, R, E>
where
    I: TripInstant,
    R: RandomSource,
    E: GeoFenceEscalation,
{
    /// Creates an idle controller with a custom escalation policy.
    #[must_use]
    pub fn with_escalation(config: TripConfig, rng: R, escalation: E) -> Self {
        Self {
            config,
            rng,
            escalation,
            scope: CancelScope::new(),
            lifecycle: Lifecycle::Idle,
            state: None,
            step_index: 0,
            phase_deadline: Deadline::new(),
            telemetry: TelemetrySimulator::new(&config),
            deviation: DeviationMonitor::new(),
            completed: false,
        }
    }

    /// Creates the trip state and enters the first phase of the plan.
    ///
    /// # Errors
    ///
    /// A controller runs exactly one trip: a second call returns
    /// [`TripError::AlreadyStarted`], a call after teardown returns
    /// [`TripError::TornDown`].
    pub fn start(&mut self, now: I, effects: &mut impl TripEffects<I>) -> Result<(), TripError> {
        match self.lifecycle {
            Lifecycle::Running => return Err(TripError::AlreadyStarted),
            Lifecycle::TornDown => return Err(TripError::TornDown),
            Lifecycle::Idle => {}
        }
        if self.config.plan.is_empty() {
            return Err(TripError::EmptyPlan);
        }
        self.config.validate().map_err(TripError::InvalidConfig)?;

        self.lifecycle = Lifecycle::Running;
        self.state = Some(TripState::new(self.config.initial_speed_kmh));
        self.completed = false;
        effects.record(TripEventKind::TripStarted, now);
        self.enter_step(0, now, effects);
        Ok(())
    }

    /// Fires every timer due at or before `now`, each at its own instant.
    ///
    /// Returns the number of timers fired.
    pub fn drive(&mut self, now: I, effects: &mut impl TripEffects<I>) -> usize {
        let mut fired = 0;
        while self.step(now, effects).is_some() {
            fired += 1;
        }
        fired
    }

    /// Fires the single earliest due timer, if any.
    pub fn step(&mut self, now: I, effects: &mut impl TripEffects<I>) -> Option<TripTimer> {
        let (at, timer) = self.next_timer().filter(|(at, _)| *at <= now)?;
        self.fire(timer, at, effects);
        Some(timer)
    }

    /// Earliest pending timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.next_timer().map(|(at, _)| at)
    }

    /// Earliest pending timer together with which one it is.
    #[must_use]
    pub fn next_timer(&self) -> Option<(I, TripTimer)> {
        let scope = &self.scope;
        let candidates = [
            (self.phase_deadline.pending(scope), TripTimer::PhaseDwell),
            (self.telemetry.progress_due(scope), TripTimer::Progress),
            (self.telemetry.speed_due(scope), TripTimer::Speed),
            (self.telemetry.pulse_due(scope), TripTimer::SpeedPulse),
            (self.deviation.detection_due(scope), TripTimer::Deviation),
            (self.deviation.review_due(scope), TripTimer::EscalationReview),
        ];

        let mut earliest: Option<(I, TripTimer)> = None;
        for (due, timer) in candidates {
            let Some(at) = due else { continue };
            // Strict comparison keeps the earlier entry on ties.
            if earliest.is_none_or(|(best, _)| at < best) {
                earliest = Some((at, timer));
            }
        }
        earliest
    }

    /// Clears a raised deviation. Returns `true` when an alert was cleared.
    pub fn acknowledge_deviation(&mut self, now: I, effects: &mut impl TripEffects<I>) -> bool {
        if self.lifecycle != Lifecycle::Running {
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };

        let cleared = self.deviation.acknowledge(state);
        if cleared {
            effects.record(TripEventKind::DeviationAcknowledged, now);
        }
        cleared
    }

    /// Cancels every timer permanently and discards the trip state.
    ///
    /// Returns `false` when the controller was already torn down.
    pub fn teardown(&mut self, now: I, effects: &mut impl TripEffects<I>) -> bool {
        if self.lifecycle == Lifecycle::TornDown {
            return false;
        }

        self.scope.close();
        self.phase_deadline.disarm();
        self.telemetry.stop();
        self.deviation.stop();
        self.state = None;
        self.lifecycle = Lifecycle::TornDown;
        effects.record(TripEventKind::TornDown, now);
        true
    }

    /// Copy of the current trip state; `None` before start and after teardown.
    #[must_use]
    pub fn snapshot(&self) -> Option<TripState> {
        self.state
    }

    #[must_use]
    pub fn phase(&self) -> Option<TripPhase> {
        self.state.map(|state| state.phase)
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns `true` once progress has reached 100.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub const fn config(&self) -> &TripConfig {
        &self.config
    }

    fn enter_step(&mut self, index: usize, at: I, effects: &mut impl TripEffects<I>) {
        let Some(step) = self.config.plan.step(index).copied() else {
            return;
        };
        let Some(token) = self.scope.renew() else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };

        self.step_index = index;
        state.phase = step.phase;
        self.telemetry.stop();
        self.deviation.stop();

        if step.phase == TripPhase::Waiting {
            state.clear_alerts();
        }

        match step.dwell {
            PhaseDwell::Fixed(dwell) => self.phase_deadline.arm(at + dwell, token),
            PhaseDwell::OpenEnded => self.phase_deadline.disarm(),
        }

        if step.phase == TripPhase::InProgress {
            self.telemetry.arm(at, token);
            self.deviation.arm(at, token, &self.config);
        }

        effects.record(TripEventKind::PhaseEntered(step.phase), at);
        effects.phase_entered(step.phase, at);
    }

    fn fire(&mut self, timer: TripTimer, at: I, effects: &mut impl TripEffects<I>) {
        let scope = &self.scope;
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match timer {
            TripTimer::PhaseDwell => {
                if self.phase_deadline.fire(at, scope).is_some() {
                    self.enter_step(self.step_index + 1, at, effects);
                }
            }
            TripTimer::Progress => {
                let tick = self.telemetry.fire_progress(at, scope, state, &self.config);
                if tick == Some(ProgressTick::Completed) && !self.completed {
                    self.completed = true;
                    effects.record(TripEventKind::TripCompleted, at);
                }
            }
            TripTimer::Speed => {
                let sample =
                    self.telemetry
                        .fire_speed(at, scope, state, &self.config, &mut self.rng);
                if let Some(SpeedSample::Overspeed(speed_kmh)) = sample {
                    effects.record(TripEventKind::SpeedAlertRaised { speed_kmh }, at);
                }
            }
            TripTimer::SpeedPulse => {
                if self.telemetry.fire_pulse(at, scope, state) {
                    effects.record(TripEventKind::SpeedAlertCleared, at);
                }
            }
            TripTimer::Deviation => {
                let raised = self.deviation.fire_detection(
                    at,
                    scope,
                    state,
                    &self.config,
                    &self.escalation,
                );
                if let Some(distance_m) = raised {
                    effects.record(TripEventKind::DeviationDetected { distance_m }, at);
                    effects.deviation_alert(at);
                }
            }
            TripTimer::EscalationReview => {
                if let Some(status) =
                    self.deviation
                        .fire_review(at, scope, state, &mut self.escalation)
                {
                    effects.record(TripEventKind::GeoFenceEscalated(status), at);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::ops::RangeInclusive;
    use core::time::Duration;

    use heapless::Vec;

    use super::*;
    use crate::time::mock::MockInstant;

    struct Fixed(u32);

    impl RandomSource for Fixed {
        fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
            self.0.clamp(*range.start(), *range.end())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<TripEventKind, 128>,
        chimes: u32,
        phases: Vec<TripPhase, 4>,
    }

    impl TripEffects<MockInstant> for Recorder {
        fn record(&mut self, event: TripEventKind, _at: MockInstant) {
            let _ = self.events.push(event);
        }

        fn deviation_alert(&mut self, _at: MockInstant) {
            self.chimes += 1;
        }

        fn phase_entered(&mut self, phase: TripPhase, _at: MockInstant) {
            let _ = self.phases.push(phase);
        }
    }

    fn controller() -> TripController<MockInstant, Fixed> {
        TripController::new(TripConfig::STANDARD, Fixed(40))
    }

    #[test]
    fn start_enters_waiting_and_arms_the_dwell() {
        let mut trip = controller();
        let mut effects = Recorder::default();
        assert_eq!(trip.snapshot(), None);

        trip.start(MockInstant::millis(0), &mut effects).expect("start");
        let state = trip.snapshot().expect("state");
        assert_eq!(state.phase, TripPhase::Waiting);
        assert_eq!(state.current_speed_kmh, 35);
        assert_eq!(
            trip.next_timer(),
            Some((MockInstant::millis(3_000), TripTimer::PhaseDwell))
        );
        assert_eq!(effects.phases.as_slice(), &[TripPhase::Waiting]);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut trip = controller();
        let mut effects = Recorder::default();
        trip.start(MockInstant::millis(0), &mut effects).expect("start");
        assert_eq!(
            trip.start(MockInstant::millis(1), &mut effects),
            Err(TripError::AlreadyStarted)
        );

        trip.teardown(MockInstant::millis(2), &mut effects);
        assert_eq!(
            trip.start(MockInstant::millis(3), &mut effects),
            Err(TripError::TornDown)
        );
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let config = TripConfig {
            speed_period: Duration::ZERO,
            ..TripConfig::STANDARD
        };
        let mut trip: TripController<MockInstant, Fixed> = TripController::new(config, Fixed(40));
        let mut effects = Recorder::default();

        assert_eq!(
            trip.start(MockInstant::millis(0), &mut effects),
            Err(TripError::InvalidConfig(ConfigError::ZeroSpeedPeriod))
        );
        assert_eq!(trip.lifecycle(), Lifecycle::Idle);
        assert_eq!(trip.next_deadline(), None);
        assert!(effects.events.is_empty());
    }

    #[test]
    fn ties_fire_in_priority_order() {
        let mut trip = controller();
        let mut effects = Recorder::default();
        trip.start(MockInstant::millis(0), &mut effects).expect("start");
        trip.drive(MockInstant::millis(6_000), &mut effects);

        // Progress and speed both land at 9 s after entering the ride at 6 s.
        let mut order: Vec<TripTimer, 8> = Vec::new();
        trip.drive(MockInstant::millis(8_999), &mut effects);
        while let Some(timer) = trip.step(MockInstant::millis(9_000), &mut effects) {
            let _ = order.push(timer);
        }
        assert_eq!(order.as_slice(), &[TripTimer::Progress, TripTimer::Speed]);
    }

    #[test]
    fn deviation_chime_plays_once() {
        let mut trip = controller();
        let mut effects = Recorder::default();
        trip.start(MockInstant::millis(0), &mut effects).expect("start");
        trip.drive(MockInstant::millis(60_000), &mut effects);

        assert_eq!(effects.chimes, 1);
        assert!(trip.acknowledge_deviation(MockInstant::millis(60_000), &mut effects));
        assert!(!trip.acknowledge_deviation(MockInstant::millis(60_001), &mut effects));
        trip.drive(MockInstant::millis(120_000), &mut effects);
        assert_eq!(effects.chimes, 1);
    }

    #[test]
    fn warning_timeout_escalates_to_danger() {
        let mut trip = TripController::with_escalation(
            TripConfig::STANDARD,
            Fixed(40),
            WarningTimeout::new(Duration::from_secs(5)),
        );
        let mut effects = Recorder::default();
        trip.start(MockInstant::millis(0), &mut effects).expect("start");

        trip.drive(MockInstant::millis(20_999), &mut effects);
        assert_eq!(
            trip.snapshot().map(|state| state.geo_fence_status),
            Some(GeoFenceStatus::Warning)
        );

        trip.drive(MockInstant::millis(21_000), &mut effects);
        let state = trip.snapshot().expect("state");
        assert_eq!(state.geo_fence_status, GeoFenceStatus::Danger);
        assert_eq!(state.deviation_distance_m, 250);
        assert!(
            effects
                .events
                .contains(&TripEventKind::GeoFenceEscalated(GeoFenceStatus::Danger))
        );
    }

    #[test]
    fn acknowledged_warning_is_never_escalated() {
        let mut trip = TripController::with_escalation(
            TripConfig::STANDARD,
            Fixed(40),
            WarningTimeout::new(Duration::from_secs(5)),
        );
        let mut effects = Recorder::default();
        trip.start(MockInstant::millis(0), &mut effects).expect("start");
        trip.drive(MockInstant::millis(16_000), &mut effects);
        trip.acknowledge_deviation(MockInstant::millis(17_000), &mut effects);

        trip.drive(MockInstant::millis(40_000), &mut effects);
        assert_eq!(
            trip.snapshot().map(|state| state.geo_fence_status),
            Some(GeoFenceStatus::Safe)
        );
    }
}
