//! One-shot geo-fence deviation monitor and its escalation policies.

use core::time::Duration;

use crate::scope::{CancelScope, Deadline, ScopeToken};
use crate::time::TripInstant;

use super::config::TripConfig;
use super::state::{GeoFenceStatus, TripState};

/// Policy consulted while a deviation warning is standing.
///
/// The monitor asks [`review_after`](Self::review_after) when the warning is
/// raised and schedules a single review at that offset. At the review the
/// policy may return a stronger status; weaker or equal answers are ignored.
pub trait GeoFenceEscalation {
    /// Delay before the standing warning is reviewed, or `None` to never review.
    fn review_after(&self) -> Option<Duration>;

    /// Returns the status the trip should move to, if any.
    fn escalate(
        &mut self,
        status: GeoFenceStatus,
        distance_m: u32,
        standing: Duration,
    ) -> Option<GeoFenceStatus>;
}

/// Never escalates; `Danger` is unreachable with this policy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoEscalation;

impl GeoFenceEscalation for NoEscalation {
    fn review_after(&self) -> Option<Duration> {
        None
    }

    fn escalate(&mut self, _: GeoFenceStatus, _: u32, _: Duration) -> Option<GeoFenceStatus> {
        None
    }
}

/// Escalates an unacknowledged warning to `Danger` after a fixed standing time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WarningTimeout {
    pub after: Duration,
}

impl WarningTimeout {
    #[must_use]
    pub const fn new(after: Duration) -> Self {
        Self { after }
    }
}

impl GeoFenceEscalation for WarningTimeout {
    fn review_after(&self) -> Option<Duration> {
        Some(self.after)
    }

    fn escalate(
        &mut self,
        status: GeoFenceStatus,
        _distance_m: u32,
        standing: Duration,
    ) -> Option<GeoFenceStatus> {
        (status == GeoFenceStatus::Warning && standing >= self.after)
            .then_some(GeoFenceStatus::Danger)
    }
}

/// Deviation timer, review timer and the once-per-trip latch.
#[derive(Copy, Clone, Debug)]
pub struct DeviationMonitor<I> {
    /// One-shot timer that raises the simulated deviation.
    detection: Deadline<I>,
    /// Re-checks a standing warning against the escalation policy.
    review: Deadline<I>,
    /// When the current warning was raised; cleared on acknowledgement.
    warning_since: Option<I>,
    /// Set once the deviation has been reported for this trip.
    fired: bool,
}

impl<I: TripInstant> DeviationMonitor<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            detection: Deadline::new(),
            review: Deadline::new(),
            warning_since: None,
            fired: false,
        }
    }

    /// Schedules the deviation relative to entering the ride phase.
    pub fn arm(&mut self, entered_at: I, token: ScopeToken, config: &TripConfig) {
        if !self.fired {
            self.detection.arm(entered_at + config.deviation_delay, token);
        }
    }

    /// Disarms both timers. The once-per-trip latch is kept, so re-arming
    /// after a stop never raises a second deviation.
    pub fn stop(&mut self) {
        self.detection.disarm();
        self.review.disarm();
    }

    /// Returns `true` once the deviation has been raised for this trip.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }

    #[must_use]
    pub fn detection_due(&self, scope: &CancelScope) -> Option<I> {
        self.detection.pending(scope)
    }

    #[must_use]
    pub fn review_due(&self, scope: &CancelScope) -> Option<I> {
        self.review.pending(scope)
    }

    /// Raises the deviation if the detection timer is due. Returns the
    /// reported distance.
    pub fn fire_detection<E: GeoFenceEscalation>(
        &mut self,
        now: I,
        scope: &CancelScope,
        state: &mut TripState,
        config: &TripConfig,
        escalation: &E,
    ) -> Option<u32> {
        let at = self.detection.fire(now, scope)?;
        if self.fired {
            return None;
        }

        self.fired = true;
        state.deviation_distance_m = config.deviation_distance_m;
        state.geo_fence_status = GeoFenceStatus::Warning;
        state.deviation_alert_visible = true;
        self.warning_since = Some(at);

        if let (Some(after), Some(token)) = (escalation.review_after(), scope.token()) {
            self.review.arm(at + after, token);
        }

        Some(config.deviation_distance_m)
    }

    /// Consults the escalation policy if the review timer is due. Returns the
    /// new status when the policy escalated.
    pub fn fire_review<E: GeoFenceEscalation>(
        &mut self,
        now: I,
        scope: &CancelScope,
        state: &mut TripState,
        escalation: &mut E,
    ) -> Option<GeoFenceStatus> {
        let at = self.review.fire(now, scope)?;
        let since = self.warning_since?;
        if !state.is_deviated() {
            return None;
        }

        let standing = at.saturating_duration_since(since);
        let next = escalation.escalate(
            state.geo_fence_status,
            state.deviation_distance_m,
            standing,
        )?;
        if next <= state.geo_fence_status {
            return None;
        }

        state.geo_fence_status = next;
        Some(next)
    }

    /// Clears the deviation. Returns `true` when there was something to clear.
    pub fn acknowledge(&mut self, state: &mut TripState) -> bool {
        let had_alert = state.is_deviated() || state.deviation_alert_visible;
        state.geo_fence_status = GeoFenceStatus::Safe;
        state.deviation_distance_m = 0;
        state.deviation_alert_visible = false;
        self.review.disarm();
        self.warning_since = None;
        had_alert
    }
}

impl<I: TripInstant> Default for DeviationMonitor<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_timeout_only_escalates_standing_warnings() {
        let mut policy = WarningTimeout::new(Duration::from_secs(30));
        assert_eq!(
            policy.escalate(GeoFenceStatus::Warning, 250, Duration::from_secs(29)),
            None
        );
        assert_eq!(
            policy.escalate(GeoFenceStatus::Warning, 250, Duration::from_secs(30)),
            Some(GeoFenceStatus::Danger)
        );
        assert_eq!(
            policy.escalate(GeoFenceStatus::Safe, 0, Duration::from_secs(60)),
            None
        );
    }

    #[test]
    fn no_escalation_never_schedules_a_review() {
        assert_eq!(NoEscalation.review_after(), None);
    }

    #[test]
    fn stop_keeps_the_once_per_trip_latch() {
        use crate::time::mock::MockInstant;

        let config = TripConfig::STANDARD;
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("token");
        let mut state = TripState::new(config.initial_speed_kmh);
        let mut monitor = DeviationMonitor::new();

        monitor.arm(MockInstant::millis(0), token, &config);
        assert_eq!(monitor.detection_due(&scope), Some(MockInstant::millis(10_000)));
        assert_eq!(
            monitor.fire_detection(
                MockInstant::millis(10_000),
                &scope,
                &mut state,
                &config,
                &NoEscalation,
            ),
            Some(250)
        );

        monitor.stop();
        monitor.arm(MockInstant::millis(20_000), token, &config);
        assert_eq!(monitor.detection_due(&scope), None);
        assert!(monitor.has_fired());
    }
}
