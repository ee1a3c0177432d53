//! Standard passenger trip plan.
//!
//! Driver matching and pickup are each simulated with a three second dwell,
//! after which the ride itself stays in progress until the session ends.

use core::time::Duration;

use super::{PhasePlan, PhaseStep, TripPhase};

/// Time spent waiting for a driver to accept.
pub const WAITING_DWELL: Duration = Duration::from_millis(3_000);
/// Time spent while the driver is on the way to the pickup point.
pub const ON_WAY_DWELL: Duration = Duration::from_millis(3_000);

/// Ordered phase steps of the standard trip.
pub const STANDARD_STEPS: [PhaseStep; 3] = [
    PhaseStep::fixed(TripPhase::Waiting, WAITING_DWELL),
    PhaseStep::fixed(TripPhase::OnWay, ON_WAY_DWELL),
    // The ride runs until teardown.
    PhaseStep::open_ended(TripPhase::InProgress),
];

/// Plan used by [`TripConfig::default`](crate::trip::TripConfig).
pub const STANDARD_PLAN: PhasePlan = PhasePlan::new_unchecked(&STANDARD_STEPS);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::PhaseDwell;

    #[test]
    fn standard_plan_matches_documented_timings() {
        assert_eq!(PhasePlan::new(&STANDARD_STEPS), Ok(STANDARD_PLAN));
        assert_eq!(STANDARD_PLAN.len(), 3);

        let waiting = STANDARD_PLAN.step(0).expect("waiting step");
        assert_eq!(waiting.phase, TripPhase::Waiting);
        assert_eq!(waiting.dwell, PhaseDwell::Fixed(WAITING_DWELL));

        let on_way = STANDARD_PLAN.step(1).expect("on-way step");
        assert_eq!(on_way.phase, TripPhase::OnWay);
        assert_eq!(on_way.dwell, PhaseDwell::Fixed(ON_WAY_DWELL));

        let riding = STANDARD_PLAN.step(2).expect("in-progress step");
        assert_eq!(riding.phase, TripPhase::InProgress);
        assert_eq!(riding.dwell, PhaseDwell::OpenEnded);

        assert_eq!(
            STANDARD_PLAN.offset_of(TripPhase::InProgress),
            Some(Duration::from_millis(6_000))
        );
    }
}
