//! Trip phase definitions and the plans that order them.
//!
//! A [`PhasePlan`] is an immutable, compile-time description of how long the
//! controller dwells in each phase before moving on. The controller walks the
//! plan strictly forward; the final step is normally open-ended.

use core::fmt;
use core::time::Duration;

pub mod standard;

pub use standard::STANDARD_PLAN;

/// Longest plan we expect to encode plus one step of headroom.
pub const MAX_PLAN_STEPS: usize = 4;

/// Lifecycle phase of a single trip.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum TripPhase {
    Waiting,
    OnWay,
    InProgress,
}

impl TripPhase {
    /// Stable lowercase tag used in logs and the REPL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TripPhase::Waiting => "waiting",
            TripPhase::OnWay => "on-way",
            TripPhase::InProgress => "in-progress",
        }
    }
}

impl fmt::Display for TripPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a phase lasts before the sequencer advances.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PhaseDwell {
    /// Advance to the next step after the given duration.
    Fixed(Duration),
    /// Stay in this phase until the controller is torn down.
    OpenEnded,
}

/// Single entry in a [`PhasePlan`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhaseStep {
    pub phase: TripPhase,
    pub dwell: PhaseDwell,
}

impl PhaseStep {
    #[must_use]
    pub const fn fixed(phase: TripPhase, dwell: Duration) -> Self {
        Self {
            phase,
            dwell: PhaseDwell::Fixed(dwell),
        }
    }

    #[must_use]
    pub const fn open_ended(phase: TripPhase) -> Self {
        Self {
            phase,
            dwell: PhaseDwell::OpenEnded,
        }
    }
}

/// Ordered, immutable list of phase steps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhasePlan {
    steps: &'static [PhaseStep],
}

/// Validation failures for hand-built plans.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlanError {
    Empty,
    TooManySteps,
    /// Phases must appear in strictly increasing order.
    OutOfOrder { index: usize },
    /// Only the last step may be open-ended.
    OpenEndedBeforeLast { index: usize },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Empty => f.write_str("phase plan has no steps"),
            PlanError::TooManySteps => write!(f, "phase plan exceeds {MAX_PLAN_STEPS} steps"),
            PlanError::OutOfOrder { index } => {
                write!(f, "phase plan step {index} moves backwards")
            }
            PlanError::OpenEndedBeforeLast { index } => {
                write!(f, "phase plan step {index} is open-ended but not last")
            }
        }
    }
}

impl PhasePlan {
    /// Builds a plan without validation; used for the shipped constants.
    #[must_use]
    pub const fn new_unchecked(steps: &'static [PhaseStep]) -> Self {
        Self { steps }
    }

    /// Builds a plan after checking ordering and dwell placement.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] describing the first offending step.
    pub fn new(steps: &'static [PhaseStep]) -> Result<Self, PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }
        if steps.len() > MAX_PLAN_STEPS {
            return Err(PlanError::TooManySteps);
        }

        let last = steps.len() - 1;
        for (index, step) in steps.iter().enumerate() {
            if index > 0 && step.phase <= steps[index - 1].phase {
                return Err(PlanError::OutOfOrder { index });
            }
            if index < last && step.dwell == PhaseDwell::OpenEnded {
                return Err(PlanError::OpenEndedBeforeLast { index });
            }
        }

        Ok(Self { steps })
    }

    /// Returns the step at `index`, if present.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&PhaseStep> {
        self.steps.get(index)
    }

    /// Number of steps in the plan.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when the plan carries no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates the steps in order.
    #[must_use]
    pub fn steps(&self) -> impl Iterator<Item = &PhaseStep> {
        self.steps.iter()
    }

    /// Total fixed dwell before the plan reaches `phase`, if the plan visits it.
    #[must_use]
    pub fn offset_of(&self, phase: TripPhase) -> Option<Duration> {
        let mut elapsed = Duration::ZERO;
        for step in self.steps {
            if step.phase == phase {
                return Some(elapsed);
            }
            match step.dwell {
                PhaseDwell::Fixed(dwell) => elapsed += dwell,
                PhaseDwell::OpenEnded => return None,
            }
        }
        None
    }
}
