//! Trip state owned by the controller and the read-only snapshot handed out.

use core::fmt;

use crate::phases::TripPhase;

/// Safety classification relative to the agreed route.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum GeoFenceStatus {
    Safe,
    Warning,
    Danger,
}

impl GeoFenceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GeoFenceStatus::Safe => "safe",
            GeoFenceStatus::Warning => "warning",
            GeoFenceStatus::Danger => "danger",
        }
    }
}

impl fmt::Display for GeoFenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable trip state. Only the controller writes to it; callers receive
/// copies through [`TripController::snapshot`](super::TripController::snapshot).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TripState {
    pub phase: TripPhase,
    pub progress_percent: u8,
    pub current_speed_kmh: u16,
    pub geo_fence_status: GeoFenceStatus,
    pub deviation_distance_m: u32,
    pub speed_alert_active: bool,
    pub deviation_alert_visible: bool,
}

impl TripState {
    /// Fresh state for a trip that has just been requested.
    #[must_use]
    pub const fn new(initial_speed_kmh: u16) -> Self {
        Self {
            phase: TripPhase::Waiting,
            progress_percent: 0,
            current_speed_kmh: initial_speed_kmh,
            geo_fence_status: GeoFenceStatus::Safe,
            deviation_distance_m: 0,
            speed_alert_active: false,
            deviation_alert_visible: false,
        }
    }

    /// Returns every alert and deviation field to its zero state.
    pub fn clear_alerts(&mut self) {
        self.geo_fence_status = GeoFenceStatus::Safe;
        self.deviation_distance_m = 0;
        self.speed_alert_active = false;
        self.deviation_alert_visible = false;
    }

    /// Returns `true` when the vehicle is reported off the safe route.
    #[must_use]
    pub const fn is_deviated(&self) -> bool {
        !matches!(self.geo_fence_status, GeoFenceStatus::Safe)
    }
}

/// Where the controller sits in its own lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// Constructed, `start` not yet called.
    Idle,
    Running,
    /// Scope closed; nothing will change again.
    TornDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Idle => f.write_str("idle"),
            Lifecycle::Running => f.write_str("running"),
            Lifecycle::TornDown => f.write_str("torn-down"),
        }
    }
}
