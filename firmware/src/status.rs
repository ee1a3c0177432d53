#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The trip task publishes every change into lightweight atomics so the
//! console, the LED and the buttons can read a `StatusSnapshot` without
//! borrowing the session.

use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};
use trip_core::dispatch::{DriverEta, SosAlertId};
use trip_core::phases::TripPhase;
use trip_core::repl::status::StatusSnapshot;
use trip_core::sos::SosState;
use trip_core::trip::{GeoFenceStatus, Lifecycle, TripState};

static LIFECYCLE: AtomicU8 = AtomicU8::new(0);
/// Phase tag plus one (0 == no trip state).
static PHASE: AtomicU8 = AtomicU8::new(0);
static PROGRESS: AtomicU8 = AtomicU8::new(0);
static SPEED_KMH: AtomicU16 = AtomicU16::new(0);
static GEOFENCE: AtomicU8 = AtomicU8::new(0);
static DEVIATION_M: AtomicU32 = AtomicU32::new(0);
static SPEED_ALERT: AtomicBool = AtomicBool::new(false);
static DEVIATION_ALERT: AtomicBool = AtomicBool::new(false);
/// ETA minutes plus one (0 == unknown).
static ETA_MINUTES: AtomicU16 = AtomicU16::new(0);
static SOS: AtomicU8 = AtomicU8::new(0);
/// Alert id plus one (0 == none).
static SOS_ALERT: AtomicU32 = AtomicU32::new(0);

/// Stores `snapshot` for readers on other tasks.
pub fn publish(snapshot: &StatusSnapshot) {
    LIFECYCLE.store(encode_lifecycle(snapshot.lifecycle), Ordering::Relaxed);
    SOS.store(encode_sos(snapshot.sos), Ordering::Relaxed);
    ETA_MINUTES.store(
        snapshot
            .driver_eta
            .map_or(0, |eta| eta.minutes.saturating_add(1)),
        Ordering::Relaxed,
    );
    SOS_ALERT.store(
        snapshot.sos_alert.map_or(0, |id| id.0.saturating_add(1)),
        Ordering::Relaxed,
    );

    let Some(trip) = snapshot.trip else {
        PHASE.store(0, Ordering::Relaxed);
        return;
    };
    PROGRESS.store(trip.progress_percent, Ordering::Relaxed);
    SPEED_KMH.store(trip.current_speed_kmh, Ordering::Relaxed);
    GEOFENCE.store(encode_geofence(trip.geo_fence_status), Ordering::Relaxed);
    DEVIATION_M.store(trip.deviation_distance_m, Ordering::Relaxed);
    SPEED_ALERT.store(trip.speed_alert_active, Ordering::Relaxed);
    DEVIATION_ALERT.store(trip.deviation_alert_visible, Ordering::Relaxed);
    PHASE.store(encode_phase(trip.phase) + 1, Ordering::Relaxed);
}

/// Rebuilds the last published snapshot.
#[must_use]
pub fn snapshot() -> StatusSnapshot {
    let trip = decode_phase(PHASE.load(Ordering::Relaxed)).map(|phase| TripState {
        phase,
        progress_percent: PROGRESS.load(Ordering::Relaxed),
        current_speed_kmh: SPEED_KMH.load(Ordering::Relaxed),
        geo_fence_status: decode_geofence(GEOFENCE.load(Ordering::Relaxed)),
        deviation_distance_m: DEVIATION_M.load(Ordering::Relaxed),
        speed_alert_active: SPEED_ALERT.load(Ordering::Relaxed),
        deviation_alert_visible: DEVIATION_ALERT.load(Ordering::Relaxed),
    });

    StatusSnapshot {
        lifecycle: decode_lifecycle(LIFECYCLE.load(Ordering::Relaxed)),
        trip,
        driver_eta: match ETA_MINUTES.load(Ordering::Relaxed) {
            0 => None,
            raw => Some(DriverEta { minutes: raw - 1 }),
        },
        sos: decode_sos(SOS.load(Ordering::Relaxed)),
        sos_alert: match SOS_ALERT.load(Ordering::Relaxed) {
            0 => None,
            raw => Some(SosAlertId(raw - 1)),
        },
    }
}

/// Blink timing for the status LED, in milliseconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedPattern {
    pub on_ms: u32,
    pub off_ms: u32,
}

impl LedPattern {
    pub const OFF: LedPattern = LedPattern { on_ms: 0, off_ms: 500 };
    pub const SOLID: LedPattern = LedPattern { on_ms: 500, off_ms: 0 };
    pub const HEARTBEAT: LedPattern = LedPattern { on_ms: 50, off_ms: 1_950 };
    pub const WARNING: LedPattern = LedPattern { on_ms: 250, off_ms: 250 };
    pub const DANGER: LedPattern = LedPattern { on_ms: 80, off_ms: 80 };
}

/// Chooses the LED pattern; an SOS in progress outranks the geo-fence.
#[must_use]
pub fn led_pattern(snapshot: &StatusSnapshot) -> LedPattern {
    match snapshot.sos {
        SosState::Active => return LedPattern::SOLID,
        SosState::ConfirmPending => return LedPattern::DANGER,
        SosState::Idle => {}
    }

    match snapshot.trip {
        None => LedPattern::OFF,
        Some(trip) => match trip.geo_fence_status {
            GeoFenceStatus::Safe => LedPattern::HEARTBEAT,
            GeoFenceStatus::Warning => LedPattern::WARNING,
            GeoFenceStatus::Danger => LedPattern::DANGER,
        },
    }
}

const fn encode_lifecycle(lifecycle: Lifecycle) -> u8 {
    match lifecycle {
        Lifecycle::Idle => 0,
        Lifecycle::Running => 1,
        Lifecycle::TornDown => 2,
    }
}

const fn decode_lifecycle(raw: u8) -> Lifecycle {
    match raw {
        1 => Lifecycle::Running,
        2 => Lifecycle::TornDown,
        _ => Lifecycle::Idle,
    }
}

const fn encode_phase(phase: TripPhase) -> u8 {
    match phase {
        TripPhase::Waiting => 0,
        TripPhase::OnWay => 1,
        TripPhase::InProgress => 2,
    }
}

const fn decode_phase(raw: u8) -> Option<TripPhase> {
    match raw {
        1 => Some(TripPhase::Waiting),
        2 => Some(TripPhase::OnWay),
        3 => Some(TripPhase::InProgress),
        _ => None,
    }
}

const fn encode_geofence(status: GeoFenceStatus) -> u8 {
    match status {
        GeoFenceStatus::Safe => 0,
        GeoFenceStatus::Warning => 1,
        GeoFenceStatus::Danger => 2,
    }
}

const fn decode_geofence(raw: u8) -> GeoFenceStatus {
    match raw {
        1 => GeoFenceStatus::Warning,
        2 => GeoFenceStatus::Danger,
        _ => GeoFenceStatus::Safe,
    }
}

const fn encode_sos(state: SosState) -> u8 {
    match state {
        SosState::Idle => 0,
        SosState::ConfirmPending => 1,
        SosState::Active => 2,
    }
}

const fn decode_sos(raw: u8) -> SosState {
    match raw {
        1 => SosState::ConfirmPending,
        2 => SosState::Active,
        _ => SosState::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning_ride() -> StatusSnapshot {
        StatusSnapshot {
            lifecycle: Lifecycle::Running,
            trip: Some(TripState {
                phase: TripPhase::InProgress,
                progress_percent: 40,
                current_speed_kmh: 57,
                geo_fence_status: GeoFenceStatus::Warning,
                deviation_distance_m: 250,
                speed_alert_active: true,
                deviation_alert_visible: true,
            }),
            driver_eta: Some(DriverEta { minutes: 0 }),
            sos: SosState::Active,
            sos_alert: Some(SosAlertId(0)),
        }
    }

    // One test touches the statics so parallel test threads cannot interleave.
    #[test]
    fn published_snapshot_reads_back() {
        let ride = warning_ride();
        publish(&ride);
        assert_eq!(snapshot(), ride);

        let torn_down = StatusSnapshot {
            lifecycle: Lifecycle::TornDown,
            trip: None,
            driver_eta: None,
            sos: SosState::Idle,
            sos_alert: None,
        };
        publish(&torn_down);
        assert_eq!(snapshot(), torn_down);
    }

    #[test]
    fn sos_outranks_the_geofence_on_the_led() {
        let mut ride = warning_ride();
        assert_eq!(led_pattern(&ride), LedPattern::SOLID);

        ride.sos = SosState::Idle;
        assert_eq!(led_pattern(&ride), LedPattern::WARNING);

        ride.trip = None;
        assert_eq!(led_pattern(&ride), LedPattern::OFF);
    }
}
