mod common;

use core::time::Duration;

use common::{MockInstant, RecordingBackend, ScriptedRandom, session};
use trip_core::alert::{AlertKind, AudioFault};
use trip_core::dispatch::MockResponders;
use trip_core::events::TripEventKind;
use trip_core::phases::TripPhase;
use trip_core::session::{RideSession, SessionConfig};
use trip_core::trip::{GeoFenceStatus, WarningTimeout};

#[test]
fn standard_ride_raises_and_clears_the_warning() {
    let mut ride = session(&[40]);
    ride.start(MockInstant::millis(0)).expect("start");

    ride.drive(MockInstant::millis(6_000));
    assert_eq!(
        ride.snapshot().map(|state| state.phase),
        Some(TripPhase::InProgress)
    );

    ride.drive(MockInstant::millis(15_999));
    let state = ride.snapshot().expect("running");
    assert_eq!(state.geo_fence_status, GeoFenceStatus::Safe);
    assert!(!state.deviation_alert_visible);

    ride.drive(MockInstant::millis(16_000));
    let state = ride.snapshot().expect("running");
    assert_eq!(state.geo_fence_status, GeoFenceStatus::Warning);
    assert_eq!(state.deviation_distance_m, 250);
    assert!(state.deviation_alert_visible);
    assert_eq!(state.progress_percent, 40);
    assert_eq!(ride.alerts().backend().count(AlertKind::DeviationChime), 1);
    assert!(
        ride.events()
            .contains(&TripEventKind::AlertPlayed(AlertKind::DeviationChime))
    );

    assert!(ride.acknowledge_deviation(MockInstant::millis(17_000)));
    let state = ride.snapshot().expect("running");
    assert_eq!(state.geo_fence_status, GeoFenceStatus::Safe);
    assert_eq!(state.deviation_distance_m, 0);
    assert!(!state.deviation_alert_visible);
}

#[test]
fn deviation_never_fires_twice() {
    let mut ride = session(&[40]);
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(16_000));
    assert!(ride.acknowledge_deviation(MockInstant::millis(16_500)));
    assert!(!ride.acknowledge_deviation(MockInstant::millis(16_600)));

    ride.drive(MockInstant::millis(120_000));
    let state = ride.snapshot().expect("running");
    assert_eq!(state.geo_fence_status, GeoFenceStatus::Safe);
    assert!(!state.deviation_alert_visible);
    assert_eq!(
        ride.events()
            .count_matching(|event| matches!(event, TripEventKind::DeviationDetected { .. })),
        1
    );
    assert_eq!(ride.alerts().backend().count(AlertKind::DeviationChime), 1);
}

#[test]
fn acknowledge_before_the_deviation_is_a_no_op() {
    let mut ride = session(&[40]);
    assert!(!ride.acknowledge_deviation(MockInstant::millis(0)));

    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(10_000));
    assert!(!ride.acknowledge_deviation(MockInstant::millis(10_000)));
    assert!(!ride.events().contains(&TripEventKind::DeviationAcknowledged));
}

#[test]
fn unavailable_audio_still_shows_the_warning() {
    let backend = RecordingBackend {
        fail_open: true,
        ..RecordingBackend::default()
    };
    let mut ride = RideSession::new(
        SessionConfig::PASSENGER,
        ScriptedRandom::new(&[40]),
        backend,
        MockResponders::new(ScriptedRandom::new(&[99])),
    );
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(16_000));

    let state = ride.snapshot().expect("running");
    assert_eq!(state.geo_fence_status, GeoFenceStatus::Warning);
    assert!(ride.events().contains(&TripEventKind::AlertDegraded(
        AlertKind::DeviationChime,
        AudioFault::Unavailable
    )));
    assert!(ride.alerts().backend().scheduled.is_empty());
}

#[test]
fn warning_timeout_escalates_an_ignored_warning() {
    let mut ride = RideSession::with_escalation(
        SessionConfig::PASSENGER,
        ScriptedRandom::new(&[40]),
        RecordingBackend::default(),
        MockResponders::new(ScriptedRandom::new(&[99])),
        WarningTimeout::new(Duration::from_secs(5)),
    );
    ride.start(MockInstant::millis(0)).expect("start");

    ride.drive(MockInstant::millis(20_999));
    assert_eq!(
        ride.snapshot().expect("running").geo_fence_status,
        GeoFenceStatus::Warning
    );

    ride.drive(MockInstant::millis(21_000));
    assert_eq!(
        ride.snapshot().expect("running").geo_fence_status,
        GeoFenceStatus::Danger
    );
    assert!(
        ride.events()
            .contains(&TripEventKind::GeoFenceEscalated(GeoFenceStatus::Danger))
    );
}

#[test]
fn probing_the_route_leaves_the_trip_alone() {
    let mut ride = RideSession::new(
        SessionConfig::PASSENGER,
        ScriptedRandom::new(&[40]),
        RecordingBackend::default(),
        // Draw 5 is under the 20 % cut, 321 is the reported distance.
        MockResponders::new(ScriptedRandom::new(&[5, 321])),
    );
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(7_000));
    let before = ride.snapshot();

    let report = ride.probe_route(MockInstant::millis(7_000));
    assert!(report.is_deviated);
    assert_eq!(report.deviation_distance_m, 321);
    assert_eq!(ride.snapshot(), before);
    assert!(ride.events().contains(&TripEventKind::RouteProbed {
        deviated: true,
        distance_m: 321,
    }));
}
