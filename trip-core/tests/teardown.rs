mod common;

use common::{MockInstant, session};
use trip_core::events::TripEventKind;
use trip_core::sos::{SosRejection, SosState};
use trip_core::trip::{Lifecycle, TripError};

#[test]
fn teardown_mid_ride_stops_every_mutation() {
    let mut ride = session(&[58]);
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(9_500));
    ride.sos_press(MockInstant::millis(9_500)).expect("press");
    ride.sos_confirm(MockInstant::millis(9_500)).expect("confirm");
    let recorded = ride.events().next_id();

    assert!(ride.teardown(MockInstant::millis(9_600)));
    assert_eq!(ride.lifecycle(), Lifecycle::TornDown);
    assert!(ride.snapshot().is_none());
    assert_eq!(ride.next_deadline(), None);

    assert_eq!(ride.drive(MockInstant::millis(600_000)), 0);
    assert!(ride.snapshot().is_none());
    assert_eq!(ride.sos_state(), SosState::Idle);

    // Only the teardown itself was recorded after the snapshot.
    let after: Vec<_> = ride
        .events()
        .since(recorded)
        .map(|record| record.event)
        .collect();
    assert_eq!(after, [TripEventKind::TornDown]);
}

#[test]
fn inputs_after_teardown_are_rejected() {
    let mut ride = session(&[40]);
    ride.start(MockInstant::millis(0)).expect("start");
    ride.teardown(MockInstant::millis(1_000));

    assert_eq!(
        ride.start(MockInstant::millis(2_000)),
        Err(TripError::TornDown)
    );
    assert!(!ride.acknowledge_deviation(MockInstant::millis(2_000)));
    assert_eq!(
        ride.sos_press(MockInstant::millis(2_000)),
        Err(SosRejection::Closed)
    );
}

#[test]
fn audio_context_is_released_exactly_once() {
    let mut ride = session(&[40]);
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(16_000));
    assert!(ride.alerts().is_open());

    assert!(ride.teardown(MockInstant::millis(17_000)));
    assert!(!ride.teardown(MockInstant::millis(18_000)));
    assert!(ride.is_torn_down());
    assert_eq!(ride.alerts().backend().closes, 1);
}

#[test]
fn teardown_before_start_needs_no_audio() {
    let mut ride = session(&[40]);
    assert!(ride.teardown(MockInstant::millis(0)));
    assert_eq!(ride.alerts().backend().opens, 0);
    assert_eq!(ride.alerts().backend().closes, 0);
    assert_eq!(ride.drive(MockInstant::millis(60_000)), 0);
}

#[test]
fn teardown_during_dwell_never_enters_the_next_phase() {
    let mut ride = session(&[40]);
    ride.start(MockInstant::millis(0)).expect("start");
    ride.drive(MockInstant::millis(2_000));
    ride.teardown(MockInstant::millis(2_000));
    ride.drive(MockInstant::millis(30_000));

    assert_eq!(
        ride.events()
            .count_matching(|event| matches!(event, TripEventKind::PhaseEntered(_))),
        1
    );
    assert!(ride.driver_eta().is_none());
}
