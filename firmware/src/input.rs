#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Front-panel buttons.
//!
//! The beacon has two buttons. Short and long presses are mapped onto session
//! inputs depending on where the trip and the SOS flow currently are.

use core::fmt;
use core::time::Duration;

use trip_core::repl::commands::SessionControl;
use trip_core::repl::grammar::SosAction;
use trip_core::sos::{SosRejection, SosState};
use trip_core::trip::{Lifecycle, TripError};

/// Hold time that turns a press into a long press.
pub const LONG_PRESS: Duration = Duration::from_millis(800);

/// Presses shorter than this are treated as contact bounce.
pub const DEBOUNCE: Duration = Duration::from_millis(30);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    /// Red button next to the buzzer.
    Sos,
    /// Green button; starts the trip and acknowledges alerts.
    Ride,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Gesture {
    Short,
    Long,
}

/// Classifies a press by how long the button was held.
#[must_use]
pub fn classify(held: Duration) -> Option<Gesture> {
    if held < DEBOUNCE {
        None
    } else if held < LONG_PRESS {
        Some(Gesture::Short)
    } else {
        Some(Gesture::Long)
    }
}

/// Inputs accepted by the trip task, from buttons or the console.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BeaconInput {
    Start,
    Acknowledge,
    SosPress,
    SosConfirm,
    SosCancel,
    Probe,
    Teardown,
}

impl BeaconInput {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BeaconInput::Start => "start",
            BeaconInput::Acknowledge => "ack",
            BeaconInput::SosPress => "sos-press",
            BeaconInput::SosConfirm => "sos-confirm",
            BeaconInput::SosCancel => "sos-cancel",
            BeaconInput::Probe => "probe",
            BeaconInput::Teardown => "teardown",
        }
    }
}

/// Maps a button gesture onto a session input.
///
/// SOS: a short press opens the prompt and a second short press confirms it;
/// a long press while the prompt is open cancels it. Ride: a short press
/// acknowledges the deviation alert, a long press starts an idle trip or
/// ends a running one. The trip task renews a torn-down session, so
/// `TornDown` is only seen between the teardown and that renewal.
#[must_use]
pub fn map_gesture(
    button: Button,
    gesture: Gesture,
    lifecycle: Lifecycle,
    sos: SosState,
) -> Option<BeaconInput> {
    match (button, gesture) {
        (Button::Sos, Gesture::Short) => match sos {
            SosState::Idle => Some(BeaconInput::SosPress),
            SosState::ConfirmPending => Some(BeaconInput::SosConfirm),
            SosState::Active => None,
        },
        (Button::Sos, Gesture::Long) => {
            (sos == SosState::ConfirmPending).then_some(BeaconInput::SosCancel)
        }
        (Button::Ride, Gesture::Short) => {
            (lifecycle == Lifecycle::Running).then_some(BeaconInput::Acknowledge)
        }
        (Button::Ride, Gesture::Long) => match lifecycle {
            Lifecycle::Idle => Some(BeaconInput::Start),
            Lifecycle::Running => Some(BeaconInput::Teardown),
            Lifecycle::TornDown => None,
        },
    }
}

/// Why the trip task dropped an input.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputRejected {
    Trip(TripError),
    Sos(SosRejection),
    NothingToAcknowledge,
    AlreadyTornDown,
}

impl fmt::Display for InputRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRejected::Trip(error) => fmt::Display::fmt(error, f),
            InputRejected::Sos(rejection) => fmt::Display::fmt(rejection, f),
            InputRejected::NothingToAcknowledge => f.write_str("no deviation alert to acknowledge"),
            InputRejected::AlreadyTornDown => f.write_str("session already torn down"),
        }
    }
}

/// Applies one input to the session at `now`.
///
/// # Errors
///
/// Returns why the session ignored the input; the session is unchanged then.
pub fn apply<S: SessionControl>(
    session: &mut S,
    input: BeaconInput,
    now: S::Instant,
) -> Result<(), InputRejected> {
    match input {
        BeaconInput::Start => session.start(now).map_err(InputRejected::Trip),
        BeaconInput::Acknowledge => session
            .acknowledge_deviation(now)
            .then_some(())
            .ok_or(InputRejected::NothingToAcknowledge),
        BeaconInput::SosPress => sos(session, SosAction::Press, now),
        BeaconInput::SosConfirm => sos(session, SosAction::Confirm, now),
        BeaconInput::SosCancel => sos(session, SosAction::Cancel, now),
        BeaconInput::Probe => {
            session.probe_route(now);
            Ok(())
        }
        BeaconInput::Teardown => session
            .teardown(now)
            .then_some(())
            .ok_or(InputRejected::AlreadyTornDown),
    }
}

/// Swaps a torn-down session for the one `fresh` builds so the buttons keep
/// working for the next ride. Returns `true` when the session was replaced.
pub fn renew_if_torn_down<S: SessionControl>(
    session: &mut S,
    fresh: impl FnOnce() -> S,
) -> bool {
    if session.status().lifecycle != Lifecycle::TornDown {
        return false;
    }

    *session = fresh();
    true
}

fn sos<S: SessionControl>(
    session: &mut S,
    action: SosAction,
    now: S::Instant,
) -> Result<(), InputRejected> {
    session
        .sos(action, now)
        .map(|_| ())
        .map_err(InputRejected::Sos)
}
