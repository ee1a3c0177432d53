//! Ride session: one trip, one SOS flow and one shared alert emitter.
//!
//! Firmware and emulator both drive a [`RideSession`]; it is the only place
//! where trip events, SOS steps, audio outcomes and collaborator calls meet.

use core::fmt;

use crate::alert::{AlertEmitter, AlertOutcome, AudioBackend};
use crate::dispatch::{
    Collaborators, DEMO_PICKUP, DEMO_ROUTE, DeviationReport, DispatchError, DriverEta, GeoPoint,
    RoadsideKind, RoadsideRequest, RoadsideTicket, Role, SosAlertId, SosRequest,
};
use crate::events::{EventLog, EventSink, TripEventKind};
use crate::phases::TripPhase;
use crate::random::RandomSource;
use crate::sos::{SosConfig, SosFlow, SosRejection, SosState};
use crate::time::TripInstant;
use crate::trip::{
    GeoFenceEscalation, Lifecycle, NoEscalation, TripConfig, TripController, TripEffects,
    TripError, TripState,
};

/// Construction-time session parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SessionConfig {
    pub trip: TripConfig,
    pub sos: SosConfig,
    pub role: Role,
    pub position: GeoPoint,
    pub route: &'static [GeoPoint],
}

impl SessionConfig {
    /// Passenger session on the demo route.
    pub const PASSENGER: SessionConfig = SessionConfig {
        trip: TripConfig::STANDARD,
        sos: SosConfig::STANDARD,
        role: Role::Passenger,
        position: DEMO_PICKUP,
        route: &DEMO_ROUTE,
    };

    /// Same trip seen from the driver's side.
    pub const DRIVER: SessionConfig = SessionConfig {
        role: Role::Driver,
        ..Self::PASSENGER
    };
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::PASSENGER
    }
}

/// Why a roadside request was not booked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoadsideRejection {
    /// Only the driver can call roadside help.
    NotDriver,
    TornDown,
    Dispatch(DispatchError),
}

impl fmt::Display for RoadsideRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadsideRejection::NotDriver => f.write_str("roadside help is for drivers"),
            RoadsideRejection::TornDown => f.write_str("session has been torn down"),
            RoadsideRejection::Dispatch(error) => write!(f, "roadside service {error}"),
        }
    }
}

/// Everything a ride needs, driven from a single owner.
pub struct RideSession<I, R, B, D, E = NoEscalation>
where
    I: TripInstant,
    B: AudioBackend,
{
    trip: TripController<I, R, E>,
    sos: SosFlow<I>,
    alerts: AlertEmitter<B>,
    events: EventLog<I>,
    dispatch: D,
    role: Role,
    position: GeoPoint,
    route: &'static [GeoPoint],
    driver_eta: Option<DriverEta>,
    sos_alert: Option<SosAlertId>,
    torn_down: bool,
}

impl<I, R, B, D> RideSession<I, R, B, D, NoEscalation>
where
    I: TripInstant,
    R: RandomSource,
    B: AudioBackend,
    D: Collaborators,
{
    #[must_use]
    pub fn new(config: SessionConfig, rng: R, backend: B, dispatch: D) -> Self {
        Self::with_escalation(config, rng, backend, dispatch, NoEscalation)
    }
}

impl<I, R, B, D, E> RideSession<I, R, B, D, E>
where
    I: TripInstant,
    R: RandomSource,
    B: AudioBackend,
    D: Collaborators,
    E: GeoFenceEscalation,
{
    /// Builds a session with a custom geo-fence escalation policy.
    #[must_use]
    pub fn with_escalation(
        config: SessionConfig,
        rng: R,
        backend: B,
        dispatch: D,
        escalation: E,
    ) -> Self {
        Self {
            trip: TripController::with_escalation(config.trip, rng, escalation),
            sos: SosFlow::new(config.sos),
            alerts: AlertEmitter::new(backend),
            events: EventLog::new(),
            dispatch,
            role: config.role,
            position: config.position,
            route: config.route,
            driver_eta: None,
            sos_alert: None,
            torn_down: false,
        }
    }

    /// Starts the trip.
    ///
    /// # Errors
    ///
    /// Propagates [`TripError`] from the controller.
    pub fn start(&mut self, now: I) -> Result<(), TripError> {
        let (trip, mut effects) = self.split();
        trip.start(now, &mut effects)
    }

    /// Fires every due trip and SOS timer in time order. Returns how many fired.
    pub fn drive(&mut self, now: I) -> usize {
        let mut fired = 0;
        loop {
            let trip_due = self.trip.next_deadline().filter(|at| *at <= now);
            let sos_due = self.sos.next_deadline().filter(|at| *at <= now);

            let trip_first = match (trip_due, sos_due) {
                (None, None) => break,
                (Some(trip_at), Some(sos_at)) => trip_at <= sos_at,
                (Some(_), None) => true,
                (None, Some(_)) => false,
            };

            if trip_first {
                let (trip, mut effects) = self.split();
                trip.step(now, &mut effects);
            } else if let Some(sos_at) = sos_due {
                if self.sos.step(sos_at) {
                    self.events.record(TripEventKind::SosResolved, sos_at);
                }
            }
            fired += 1;
        }
        fired
    }

    /// Earliest pending timer across the trip and the SOS flow.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        match (self.trip.next_deadline(), self.sos.next_deadline()) {
            (Some(trip), Some(sos)) => Some(trip.min(sos)),
            (trip, sos) => trip.or(sos),
        }
    }

    /// Dismisses the deviation alert.
    pub fn acknowledge_deviation(&mut self, now: I) -> bool {
        let (trip, mut effects) = self.split();
        trip.acknowledge_deviation(now, &mut effects)
    }

    /// Opens the SOS confirmation prompt.
    ///
    /// # Errors
    ///
    /// See [`SosFlow::press`].
    pub fn sos_press(&mut self, now: I) -> Result<SosState, SosRejection> {
        let state = self.sos.press()?;
        self.events.record(TripEventKind::SosRequested, now);
        Ok(state)
    }

    /// Confirms the emergency: sounds the siren and contacts responders.
    ///
    /// # Errors
    ///
    /// See [`SosFlow::confirm`]; a rejected confirm plays nothing.
    pub fn sos_confirm(&mut self, now: I) -> Result<SosState, SosRejection> {
        let state = self.sos.confirm(now)?;
        self.events.record(TripEventKind::SosConfirmed, now);

        let outcome = self.alerts.play_sos_alarm();
        record_alert(&mut self.events, outcome, now);

        let request = SosRequest {
            position: self.position,
            role: self.role,
        };
        match self.dispatch.send_sos(&request) {
            Ok(id) => {
                self.sos_alert = Some(id);
                self.events.record(TripEventKind::SosDispatched(id), now);
            }
            Err(error) => {
                self.events.record(TripEventKind::SosDispatchFailed(error), now);
            }
        }
        Ok(state)
    }

    /// Dismisses the SOS prompt.
    ///
    /// # Errors
    ///
    /// See [`SosFlow::cancel`].
    pub fn sos_cancel(&mut self, now: I) -> Result<SosState, SosRejection> {
        let state = self.sos.cancel()?;
        self.events.record(TripEventKind::SosCancelled, now);
        Ok(state)
    }

    /// Runs the route-deviation collaborator once. Trip state is untouched.
    pub fn probe_route(&mut self, now: I) -> DeviationReport {
        let report = self.dispatch.check(self.position, self.route);
        self.events.record(
            TripEventKind::RouteProbed {
                deviated: report.is_deviated,
                distance_m: report.deviation_distance_m,
            },
            now,
        );
        report
    }

    /// Books tyre or mechanic help at the session position.
    ///
    /// # Errors
    ///
    /// Passenger and torn-down sessions are refused without contacting the
    /// service. A failed booking is recorded and returned.
    pub fn request_roadside(
        &mut self,
        kind: RoadsideKind,
        now: I,
    ) -> Result<RoadsideTicket, RoadsideRejection> {
        if self.role != Role::Driver {
            return Err(RoadsideRejection::NotDriver);
        }
        if self.torn_down {
            return Err(RoadsideRejection::TornDown);
        }

        let request = RoadsideRequest {
            kind,
            position: self.position,
        };
        match self.dispatch.request_roadside(&request) {
            Ok(ticket) => {
                self.events.record(
                    TripEventKind::RoadsideBooked {
                        id: ticket.id,
                        eta_minutes: ticket.eta_minutes,
                    },
                    now,
                );
                Ok(ticket)
            }
            Err(error) => {
                self.events
                    .record(TripEventKind::RoadsideFailed(kind, error), now);
                Err(RoadsideRejection::Dispatch(error))
            }
        }
    }

    /// Cancels every timer, closes the SOS flow and releases audio.
    ///
    /// Returns `false` when the session was already torn down.
    pub fn teardown(&mut self, now: I) -> bool {
        if self.torn_down {
            return false;
        }

        self.torn_down = true;
        let (trip, mut effects) = self.split();
        trip.teardown(now, &mut effects);
        self.sos.close();
        self.alerts.release();
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<TripState> {
        self.trip.snapshot()
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.trip.lifecycle()
    }

    #[must_use]
    pub const fn sos_state(&self) -> SosState {
        self.sos.state()
    }

    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub const fn driver_eta(&self) -> Option<DriverEta> {
        self.driver_eta
    }

    #[must_use]
    pub const fn sos_alert(&self) -> Option<SosAlertId> {
        self.sos_alert
    }

    #[must_use]
    pub const fn trip(&self) -> &TripController<I, R, E> {
        &self.trip
    }

    #[must_use]
    pub const fn sos(&self) -> &SosFlow<I> {
        &self.sos
    }

    #[must_use]
    pub const fn events(&self) -> &EventLog<I> {
        &self.events
    }

    #[must_use]
    pub const fn alerts(&self) -> &AlertEmitter<B> {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertEmitter<B> {
        &mut self.alerts
    }

    pub fn dispatch_mut(&mut self) -> &mut D {
        &mut self.dispatch
    }

    fn split(&mut self) -> (&mut TripController<I, R, E>, Effects<'_, I, B, D>) {
        (
            &mut self.trip,
            Effects {
                alerts: &mut self.alerts,
                events: &mut self.events,
                dispatch: &mut self.dispatch,
                driver_eta: &mut self.driver_eta,
            },
        )
    }
}

fn record_alert<I: Copy>(events: &mut EventLog<I>, outcome: AlertOutcome, at: I) {
    let event = match outcome {
        AlertOutcome::Played { kind, .. } => TripEventKind::AlertPlayed(kind),
        AlertOutcome::Degraded { kind, fault } => TripEventKind::AlertDegraded(kind, fault),
    };
    events.record(event, at);
}

struct Effects<'a, I: Copy, B: AudioBackend, D> {
    alerts: &'a mut AlertEmitter<B>,
    events: &'a mut EventLog<I>,
    dispatch: &'a mut D,
    driver_eta: &'a mut Option<DriverEta>,
}

impl<I: Copy, B: AudioBackend, D: Collaborators> TripEffects<I> for Effects<'_, I, B, D> {
    fn record(&mut self, event: TripEventKind, at: I) {
        self.events.record(event, at);
    }

    fn deviation_alert(&mut self, at: I) {
        let outcome = self.alerts.play_deviation_chime();
        record_alert(&mut *self.events, outcome, at);
    }

    fn phase_entered(&mut self, phase: TripPhase, at: I) {
        if phase == TripPhase::OnWay {
            let eta = self.dispatch.driver_eta();
            *self.driver_eta = Some(eta);
            self.events
                .record(TripEventKind::DriverEta { minutes: eta.minutes }, at);
        }
    }
}
