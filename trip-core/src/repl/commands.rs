//! Console command dispatcher.
//!
//! Parsed commands are applied to anything implementing [`SessionControl`]
//! on a simulated clock owned by the [`CommandExecutor`]. The module stays
//! `no_std` so the beacon and the emulator share it.

use core::fmt;
use core::time::Duration;

use crate::alert::AudioBackend;
use crate::dispatch::{Collaborators, DeviationReport, RoadsideKind, RoadsideTicket};
use crate::random::RandomSource;
use crate::session::{RideSession, RoadsideRejection};
use crate::sos::{SosRejection, SosState};
use crate::time::TripInstant;
use crate::trip::{GeoFenceEscalation, TripError};

use super::catalog::{self, CommandSpec};
use super::grammar::{self, Command, SosAction};
use super::status::{StatusFormatter, StatusSnapshot};

/// Operations the console can drive.
pub trait SessionControl {
    type Instant: TripInstant;

    /// # Errors
    ///
    /// See [`RideSession::start`].
    fn start(&mut self, now: Self::Instant) -> Result<(), TripError>;

    fn drive(&mut self, now: Self::Instant) -> usize;

    fn acknowledge_deviation(&mut self, now: Self::Instant) -> bool;

    /// # Errors
    ///
    /// Returns the [`SosRejection`] when the flow ignores the input.
    fn sos(&mut self, action: SosAction, now: Self::Instant) -> Result<SosState, SosRejection>;

    fn probe_route(&mut self, now: Self::Instant) -> DeviationReport;

    /// # Errors
    ///
    /// See [`RideSession::request_roadside`].
    fn roadside(
        &mut self,
        kind: RoadsideKind,
        now: Self::Instant,
    ) -> Result<RoadsideTicket, RoadsideRejection>;

    fn teardown(&mut self, now: Self::Instant) -> bool;

    fn status(&self) -> StatusSnapshot;
}

impl<I, R, B, D, E> SessionControl for RideSession<I, R, B, D, E>
where
    I: TripInstant,
    R: RandomSource,
    B: AudioBackend,
    D: Collaborators,
    E: GeoFenceEscalation,
{
    type Instant = I;

    fn start(&mut self, now: I) -> Result<(), TripError> {
        RideSession::start(self, now)
    }

    fn drive(&mut self, now: I) -> usize {
        RideSession::drive(self, now)
    }

    fn acknowledge_deviation(&mut self, now: I) -> bool {
        RideSession::acknowledge_deviation(self, now)
    }

    fn sos(&mut self, action: SosAction, now: I) -> Result<SosState, SosRejection> {
        match action {
            SosAction::Press => self.sos_press(now),
            SosAction::Confirm => self.sos_confirm(now),
            SosAction::Cancel => self.sos_cancel(now),
        }
    }

    fn probe_route(&mut self, now: I) -> DeviationReport {
        RideSession::probe_route(self, now)
    }

    fn roadside(
        &mut self,
        kind: RoadsideKind,
        now: I,
    ) -> Result<RoadsideTicket, RoadsideRejection> {
        self.request_roadside(kind, now)
    }

    fn teardown(&mut self, now: I) -> bool {
        RideSession::teardown(self, now)
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            lifecycle: self.lifecycle(),
            trip: self.snapshot(),
            driver_eta: self.driver_eta(),
            sos: self.sos_state(),
            sos_alert: self.sos_alert(),
        }
    }
}

/// Command execution successes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome<I> {
    Started,
    Advanced { now: I, by: Duration, fired: usize },
    Acknowledged { cleared: bool },
    Sos(SosState),
    Probed(DeviationReport),
    Roadside(RoadsideTicket),
    Status(StatusSnapshot),
    TornDown { released: bool },
    /// `None` lists every command.
    Help(Option<&'static CommandSpec>),
}

impl<I> CommandOutcome<I> {
    /// Writes the console response, one or more lines without a trailing newline.
    pub fn write_response<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        match self {
            CommandOutcome::Started => writer.write_str("ok trip started"),
            CommandOutcome::Advanced { by, fired, .. } => {
                write!(writer, "ok advanced {}ms timers={fired}", by.as_millis())
            }
            CommandOutcome::Acknowledged { cleared: true } => {
                writer.write_str("ok deviation acknowledged")
            }
            CommandOutcome::Acknowledged { cleared: false } => {
                writer.write_str("ok nothing to acknowledge")
            }
            CommandOutcome::Sos(state) => write!(writer, "ok sos {state}"),
            CommandOutcome::Probed(report) if report.is_deviated => write!(
                writer,
                "ok probe deviated {}m",
                report.deviation_distance_m
            ),
            CommandOutcome::Probed(_) => writer.write_str("ok probe on-route"),
            CommandOutcome::Roadside(ticket) => write!(
                writer,
                "ok roadside {} {} eta={}min",
                ticket.id, ticket.provider, ticket.eta_minutes
            ),
            CommandOutcome::Status(snapshot) => {
                let formatter = StatusFormatter::new(snapshot);
                formatter.write_trip_line(writer)?;
                writer.write_char('\n')?;
                formatter.write_geofence_line(writer)?;
                writer.write_char('\n')?;
                formatter.write_sos_line(writer)
            }
            CommandOutcome::TornDown { released: true } => writer.write_str("ok torn down"),
            CommandOutcome::TornDown { released: false } => {
                writer.write_str("ok already torn down")
            }
            CommandOutcome::Help(Some(spec)) => write!(writer, "{}  {}", spec.usage, spec.summary),
            CommandOutcome::Help(None) => {
                for (index, spec) in catalog::commands().iter().enumerate() {
                    if index > 0 {
                        writer.write_char('\n')?;
                    }
                    write!(writer, "{:<28}{}", spec.usage, spec.summary)?;
                }
                Ok(())
            }
        }
    }
}

/// Errors surfaced while executing a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    Trip(TripError),
    Sos(SosRejection),
    Roadside(RoadsideRejection),
    UnknownTopic(&'a str),
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(error) => write!(f, "parse error: {error}"),
            CommandError::Trip(error) => write!(f, "rejected: {error}"),
            CommandError::Sos(error) => write!(f, "ignored: {error}"),
            CommandError::Roadside(error) => write!(f, "rejected: {error}"),
            CommandError::UnknownTopic(topic) => write!(f, "no help for `{topic}`"),
        }
    }
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl From<TripError> for CommandError<'_> {
    fn from(error: TripError) -> Self {
        Self::Trip(error)
    }
}

impl From<SosRejection> for CommandError<'_> {
    fn from(error: SosRejection) -> Self {
        Self::Sos(error)
    }
}

impl From<RoadsideRejection> for CommandError<'_> {
    fn from(error: RoadsideRejection) -> Self {
        Self::Roadside(error)
    }
}

type CommandResult<'a, S> = Result<CommandOutcome<<S as SessionControl>::Instant>, CommandError<'a>>;

/// Applies console commands to a session on a simulated clock.
pub struct CommandExecutor<S: SessionControl> {
    session: S,
    now: S::Instant,
}

impl<S: SessionControl> CommandExecutor<S> {
    /// Creates an executor whose clock starts at `epoch`.
    #[must_use]
    pub const fn new(session: S, epoch: S::Instant) -> Self {
        Self {
            session,
            now: epoch,
        }
    }

    /// Current simulated instant.
    #[must_use]
    pub const fn now(&self) -> S::Instant {
        self.now
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Consumes the executor and yields the session.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.session
    }

    /// Parses and executes a console line.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] for unparsable lines and for inputs the
    /// session rejects.
    pub fn execute<'a>(&mut self, line: &'a str) -> CommandResult<'a, S> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    /// Executes an already parsed command.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn dispatch<'a>(&mut self, command: Command<'a>) -> CommandResult<'a, S> {
        let now = self.now;
        match command {
            Command::Start => {
                self.session.start(now)?;
                Ok(CommandOutcome::Started)
            }
            Command::Advance(by) => {
                self.now = now + by;
                let fired = self.session.drive(self.now);
                Ok(CommandOutcome::Advanced {
                    now: self.now,
                    by,
                    fired,
                })
            }
            Command::Ack => Ok(CommandOutcome::Acknowledged {
                cleared: self.session.acknowledge_deviation(now),
            }),
            Command::Sos(action) => Ok(CommandOutcome::Sos(self.session.sos(action, now)?)),
            Command::Probe => Ok(CommandOutcome::Probed(self.session.probe_route(now))),
            Command::Roadside(kind) => {
                Ok(CommandOutcome::Roadside(self.session.roadside(kind, now)?))
            }
            Command::Status => Ok(CommandOutcome::Status(self.session.status())),
            Command::Teardown => Ok(CommandOutcome::TornDown {
                released: self.session.teardown(now),
            }),
            Command::Help(help) => match help.topic {
                None => Ok(CommandOutcome::Help(None)),
                Some(topic) => catalog::find(topic)
                    .map(|spec| CommandOutcome::Help(Some(spec)))
                    .ok_or(CommandError::UnknownTopic(topic)),
            },
        }
    }
}
