//! Event catalog and the fixed-size ring that records a session's history.
//!
//! Every observable transition (phase changes, alerts, SOS steps, audio
//! faults) lands here with a monotonically increasing id so the firmware and
//! the emulator can mirror new entries to their own log sinks.

use core::fmt;

use heapless::HistoryBuf;

use crate::alert::{AlertKind, AudioFault};
use crate::dispatch::{DispatchError, RoadsideKind, RoadsideTicketId, SosAlertId};
use crate::phases::TripPhase;
use crate::trip::GeoFenceStatus;

/// Monotonic identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of events retained in memory.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Everything a session can report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TripEventKind {
    TripStarted,
    PhaseEntered(TripPhase),
    DriverEta { minutes: u16 },
    SpeedAlertRaised { speed_kmh: u16 },
    SpeedAlertCleared,
    DeviationDetected { distance_m: u32 },
    GeoFenceEscalated(GeoFenceStatus),
    DeviationAcknowledged,
    TripCompleted,
    AlertPlayed(AlertKind),
    AlertDegraded(AlertKind, AudioFault),
    SosRequested,
    SosConfirmed,
    SosDispatched(SosAlertId),
    SosDispatchFailed(DispatchError),
    SosCancelled,
    SosResolved,
    RouteProbed { deviated: bool, distance_m: u32 },
    RoadsideBooked { id: RoadsideTicketId, eta_minutes: u16 },
    RoadsideFailed(RoadsideKind, DispatchError),
    TornDown,
}

impl fmt::Display for TripEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripEventKind::TripStarted => f.write_str("trip-started"),
            TripEventKind::PhaseEntered(phase) => write!(f, "phase-entered {phase}"),
            TripEventKind::DriverEta { minutes } => write!(f, "driver-eta {minutes}min"),
            TripEventKind::SpeedAlertRaised { speed_kmh } => {
                write!(f, "speed-alert-raised {speed_kmh}kmh")
            }
            TripEventKind::SpeedAlertCleared => f.write_str("speed-alert-cleared"),
            TripEventKind::DeviationDetected { distance_m } => {
                write!(f, "deviation-detected {distance_m}m")
            }
            TripEventKind::GeoFenceEscalated(status) => write!(f, "geofence-escalated {status}"),
            TripEventKind::DeviationAcknowledged => f.write_str("deviation-acknowledged"),
            TripEventKind::TripCompleted => f.write_str("trip-completed"),
            TripEventKind::AlertPlayed(kind) => write!(f, "alert-played {kind}"),
            TripEventKind::AlertDegraded(kind, fault) => {
                write!(f, "alert-degraded {kind} {fault}")
            }
            TripEventKind::SosRequested => f.write_str("sos-requested"),
            TripEventKind::SosConfirmed => f.write_str("sos-confirmed"),
            TripEventKind::SosDispatched(id) => write!(f, "sos-dispatched {id}"),
            TripEventKind::SosDispatchFailed(error) => write!(f, "sos-dispatch-failed {error}"),
            TripEventKind::SosCancelled => f.write_str("sos-cancelled"),
            TripEventKind::SosResolved => f.write_str("sos-resolved"),
            TripEventKind::RouteProbed {
                deviated,
                distance_m,
            } => {
                if *deviated {
                    write!(f, "route-probed deviated {distance_m}m")
                } else {
                    f.write_str("route-probed on-route")
                }
            }
            TripEventKind::RoadsideBooked { id, eta_minutes } => {
                write!(f, "roadside-booked {id} eta={eta_minutes}min")
            }
            TripEventKind::RoadsideFailed(kind, error) => {
                write!(f, "roadside-failed {kind} {error}")
            }
            TripEventKind::TornDown => f.write_str("torn-down"),
        }
    }
}

/// Entry stored in the event ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord<I: Copy> {
    pub id: EventId,
    pub timestamp: I,
    pub event: TripEventKind,
}

/// Sink for events produced while driving a trip.
///
/// The controller only needs to push events; the session decides where they
/// go.
pub trait EventSink<I> {
    fn record(&mut self, event: TripEventKind, timestamp: I) -> EventId;
}

/// Fixed-capacity ring of the most recent events.
pub struct EventLog<I: Copy, const CAPACITY: usize = EVENT_LOG_CAPACITY> {
    ring: HistoryBuf<EventRecord<I>, CAPACITY>,
    next_event_id: EventId,
}

impl<I: Copy, const CAPACITY: usize> EventLog<I, CAPACITY> {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Iterates retained records in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> impl Iterator<Item = &EventRecord<I>> {
        self.ring.oldest_ordered()
    }

    /// Iterates retained records whose id is at least `first`.
    ///
    /// Log mirrors keep the id after the last record they printed and pass it
    /// back in here.
    #[must_use]
    pub fn since(&self, first: EventId) -> impl Iterator<Item = &EventRecord<I>> {
        self.oldest_first().filter(move |record| record.id >= first)
    }

    /// Returns the most recent record, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&EventRecord<I>> {
        self.ring.recent()
    }

    /// Id that the next recorded event will receive.
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Returns `true` when any retained record matches `event`.
    #[must_use]
    pub fn contains(&self, event: &TripEventKind) -> bool {
        self.oldest_first().any(|record| record.event == *event)
    }

    /// Number of retained records matching `predicate`.
    #[must_use]
    pub fn count_matching(&self, predicate: impl Fn(&TripEventKind) -> bool) -> usize {
        self.oldest_first()
            .filter(|record| predicate(&record.event))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<I: Copy, const CAPACITY: usize> EventSink<I> for EventLog<I, CAPACITY> {
    fn record(&mut self, event: TripEventKind, timestamp: I) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(EventRecord {
            id,
            timestamp,
            event,
        });
        id
    }
}

impl<I: Copy, const CAPACITY: usize> Default for EventLog<I, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_keeps_the_newest_records() {
        let mut log: EventLog<u32, 4> = EventLog::new();
        for step in 0..6 {
            log.record(TripEventKind::SpeedAlertCleared, step);
        }

        assert_eq!(log.len(), 4);
        let ids: heapless::Vec<EventId, 4> = log.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
        assert_eq!(log.latest().map(|record| record.timestamp), Some(5));
        assert_eq!(log.next_id(), 6);
    }

    #[test]
    fn since_skips_already_mirrored_records() {
        let mut log: EventLog<u32> = EventLog::new();
        log.record(TripEventKind::TripStarted, 0);
        let cursor = log.next_id();
        log.record(TripEventKind::PhaseEntered(TripPhase::OnWay), 3);

        let fresh: heapless::Vec<TripEventKind, 4> =
            log.since(cursor).map(|record| record.event).collect();
        assert_eq!(fresh.as_slice(), &[TripEventKind::PhaseEntered(TripPhase::OnWay)]);
    }

    #[test]
    fn display_uses_stable_tags() {
        let mut line: heapless::String<48> = heapless::String::new();
        fmt::write(
            &mut line,
            format_args!("{}", TripEventKind::DeviationDetected { distance_m: 250 }),
        )
        .expect("fits");
        assert_eq!(line.as_str(), "deviation-detected 250m");

        line.clear();
        fmt::write(
            &mut line,
            format_args!(
                "{}",
                TripEventKind::AlertDegraded(AlertKind::SosSiren, AudioFault::Unavailable)
            ),
        )
        .expect("fits");
        assert_eq!(line.as_str(), "alert-degraded sos-siren audio-unavailable");
    }
}
