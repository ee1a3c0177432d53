//! External collaborators consulted by a ride session, with mock responders.
//!
//! Real deployments would back these with network services. The shipped
//! responders answer immediately with canned data so the beacon and the
//! emulator can exercise the full flow offline.

use core::fmt;
use core::ops::RangeInclusive;

use crate::random::RandomSource;

/// WGS-84 coordinate stored in microdegrees.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GeoPoint {
    pub lat_micro: i32,
    pub lon_micro: i32,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat_micro: i32, lon_micro: i32) -> Self {
        Self {
            lat_micro,
            lon_micro,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_degrees(f, self.lat_micro)?;
        f.write_str(",")?;
        write_degrees(f, self.lon_micro)
    }
}

fn write_degrees(f: &mut fmt::Formatter<'_>, micro: i32) -> fmt::Result {
    let sign = if micro < 0 { "-" } else { "" };
    let magnitude = micro.unsigned_abs();
    write!(f, "{sign}{}.{:06}", magnitude / 1_000_000, magnitude % 1_000_000)
}

/// Pickup point used by the demo session (Connaught Place, New Delhi).
pub const DEMO_PICKUP: GeoPoint = GeoPoint::new(28_631_500, 77_216_700);
/// Drop-off point used by the demo session (India Gate, New Delhi).
pub const DEMO_DROPOFF: GeoPoint = GeoPoint::new(28_612_900, 77_229_500);
/// Safe corridor between the demo pickup and drop-off.
pub const DEMO_ROUTE: [GeoPoint; 2] = [DEMO_PICKUP, DEMO_DROPOFF];

/// Who raised an SOS.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Driver,
    Passenger,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Driver => f.write_str("driver"),
            Role::Passenger => f.write_str("passenger"),
        }
    }
}

/// Payload sent to the emergency responder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SosRequest {
    pub position: GeoPoint,
    pub role: Role,
}

/// Identifier handed back by the emergency responder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SosAlertId(pub u32);

impl fmt::Display for SosAlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SOS-{:04}", self.0)
    }
}

/// Collaborator failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatchError {
    Unreachable,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unreachable => f.write_str("responder-unreachable"),
        }
    }
}

/// Estimated arrival of the assigned driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DriverEta {
    pub minutes: u16,
}

impl fmt::Display for DriverEta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes == 1 {
            f.write_str("Arriving in 1 minute")
        } else {
            write!(f, "Arriving in {} minutes", self.minutes)
        }
    }
}

/// Answer from a route-deviation check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviationReport {
    pub is_deviated: bool,
    pub deviation_distance_m: u32,
}

impl DeviationReport {
    pub const ON_ROUTE: DeviationReport = DeviationReport {
        is_deviated: false,
        deviation_distance_m: 0,
    };
}

/// Driver-side dispatch.
pub trait DriverDispatch {
    fn driver_eta(&mut self) -> DriverEta;
}

/// Emergency responder.
pub trait SosDispatch {
    /// Sends an emergency request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unreachable`] when the responder cannot be reached.
    fn send_sos(&mut self, request: &SosRequest) -> Result<SosAlertId, DispatchError>;
}

/// Roadside help a driver can call in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoadsideKind {
    /// Flat or burst tyre.
    Tyre,
    /// Any other breakdown; routed to a nearby mechanic.
    Mechanic,
}

impl fmt::Display for RoadsideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadsideKind::Tyre => f.write_str("tyre"),
            RoadsideKind::Mechanic => f.write_str("mechanic"),
        }
    }
}

/// Payload sent to the roadside service.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoadsideRequest {
    pub kind: RoadsideKind,
    pub position: GeoPoint,
}

/// Identifier handed back by the roadside service.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoadsideTicketId {
    pub kind: RoadsideKind,
    pub number: u32,
}

impl fmt::Display for RoadsideTicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RoadsideKind::Tyre => write!(f, "TYRE-{:04}", self.number),
            RoadsideKind::Mechanic => write!(f, "REQ-{:04}", self.number),
        }
    }
}

/// Accepted roadside request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoadsideTicket {
    pub id: RoadsideTicketId,
    pub provider: &'static str,
    pub eta_minutes: u16,
}

/// Tyre and breakdown service for drivers.
pub trait RoadsideDispatch {
    /// Books help at the request's position.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unreachable`] when the service cannot be reached.
    fn request_roadside(&mut self, request: &RoadsideRequest)
    -> Result<RoadsideTicket, DispatchError>;
}

/// Compares a position against the agreed safe route.
pub trait RouteDeviationCheck {
    fn check(&mut self, position: GeoPoint, route: &[GeoPoint]) -> DeviationReport;
}

/// Everything a session needs from the outside world.
pub trait Collaborators:
    DriverDispatch + SosDispatch + RoadsideDispatch + RouteDeviationCheck
{
}

impl<T: DriverDispatch + SosDispatch + RoadsideDispatch + RouteDeviationCheck> Collaborators
    for T
{
}

/// Canned driver ETA.
pub const MOCK_DRIVER_ETA: DriverEta = DriverEta { minutes: 3 };
/// Chance, in percent, that the random stub reports a deviation.
pub const STUB_DEVIATION_PERCENT: u32 = 20;
/// Distances the random stub reports when it does.
pub const STUB_DEVIATION_RANGE: RangeInclusive<u32> = 100..=599;

/// Tyre service every tyre request is routed to.
pub const TYRE_SERVICE: &str = "24x7 Tyre Service";
/// Quoted arrival of the tyre service.
pub const TYRE_SERVICE_ETA_MINUTES: u16 = 12;

/// Mechanic listed near the demo route.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mechanic {
    pub name: &'static str,
    pub eta_minutes: u16,
}

/// Mechanics the mock picks from at random.
pub const MOCK_MECHANICS: [Mechanic; 4] = [
    Mechanic {
        name: "Ramesh Gupta",
        eta_minutes: 8,
    },
    Mechanic {
        name: "Sanjay Mehta",
        eta_minutes: 5,
    },
    Mechanic {
        name: "Kamal Singh",
        eta_minutes: 12,
    },
    Mechanic {
        name: "Prakash Kumar",
        eta_minutes: 10,
    },
];

/// Offline responders backed by a random source.
pub struct MockResponders<R> {
    rng: R,
    eta: DriverEta,
    next_sos: u32,
    next_roadside: u32,
    reachable: bool,
}

impl<R: RandomSource> MockResponders<R> {
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self {
            rng,
            eta: MOCK_DRIVER_ETA,
            next_sos: 1,
            next_roadside: 1,
            reachable: true,
        }
    }

    /// Overrides the canned ETA.
    #[must_use]
    pub const fn with_eta(mut self, eta: DriverEta) -> Self {
        self.eta = eta;
        self
    }

    /// Makes the emergency and roadside services fail until re-enabled.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }
}

impl<R: RandomSource> DriverDispatch for MockResponders<R> {
    fn driver_eta(&mut self) -> DriverEta {
        self.eta
    }
}

impl<R: RandomSource> SosDispatch for MockResponders<R> {
    fn send_sos(&mut self, _request: &SosRequest) -> Result<SosAlertId, DispatchError> {
        if !self.reachable {
            return Err(DispatchError::Unreachable);
        }

        let id = SosAlertId(self.next_sos);
        self.next_sos = self.next_sos.wrapping_add(1);
        Ok(id)
    }
}

impl<R: RandomSource> RoadsideDispatch for MockResponders<R> {
    fn request_roadside(
        &mut self,
        request: &RoadsideRequest,
    ) -> Result<RoadsideTicket, DispatchError> {
        if !self.reachable {
            return Err(DispatchError::Unreachable);
        }

        let (provider, eta_minutes) = match request.kind {
            RoadsideKind::Tyre => (TYRE_SERVICE, TYRE_SERVICE_ETA_MINUTES),
            RoadsideKind::Mechanic => {
                let last = u32::try_from(MOCK_MECHANICS.len() - 1).unwrap_or(0);
                let pick = usize::try_from(self.rng.next_in_range(0..=last)).unwrap_or(0);
                let mechanic = MOCK_MECHANICS.get(pick).unwrap_or(&MOCK_MECHANICS[0]);
                (mechanic.name, mechanic.eta_minutes)
            }
        };

        let id = RoadsideTicketId {
            kind: request.kind,
            number: self.next_roadside,
        };
        self.next_roadside = self.next_roadside.wrapping_add(1);
        Ok(RoadsideTicket {
            id,
            provider,
            eta_minutes,
        })
    }
}

impl<R: RandomSource> RouteDeviationCheck for MockResponders<R> {
    fn check(&mut self, _position: GeoPoint, _route: &[GeoPoint]) -> DeviationReport {
        if self.rng.next_in_range(0..=99) >= STUB_DEVIATION_PERCENT {
            return DeviationReport::ON_ROUTE;
        }

        DeviationReport {
            is_deviated: true,
            deviation_distance_m: self.rng.next_in_range(STUB_DEVIATION_RANGE),
        }
    }
}
