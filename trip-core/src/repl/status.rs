//! Shared status surface for the console.
//!
//! [`StatusSnapshot`] gathers the observable trip, geo-fence and SOS state in
//! one `Copy` value; [`StatusFormatter`] renders it the same way on every
//! front-end.

use core::fmt;

use crate::dispatch::{DriverEta, SosAlertId};
use crate::sos::SosState;
use crate::trip::{Lifecycle, TripState};

/// Everything the `status` command prints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub lifecycle: Lifecycle,
    pub trip: Option<TripState>,
    pub driver_eta: Option<DriverEta>,
    pub sos: SosState,
    pub sos_alert: Option<SosAlertId>,
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the trip line (e.g. `trip phase=in-progress progress=42% speed=48kmh overspeed=off`).
    pub fn write_trip_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(trip) = self.snapshot.trip else {
            return write!(writer, "trip {}", self.snapshot.lifecycle);
        };

        write!(
            writer,
            "trip phase={} progress={}% speed={}kmh overspeed={}",
            trip.phase,
            trip.progress_percent,
            trip.current_speed_kmh,
            on_off(trip.speed_alert_active),
        )?;

        if let Some(eta) = self.snapshot.driver_eta {
            write!(writer, " eta={}min", eta.minutes)?;
        }
        Ok(())
    }

    /// Writes the geo-fence line (e.g. `geofence status=warning deviation=250m alert=visible`).
    pub fn write_geofence_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(trip) = self.snapshot.trip else {
            return writer.write_str("geofence n/a");
        };

        write!(
            writer,
            "geofence status={} deviation={}m alert={}",
            trip.geo_fence_status,
            trip.deviation_distance_m,
            if trip.deviation_alert_visible {
                "visible"
            } else {
                "hidden"
            },
        )
    }

    /// Writes the SOS line (e.g. `sos state=active alert=SOS-0001`).
    pub fn write_sos_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "sos state={}", self.snapshot.sos)?;
        match self.snapshot.sos_alert {
            Some(id) => write!(writer, " alert={id}"),
            None => writer.write_str(" alert=none"),
        }
    }
}

#[cfg(feature = "alloc")]
impl StatusFormatter<'_> {
    /// Renders all three lines separated by `\n`.
    #[must_use]
    pub fn render(&self) -> alloc::string::String {
        use core::fmt::Write as _;

        let mut text = alloc::string::String::new();
        // Writing into a `String` cannot fail.
        let _ = self.write_trip_line(&mut text);
        text.push('\n');
        let _ = self.write_geofence_line(&mut text);
        text.push('\n');
        let _ = self.write_sos_line(&mut text);
        text
    }
}

const fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::TripPhase;
    use crate::trip::GeoFenceStatus;
    use heapless::String;

    fn riding() -> StatusSnapshot {
        StatusSnapshot {
            lifecycle: Lifecycle::Running,
            trip: Some(TripState {
                phase: TripPhase::InProgress,
                progress_percent: 42,
                current_speed_kmh: 57,
                geo_fence_status: GeoFenceStatus::Warning,
                deviation_distance_m: 250,
                speed_alert_active: true,
                deviation_alert_visible: true,
            }),
            driver_eta: Some(DriverEta { minutes: 3 }),
            sos: SosState::Active,
            sos_alert: Some(SosAlertId(1)),
        }
    }

    #[test]
    fn renders_every_line() {
        let snapshot = riding();
        let formatter = StatusFormatter::new(&snapshot);
        let mut line: String<96> = String::new();

        formatter.write_trip_line(&mut line).expect("fits");
        assert_eq!(
            line.as_str(),
            "trip phase=in-progress progress=42% speed=57kmh overspeed=on eta=3min"
        );

        line.clear();
        formatter.write_geofence_line(&mut line).expect("fits");
        assert_eq!(
            line.as_str(),
            "geofence status=warning deviation=250m alert=visible"
        );

        line.clear();
        formatter.write_sos_line(&mut line).expect("fits");
        assert_eq!(line.as_str(), "sos state=active alert=SOS-0001");
    }

    #[test]
    fn torn_down_trip_reports_lifecycle_only() {
        let snapshot = StatusSnapshot {
            lifecycle: Lifecycle::TornDown,
            trip: None,
            driver_eta: None,
            sos: SosState::Idle,
            sos_alert: None,
        };
        let formatter = StatusFormatter::new(&snapshot);
        let mut line: String<32> = String::new();

        formatter.write_trip_line(&mut line).expect("fits");
        assert_eq!(line.as_str(), "trip torn-down");
        line.clear();
        formatter.write_geofence_line(&mut line).expect("fits");
        assert_eq!(line.as_str(), "geofence n/a");
    }
}
