#![allow(dead_code)]

use core::ops::{Add, RangeInclusive};
use core::time::Duration;

use trip_core::alert::{AlertKind, AlertTone, AudioBackend, AudioFault, ToneProfile};
use trip_core::dispatch::MockResponders;
use trip_core::random::RandomSource;
use trip_core::session::{RideSession, SessionConfig};
use trip_core::time::TripInstant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(u64);

impl MockInstant {
    pub fn millis(value: u64) -> Self {
        Self(value * 1_000)
    }

    pub fn as_millis(self) -> u64 {
        self.0 / 1_000
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_micros()).expect("duration fits"))
    }
}

impl TripInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

/// Replays a fixed list of draws, clamped into the requested range.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    values: Vec<u32>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: &[u32]) -> Self {
        assert!(!values.is_empty());
        Self {
            values: values.to_vec(),
            cursor: 0,
        }
    }

    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(*range.start(), *range.end())
    }
}

#[derive(Default, Debug)]
pub struct RecordingBackend {
    pub opens: u32,
    pub closes: u32,
    pub fail_open: bool,
    pub scheduled: Vec<(AlertKind, AlertTone)>,
}

impl RecordingBackend {
    pub fn count(&self, kind: AlertKind) -> usize {
        self.scheduled
            .iter()
            .filter(|(scheduled, _)| *scheduled == kind)
            .count()
    }
}

impl AudioBackend for RecordingBackend {
    fn open(&mut self) -> Result<(), AudioFault> {
        if self.fail_open {
            return Err(AudioFault::Unavailable);
        }
        self.opens += 1;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), AudioFault> {
        Ok(())
    }

    fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault> {
        self.scheduled.push((profile.kind, *tone));
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

pub type TestSession =
    RideSession<MockInstant, ScriptedRandom, RecordingBackend, MockResponders<ScriptedRandom>>;

/// Passenger session whose speed draws come from `speeds`.
pub fn session(speeds: &[u32]) -> TestSession {
    RideSession::new(
        SessionConfig::PASSENGER,
        ScriptedRandom::new(speeds),
        RecordingBackend::default(),
        MockResponders::new(ScriptedRandom::new(&[99])),
    )
}
