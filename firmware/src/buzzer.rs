#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Piezo buzzer audio backend.
//!
//! The trip session schedules tones through [`BuzzerBackend`], which turns
//! each tone into a [`BuzzerNote`] and hands it to a [`NoteSink`]. On the
//! target the sink is the channel drained by the PWM buzzer task.

use core::time::Duration;

use trip_core::alert::{
    AlertKind, AlertTone, AudioBackend, AudioFault, Envelope, Frequency, Gain, ToneProfile,
};

/// Notes the buzzer task can hold before the backend starts rejecting tones.
pub const NOTE_QUEUE_DEPTH: usize = 16;

/// Envelope update period used by the buzzer task.
pub const ENVELOPE_STEP: Duration = Duration::from_millis(10);

/// One scheduled tone, self-contained so the task never looks at profiles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BuzzerNote {
    pub kind: AlertKind,
    pub frequency: Frequency,
    pub envelope: Envelope,
    /// Offset from the start of the alert the tone belongs to.
    pub start_offset: Duration,
    pub duration: Duration,
}

impl BuzzerNote {
    #[must_use]
    pub fn new(profile: &ToneProfile, tone: &AlertTone) -> Self {
        Self {
            kind: profile.kind,
            frequency: tone.frequency,
            envelope: profile.envelope,
            start_offset: tone.start_offset,
            duration: tone.duration,
        }
    }

    /// PWM duty, in permille of the period, for `elapsed` into the note.
    #[must_use]
    pub fn duty_permille_at(&self, elapsed: Duration) -> u16 {
        duty_permille(self.envelope.gain_at(elapsed, self.duration))
    }
}

/// Maps a gain onto a square-wave duty cycle.
///
/// A piezo is loudest at 50 % duty, so full gain maps to 500 ‰.
#[must_use]
pub const fn duty_permille(gain: Gain) -> u16 {
    gain.permille() / 2
}

/// Destination for notes produced by the backend.
pub trait NoteSink {
    /// Queues `note`, handing it back when there is no room.
    ///
    /// # Errors
    ///
    /// Returns the rejected note when the queue is full.
    fn try_push(&mut self, note: BuzzerNote) -> Result<(), BuzzerNote>;

    /// Drops every queued note.
    fn clear(&mut self);
}

/// Channel drained by the PWM buzzer task.
pub type NoteChannel = embassy_sync::channel::Channel<
    embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
    BuzzerNote,
    NOTE_QUEUE_DEPTH,
>;

#[cfg(target_os = "none")]
impl NoteSink for &'static NoteChannel {
    fn try_push(&mut self, note: BuzzerNote) -> Result<(), BuzzerNote> {
        self.try_send(note).map_err(|error| match error {
            embassy_sync::channel::TrySendError::Full(note) => note,
        })
    }

    fn clear(&mut self) {
        NoteChannel::clear(*self);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum OutputState {
    Closed,
    Open,
    Released,
}

/// [`AudioBackend`] driving the beacon buzzer.
pub struct BuzzerBackend<S> {
    sink: S,
    state: OutputState,
}

impl<S: NoteSink> BuzzerBackend<S> {
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            state: OutputState::Closed,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == OutputState::Open
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: NoteSink> AudioBackend for BuzzerBackend<S> {
    fn open(&mut self) -> Result<(), AudioFault> {
        match self.state {
            OutputState::Released => Err(AudioFault::Released),
            OutputState::Closed | OutputState::Open => {
                self.state = OutputState::Open;
                Ok(())
            }
        }
    }

    fn is_suspended(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), AudioFault> {
        Ok(())
    }

    fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault> {
        if self.state != OutputState::Open {
            return Err(AudioFault::Released);
        }

        self.sink
            .try_push(BuzzerNote::new(profile, tone))
            .map_err(|_| AudioFault::ScheduleRejected)
    }

    fn close(&mut self) {
        self.sink.clear();
        self.state = OutputState::Released;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Deque;
    use trip_core::alert::{AlertEmitter, DEVIATION_CHIME, SOS_SIREN};

    #[derive(Default)]
    struct QueueSink(Deque<BuzzerNote, NOTE_QUEUE_DEPTH>);

    impl NoteSink for QueueSink {
        fn try_push(&mut self, note: BuzzerNote) -> Result<(), BuzzerNote> {
            self.0.push_back(note)
        }

        fn clear(&mut self) {
            self.0.clear();
        }
    }

    #[test]
    fn full_gain_is_half_duty() {
        assert_eq!(duty_permille(Gain::FULL), 500);
        assert_eq!(duty_permille(Gain::SILENT), 0);
        assert_eq!(duty_permille(Gain::from_permille(300)), 150);
    }

    #[test]
    fn chime_decays_over_its_note() {
        let tone = DEVIATION_CHIME.tones[0];
        let note = BuzzerNote::new(&DEVIATION_CHIME, &tone);
        assert_eq!(note.duty_permille_at(Duration::ZERO), 150);
        assert!(note.duty_permille_at(note.duration) <= 5);
        assert!(note.duty_permille_at(Duration::from_millis(250)) < 150);
    }

    #[test]
    fn siren_fills_the_queue_in_order() {
        let mut emitter = AlertEmitter::new(BuzzerBackend::new(QueueSink::default()));
        let outcome = emitter.play_sos_alarm();
        assert!(!outcome.is_degraded());

        let queued = &emitter.backend().sink().0;
        assert_eq!(queued.len(), SOS_SIREN.tones.len());
        let offsets: heapless::Vec<Duration, NOTE_QUEUE_DEPTH> =
            queued.iter().map(|note| note.start_offset).collect();
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn released_buzzer_rejects_and_drains() {
        let mut emitter = AlertEmitter::new(BuzzerBackend::new(QueueSink::default()));
        emitter.play_deviation_chime();
        assert!(emitter.release());

        assert!(emitter.backend().sink().0.is_empty());
        assert!(emitter.play_deviation_chime().is_degraded());
    }
}
