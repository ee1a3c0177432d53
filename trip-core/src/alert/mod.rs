//! Alert emitter: owns the audio context and schedules tone profiles on it.
//!
//! The context is opened lazily on the first alert, reused by every alert
//! after that, and released exactly once (explicitly through
//! [`AlertEmitter::release`] or implicitly when the emitter is dropped).
//! Audio failures never abort the caller; they come back as
//! [`AlertOutcome::Degraded`] so the caller can log them and carry on with the
//! visual side of the alert.

use core::fmt;

pub mod tones;

pub use tones::{
    AlertKind, AlertTone, DEVIATION_CHIME, Envelope, Frequency, Gain, SOS_SIREN, ToneProfile,
    Waveform,
};

/// Reasons an audio operation could not complete.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AudioFault {
    /// The platform refused to create an audio context.
    Unavailable,
    /// A suspended context could not be resumed.
    ResumeFailed,
    /// The output rejected a tone (queue full, device gone).
    ScheduleRejected,
    /// The context has already been released.
    Released,
}

impl fmt::Display for AudioFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFault::Unavailable => f.write_str("audio-unavailable"),
            AudioFault::ResumeFailed => f.write_str("resume-failed"),
            AudioFault::ScheduleRejected => f.write_str("schedule-rejected"),
            AudioFault::Released => f.write_str("context-released"),
        }
    }
}

/// Platform audio output.
///
/// Implementations map an "audio context" onto whatever the target has: a PWM
/// buzzer on the beacon, a terminal renderer in the emulator, a recorder in
/// tests.
pub trait AudioBackend {
    /// Creates the underlying context.
    ///
    /// # Errors
    ///
    /// Returns [`AudioFault::Unavailable`] when no output can be created.
    fn open(&mut self) -> Result<(), AudioFault>;

    /// Returns `true` when the context exists but is not currently running.
    fn is_suspended(&self) -> bool;

    /// Resumes a suspended context.
    ///
    /// # Errors
    ///
    /// Returns [`AudioFault::ResumeFailed`] when the context stays suspended.
    fn resume(&mut self) -> Result<(), AudioFault>;

    /// Queues one tone of `profile`; offsets are relative to the call.
    ///
    /// # Errors
    ///
    /// Returns [`AudioFault::ScheduleRejected`] when the output cannot take the tone.
    fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault>;

    /// Releases the context. Called at most once per successful `open`.
    fn close(&mut self);
}

impl<B: AudioBackend + ?Sized> AudioBackend for &mut B {
    fn open(&mut self) -> Result<(), AudioFault> {
        (**self).open()
    }

    fn is_suspended(&self) -> bool {
        (**self).is_suspended()
    }

    fn resume(&mut self) -> Result<(), AudioFault> {
        (**self).resume()
    }

    fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault> {
        (**self).schedule(profile, tone)
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Result of asking the emitter to play an alert.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertOutcome {
    /// Every tone of the profile was scheduled.
    Played { kind: AlertKind, tones: usize },
    /// Audio could not be produced; the caller should keep going.
    Degraded { kind: AlertKind, fault: AudioFault },
}

impl AlertOutcome {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, AlertOutcome::Degraded { .. })
    }

    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        match self {
            AlertOutcome::Played { kind, .. } | AlertOutcome::Degraded { kind, .. } => *kind,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ContextState {
    Unopened,
    Open,
    Released,
}

/// Shared alert sink for the whole ride session.
pub struct AlertEmitter<B: AudioBackend> {
    backend: B,
    context: ContextState,
}

impl<B: AudioBackend> AlertEmitter<B> {
    /// Wraps `backend` without touching it; the context opens on first use.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            context: ContextState::Unopened,
        }
    }

    /// Plays the geo-fence deviation chime.
    pub fn play_deviation_chime(&mut self) -> AlertOutcome {
        self.play(AlertKind::DeviationChime)
    }

    /// Plays the SOS siren.
    pub fn play_sos_alarm(&mut self) -> AlertOutcome {
        self.play(AlertKind::SosSiren)
    }

    /// Schedules every tone of `kind`'s profile.
    pub fn play(&mut self, kind: AlertKind) -> AlertOutcome {
        match self.try_play(kind.profile()) {
            Ok(tones) => AlertOutcome::Played { kind, tones },
            Err(fault) => AlertOutcome::Degraded { kind, fault },
        }
    }

    fn try_play(&mut self, profile: &ToneProfile) -> Result<usize, AudioFault> {
        self.ensure_running()?;
        for tone in profile.tones {
            self.backend.schedule(profile, tone)?;
        }
        Ok(profile.tones.len())
    }

    fn ensure_running(&mut self) -> Result<(), AudioFault> {
        match self.context {
            ContextState::Released => return Err(AudioFault::Released),
            ContextState::Unopened => {
                // A failed open leaves the context unopened so the next alert retries.
                self.backend.open()?;
                self.context = ContextState::Open;
            }
            ContextState::Open => {}
        }

        if self.backend.is_suspended() {
            self.backend.resume()?;
        }
        Ok(())
    }

    /// Releases the audio context. Returns `true` only for the call that
    /// actually closed an open context.
    pub fn release(&mut self) -> bool {
        let was_open = self.context == ContextState::Open;
        if was_open {
            self.backend.close();
        }
        self.context = ContextState::Released;
        was_open
    }

    /// Returns `true` while a context is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.context == ContextState::Open
    }

    /// Returns `true` once [`release`](Self::release) has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.context == ContextState::Released
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> Drop for AlertEmitter<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{AlertTone, AudioBackend, AudioFault, ToneProfile};
    use heapless::Vec;

    /// Backend that records every call for assertions.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub opens: u32,
        pub closes: u32,
        pub resumes: u32,
        pub suspended: bool,
        pub fail_open: bool,
        pub fail_resume: bool,
        pub scheduled: Vec<(super::AlertKind, AlertTone), 64>,
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
            self.suspended
        }

        fn resume(&mut self) -> Result<(), AudioFault> {
            if self.fail_resume {
                return Err(AudioFault::ResumeFailed);
            }
            self.resumes += 1;
            self.suspended = false;
            Ok(())
        }

        fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault> {
            self.scheduled
                .push((profile.kind, *tone))
                .map_err(|_| AudioFault::ScheduleRejected)
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }
}
