//! Tone value objects and the two shipped alert profiles.

use core::fmt;
use core::time::Duration;

/// Tone frequency stored in millihertz.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Frequency(u32);

impl Frequency {
    #[must_use]
    pub const fn from_millihertz(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn from_hertz(value: u32) -> Self {
        Self(value * 1_000)
    }

    #[must_use]
    pub const fn millihertz(self) -> u32 {
        self.0
    }

    /// Frequency rounded to the nearest whole hertz.
    #[must_use]
    pub const fn rounded_hertz(self) -> u32 {
        (self.0 + 500) / 1_000
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1_000;
        let fraction = self.0 % 1_000;
        if fraction == 0 {
            write!(f, "{whole}Hz")
        } else {
            write!(f, "{whole}.{fraction:03}Hz")
        }
    }
}

/// Linear gain stored in thousandths of full scale.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Gain(u16);

impl Gain {
    pub const SILENT: Gain = Gain(0);
    pub const FULL: Gain = Gain(1_000);

    /// Builds a gain, saturating at full scale.
    #[must_use]
    pub const fn from_permille(value: u16) -> Self {
        if value > 1_000 { Self(1_000) } else { Self(value) }
    }

    #[must_use]
    pub const fn permille(self) -> u16 {
        self.0
    }
}

/// Oscillator shape.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
}

/// Amplitude envelope applied to every tone of a profile.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Envelope {
    /// Starts at `from` and decays exponentially to `to` over the tone.
    ExponentialDecay { from: Gain, to: Gain },
    /// Ramps linearly to `peak` over `ramp`, holds, then ramps back to silence.
    AttackRelease { peak: Gain, ramp: Duration },
}

impl Envelope {
    /// Gain at `elapsed` into a tone lasting `duration`.
    ///
    /// The exponential curve is approximated piecewise-linearly across
    /// halvings so the computation stays in integer arithmetic.
    #[must_use]
    pub fn gain_at(&self, elapsed: Duration, duration: Duration) -> Gain {
        if elapsed >= duration {
            return match self {
                Envelope::ExponentialDecay { to, .. } => *to,
                Envelope::AttackRelease { .. } => Gain::SILENT,
            };
        }

        match *self {
            Envelope::ExponentialDecay { from, to } => {
                decay_gain(from, to, elapsed.as_micros(), duration.as_micros())
            }
            Envelope::AttackRelease { peak, ramp } => {
                let remaining = duration - elapsed;
                let ramp_us = ramp.as_micros().max(1);
                let level = if elapsed < ramp {
                    elapsed.as_micros() * u128::from(peak.0) / ramp_us
                } else if remaining < ramp {
                    remaining.as_micros() * u128::from(peak.0) / ramp_us
                } else {
                    u128::from(peak.0)
                };
                Gain(u16::try_from(level).unwrap_or(peak.0))
            }
        }
    }
}

fn decay_gain(from: Gain, to: Gain, elapsed_us: u128, total_us: u128) -> Gain {
    if from.0 <= to.0 || total_us == 0 {
        return from;
    }

    // Count halvings between the endpoints, then walk them linearly.
    let mut steps = 0u128;
    let mut level = from.0;
    while level / 2 > to.0 {
        level /= 2;
        steps += 1;
    }
    let steps = steps + 1;

    let position = elapsed_us * steps;
    let segment = position / total_us;
    let within = position % total_us;

    let mut upper = from.0;
    for _ in 0..segment {
        upper = (upper / 2).max(to.0);
    }
    let lower = (upper / 2).max(to.0);
    let drop = u128::from(upper - lower) * within / total_us;
    Gain(upper - u16::try_from(drop).unwrap_or(upper - lower))
}

/// Single scheduled tone relative to the start of its alert.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AlertTone {
    pub frequency: Frequency,
    pub start_offset: Duration,
    pub duration: Duration,
}

impl AlertTone {
    #[must_use]
    pub const fn new(frequency: Frequency, start_offset: Duration, duration: Duration) -> Self {
        Self {
            frequency,
            start_offset,
            duration,
        }
    }

    /// Offset at which the tone stops sounding.
    #[must_use]
    pub fn end_offset(&self) -> Duration {
        self.start_offset + self.duration
    }
}

/// The two alert kinds the emitter can play.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertKind {
    DeviationChime,
    SosSiren,
}

impl AlertKind {
    #[must_use]
    pub const fn profile(self) -> &'static ToneProfile {
        match self {
            AlertKind::DeviationChime => &DEVIATION_CHIME,
            AlertKind::SosSiren => &SOS_SIREN,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::DeviationChime => f.write_str("deviation-chime"),
            AlertKind::SosSiren => f.write_str("sos-siren"),
        }
    }
}

/// Complete description of an alert sound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ToneProfile {
    pub kind: AlertKind,
    pub waveform: Waveform,
    pub envelope: Envelope,
    pub tones: &'static [AlertTone],
}

impl ToneProfile {
    /// Time from the first tone starting to the last tone ending.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.tones
            .iter()
            .map(AlertTone::end_offset)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

/// C5, the deviation chime pitch.
pub const CHIME_FREQUENCY: Frequency = Frequency::from_millihertz(523_250);
pub const CHIME_DURATION: Duration = Duration::from_millis(500);
pub const CHIME_START_GAIN: Gain = Gain::from_permille(300);
pub const CHIME_END_GAIN: Gain = Gain::from_permille(10);

pub const SIREN_HIGH: Frequency = Frequency::from_hertz(880);
pub const SIREN_LOW: Frequency = Frequency::from_hertz(660);
pub const SIREN_PAIRS: usize = 6;
pub const SIREN_PEAK_GAIN: Gain = Gain::from_permille(300);
pub const SIREN_RAMP: Duration = Duration::from_millis(10);

const SIREN_TONE_MS: u64 = 150;
const SIREN_PAIR_PERIOD_MS: u64 = 300;
pub const SIREN_TONE: Duration = Duration::from_millis(SIREN_TONE_MS);
pub const SIREN_PAIR_PERIOD: Duration = Duration::from_millis(SIREN_PAIR_PERIOD_MS);

const CHIME_TONES: [AlertTone; 1] = [AlertTone::new(
    CHIME_FREQUENCY,
    Duration::ZERO,
    CHIME_DURATION,
)];

const fn siren_tones() -> [AlertTone; SIREN_PAIRS * 2] {
    let mut tones = [AlertTone::new(SIREN_HIGH, Duration::ZERO, SIREN_TONE); SIREN_PAIRS * 2];
    let mut index = 0;
    let mut base_ms = 0;
    while index < tones.len() {
        tones[index] = AlertTone::new(SIREN_HIGH, Duration::from_millis(base_ms), SIREN_TONE);
        tones[index + 1] = AlertTone::new(
            SIREN_LOW,
            Duration::from_millis(base_ms + SIREN_TONE_MS),
            SIREN_TONE,
        );
        index += 2;
        base_ms += SIREN_PAIR_PERIOD_MS;
    }
    tones
}

const SIREN_TONES: [AlertTone; SIREN_PAIRS * 2] = siren_tones();

/// Single decaying sine blip played when the vehicle leaves the geo-fence.
pub const DEVIATION_CHIME: ToneProfile = ToneProfile {
    kind: AlertKind::DeviationChime,
    waveform: Waveform::Sine,
    envelope: Envelope::ExponentialDecay {
        from: CHIME_START_GAIN,
        to: CHIME_END_GAIN,
    },
    tones: &CHIME_TONES,
};

/// Two-tone square wave siren played when an SOS is confirmed.
pub const SOS_SIREN: ToneProfile = ToneProfile {
    kind: AlertKind::SosSiren,
    waveform: Waveform::Square,
    envelope: Envelope::AttackRelease {
        peak: SIREN_PEAK_GAIN,
        ramp: SIREN_RAMP,
    },
    tones: &SIREN_TONES,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_one_decaying_sine() {
        assert_eq!(DEVIATION_CHIME.tones.len(), 1);
        assert_eq!(DEVIATION_CHIME.waveform, Waveform::Sine);
        assert_eq!(DEVIATION_CHIME.total_duration(), Duration::from_millis(500));

        let mut rendered: heapless::String<16> = heapless::String::new();
        fmt::write(&mut rendered, format_args!("{CHIME_FREQUENCY}")).expect("fits");
        assert_eq!(rendered.as_str(), "523.250Hz");
    }

    #[test]
    fn siren_alternates_high_and_low() {
        assert_eq!(SOS_SIREN.tones.len(), 12);
        assert_eq!(SOS_SIREN.total_duration(), Duration::from_millis(1_800));

        for (index, tone) in SOS_SIREN.tones.iter().enumerate() {
            let expected = if index % 2 == 0 { SIREN_HIGH } else { SIREN_LOW };
            assert_eq!(tone.frequency, expected);
            assert_eq!(tone.duration, SIREN_TONE);
            let step = u64::try_from(index).expect("index fits");
            assert_eq!(tone.start_offset, Duration::from_millis(150 * step));
        }
    }

    #[test]
    fn attack_release_envelope_ramps_at_both_ends() {
        let envelope = SOS_SIREN.envelope;
        let tone = SIREN_TONE;
        assert_eq!(envelope.gain_at(Duration::ZERO, tone), Gain::SILENT);
        assert_eq!(envelope.gain_at(Duration::from_millis(5), tone).permille(), 150);
        assert_eq!(envelope.gain_at(Duration::from_millis(75), tone), SIREN_PEAK_GAIN);
        assert_eq!(envelope.gain_at(Duration::from_millis(145), tone).permille(), 150);
        assert_eq!(envelope.gain_at(tone, tone), Gain::SILENT);
    }

    #[test]
    fn decay_envelope_is_monotonic_between_endpoints() {
        let envelope = DEVIATION_CHIME.envelope;
        let mut previous = envelope.gain_at(Duration::ZERO, CHIME_DURATION);
        assert_eq!(previous, CHIME_START_GAIN);

        for ms in (10..=500).step_by(10) {
            let gain = envelope.gain_at(Duration::from_millis(ms), CHIME_DURATION);
            assert!(gain <= previous, "gain rose at {ms}ms");
            assert!(gain >= CHIME_END_GAIN);
            previous = gain;
        }
        assert_eq!(previous, CHIME_END_GAIN);
    }
}
