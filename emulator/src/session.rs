use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::Add;
use std::path::PathBuf;
use std::time::Duration;

use trip_core::alert::{AlertKind, AlertTone, AudioBackend, AudioFault, ToneProfile};
use trip_core::dispatch::MockResponders;
use trip_core::events::EventId;
use trip_core::random::{DEFAULT_SEED, SeededRandom};
use trip_core::repl::commands::{CommandExecutor, CommandOutcome};
use trip_core::repl::completion::{CompletionEngine, Replacement};
use trip_core::session::{RideSession, SessionConfig};
use trip_core::time::TripInstant;

const EVIDENCE_DIR: &str = "evidence";

/// Simulated time since the session started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl SimInstant {
    pub const EPOCH: SimInstant = SimInstant(Duration::ZERO);

    #[must_use]
    pub fn since_epoch(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl TripInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Profile {
    Passenger,
    Driver,
}

impl Profile {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("passenger") {
            Ok(Self::Passenger)
        } else if tag.eq_ignore_ascii_case("driver") {
            Ok(Self::Driver)
        } else {
            Err(format!("Unknown profile `{tag}`"))
        }
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Profile::Passenger => "passenger",
            Profile::Driver => "driver",
        }
    }

    fn config(self) -> SessionConfig {
        match self {
            Profile::Passenger => SessionConfig::PASSENGER,
            Profile::Driver => SessionConfig::DRIVER,
        }
    }
}

/// Terminal stand-in for the audio context: tones are collected and printed
/// once the command that triggered them has finished.
#[derive(Debug, Default)]
pub struct TerminalAudio {
    open: bool,
    pending: Vec<(AlertKind, AlertTone)>,
}

impl TerminalAudio {
    fn take_rendered(&mut self) -> Vec<OutputLine> {
        let mut lines = Vec::new();
        let mut pending = std::mem::take(&mut self.pending).into_iter().peekable();

        while let Some((kind, first)) = pending.next() {
            let mut tones = vec![first];
            while let Some((_, tone)) = pending.next_if(|(next, _)| *next == kind) {
                tones.push(tone);
            }
            lines.push(OutputLine::alert(kind, render_tones(kind, &tones)));
        }

        lines
    }
}

impl AudioBackend for TerminalAudio {
    fn open(&mut self) -> Result<(), AudioFault> {
        self.open = true;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), AudioFault> {
        Ok(())
    }

    fn schedule(&mut self, profile: &ToneProfile, tone: &AlertTone) -> Result<(), AudioFault> {
        if !self.open {
            return Err(AudioFault::Released);
        }
        self.pending.push((profile.kind, *tone));
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }
}

fn render_tones(kind: AlertKind, tones: &[AlertTone]) -> String {
    let span = tones
        .iter()
        .map(AlertTone::end_offset)
        .max()
        .unwrap_or(Duration::ZERO);
    let mut pitches: Vec<u32> = Vec::new();
    for tone in tones {
        let hz = tone.frequency.rounded_hertz();
        if !pitches.contains(&hz) {
            pitches.push(hz);
        }
    }
    let pitches = pitches
        .iter()
        .map(|hz| format!("{hz}Hz"))
        .collect::<Vec<_>>()
        .join("/");

    format!(
        "♪ {kind} {pitches} tones={} span={}ms",
        tones.len(),
        span.as_millis()
    )
}

/// How a line should be presented on the terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineStyle {
    Response,
    Error,
    Event,
    Alert(AlertKind),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputLine {
    pub style: LineStyle,
    pub text: String,
}

impl OutputLine {
    fn response(text: impl Into<String>) -> Self {
        Self {
            style: LineStyle::Response,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            style: LineStyle::Error,
            text: text.into(),
        }
    }

    fn event(text: String) -> Self {
        Self {
            style: LineStyle::Event,
            text,
        }
    }

    fn alert(kind: AlertKind, text: String) -> Self {
        Self {
            style: LineStyle::Alert(kind),
            text,
        }
    }
}

#[derive(Debug)]
pub enum CompletionResponse {
    NoMatches,
    Applied { replacement: Replacement },
    Suggestions { options: Vec<&'static str> },
}

type EmulatedRide =
    RideSession<SimInstant, SeededRandom, TerminalAudio, MockResponders<SeededRandom>>;

pub struct Session {
    executor: CommandExecutor<EmulatedRide>,
    transcript: TranscriptLogger,
    completion: CompletionEngine,
    event_cursor: EventId,
}

impl Session {
    /// Starts a session whose transcript lands in `evidence/emulator-<label>.log`.
    pub fn new(profile: Profile, seed: u64, label: &str) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(label, profile, seed)?;
        let ride = RideSession::new(
            profile.config(),
            SeededRandom::new(seed),
            TerminalAudio::default(),
            MockResponders::new(SeededRandom::new(seed.rotate_left(32) ^ DEFAULT_SEED)),
        );

        Ok(Self {
            executor: CommandExecutor::new(ride, SimInstant::EPOCH),
            transcript,
            completion: CompletionEngine::new(),
            event_cursor: 0,
        })
    }

    #[must_use]
    pub fn now(&self) -> SimInstant {
        self.executor.now()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<OutputLine>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let before = self.now();
        self.transcript
            .append_line(before, TranscriptRole::Host, trimmed)?;

        let mut lines = match self.executor.execute(trimmed) {
            Ok(outcome) => render_outcome(&outcome),
            Err(err) => vec![OutputLine::error(format!("ERR {err}"))],
        };
        lines.extend(self.drain_events());
        lines.extend(
            self.executor
                .session_mut()
                .alerts_mut()
                .backend_mut()
                .take_rendered(),
        );

        let after = self.now();
        for line in &lines {
            self.transcript
                .append_line(after, TranscriptRole::Emulator, &line.text)?;
        }
        Ok(lines)
    }

    pub fn handle_completion(
        &mut self,
        buffer: &str,
        cursor: usize,
    ) -> io::Result<CompletionResponse> {
        let cursor = cursor.min(buffer.len());
        let (prefix, suffix) = buffer.split_at(cursor);
        let now = self.now();
        self.transcript
            .log_completion_request(now, prefix, suffix, cursor)?;

        let result = self.completion.complete(buffer, cursor);
        if let Some(replacement) = result.replacement {
            self.transcript.log_completion_applied(now, &replacement)?;
            return Ok(CompletionResponse::Applied { replacement });
        }
        if result.options.is_empty() {
            self.transcript.log_completion_none(now)?;
            return Ok(CompletionResponse::NoMatches);
        }

        let options: Vec<&'static str> = result.options.iter().copied().collect();
        self.transcript.log_completion_options(now, &options)?;
        Ok(CompletionResponse::Suggestions { options })
    }

    fn drain_events(&mut self) -> Vec<OutputLine> {
        let events = self.executor.session().events();
        let lines = events
            .since(self.event_cursor)
            .map(|record| {
                OutputLine::event(format!(
                    "event #{} t=+{}ms {}",
                    record.id,
                    record.timestamp.since_epoch().as_millis(),
                    record.event
                ))
            })
            .collect();
        self.event_cursor = events.next_id();
        lines
    }
}

fn render_outcome(outcome: &CommandOutcome<SimInstant>) -> Vec<OutputLine> {
    let mut text = String::new();
    // Writing into a String cannot fail.
    let _ = outcome.write_response(&mut text);
    text.lines().map(OutputLine::response).collect()
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(label: &str, profile: Profile, seed: u64) -> io::Result<Self> {
        fs::create_dir_all(EVIDENCE_DIR)?;
        let path: PathBuf = [EVIDENCE_DIR, &format!("emulator-{label}.log")]
            .iter()
            .collect();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(label, profile, seed)?;
        Ok(logger)
    }

    fn write_header(&mut self, label: &str, profile: Profile, seed: u64) -> io::Result<()> {
        writeln!(self.writer, "# SaarthiMitra trip emulator transcript: {label}")?;
        writeln!(self.writer, "# profile={} seed={seed}", profile.tag())?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, at: SimInstant, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            at.since_epoch().as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }

    fn log_completion_request(
        &mut self,
        at: SimInstant,
        prefix: &str,
        suffix: &str,
        cursor: usize,
    ) -> io::Result<()> {
        let message = format!("[TAB] prefix={prefix:?} suffix={suffix:?} cursor={cursor}");
        self.append_line(at, TranscriptRole::Host, &message)
    }

    fn log_completion_none(&mut self, at: SimInstant) -> io::Result<()> {
        self.append_line(at, TranscriptRole::Emulator, "completion: no matches")
    }

    fn log_completion_applied(&mut self, at: SimInstant, replacement: &Replacement) -> io::Result<()> {
        let message = format!(
            "completion applied: {} (range={}..{})",
            replacement.value, replacement.start, replacement.end
        );
        self.append_line(at, TranscriptRole::Emulator, &message)
    }

    fn log_completion_options(&mut self, at: SimInstant, options: &[&'static str]) -> io::Result<()> {
        let summary = format!("completion options ({})", options.len());
        self.append_line(at, TranscriptRole::Emulator, &summary)?;
        for option in options {
            self.append_line(at, TranscriptRole::Emulator, &format!("  {option}"))?;
        }
        Ok(())
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(label: &str) -> Session {
        Session::new(Profile::Passenger, 7, label).expect("session")
    }

    fn texts(lines: &[OutputLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn deviation_chime_is_rendered_after_the_warning() {
        let mut session = session("test-deviation");
        session.handle_command("start").expect("start");
        session.handle_command("advance 6s").expect("advance");
        let lines = session.handle_command("advance 10s").expect("advance");

        assert!(lines.iter().any(|line| {
            line.style == LineStyle::Event && line.text.ends_with("t=+16000ms deviation-detected 250m")
        }));
        assert!(lines
            .iter()
            .any(|line| line.style == LineStyle::Alert(AlertKind::DeviationChime)));

        let status = session.handle_command("status").expect("status");
        assert_eq!(
            status[1].text,
            "geofence status=warning deviation=250m alert=visible"
        );
    }

    #[test]
    fn sos_siren_groups_all_tones_on_one_line() {
        let mut session = session("test-sos");
        session.handle_command("sos").expect("press");
        let lines = session.handle_command("sos confirm").expect("confirm");

        let alerts: Vec<&OutputLine> = lines
            .iter()
            .filter(|line| line.style == LineStyle::Alert(AlertKind::SosSiren))
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].text, "♪ sos-siren 880Hz/660Hz tones=12 span=1800ms");
        assert_eq!(texts(&lines)[0], "ok sos active");
    }

    #[test]
    fn rejected_commands_are_reported_as_errors() {
        let mut session = session("test-errors");
        let lines = session.handle_command("sos cancel").expect("cancel");
        assert_eq!(lines[0].style, LineStyle::Error);
        assert_eq!(lines[0].text, "ERR ignored: no sos request pending");
    }

    #[test]
    fn driver_profile_books_roadside_help() {
        let mut driver =
            Session::new(Profile::Driver, 7, "test-roadside").expect("session");
        let lines = driver.handle_command("roadside").expect("roadside");
        assert_eq!(
            texts(&lines),
            [
                "ok roadside TYRE-0001 24x7 Tyre Service eta=12min",
                "event #0 t=+0ms roadside-booked TYRE-0001 eta=12min",
            ]
        );

        let mut passenger = session("test-roadside-passenger");
        let lines = passenger.handle_command("roadside mechanic").expect("roadside");
        assert_eq!(lines[0].style, LineStyle::Error);
        assert_eq!(lines[0].text, "ERR rejected: roadside help is for drivers");
    }

    #[test]
    fn tab_completes_command_names() {
        let mut session = session("test-completion");
        match session.handle_completion("adv", 3).expect("completion") {
            CompletionResponse::Applied { replacement } => {
                assert_eq!(replacement.value, "advance");
                assert!(replacement.append_space);
            }
            other => panic!("unexpected completion {other:?}"),
        }
    }
}
