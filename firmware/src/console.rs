#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Operator console served over USB CDC.
//!
//! Bytes from the host are assembled into lines, parsed with the shared
//! console grammar and turned into [`BeaconInput`]s for the trip task. The
//! beacon runs on the real clock, so `advance` is refused here, and it rides
//! with the passenger, so `roadside` is refused too.

use core::fmt::{self, Write};
use core::str;

use heapless::Vec;
use trip_core::repl::catalog;
use trip_core::repl::commands::CommandOutcome;
use trip_core::repl::completion::CompletionEngine;
use trip_core::repl::grammar::{self, Command, SosAction};
use trip_core::repl::status::{StatusFormatter, StatusSnapshot};

use crate::input::BeaconInput;

/// Maximum number of bytes accepted on a single line (excluding terminator).
pub const MAX_LINE_LEN: usize = 96;

pub const PROMPT: &str = "> ";

const BELL: char = '\u{7}';

/// The trip task is not draining inputs fast enough.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConsoleBusy;

/// What the console needs from the rest of the firmware.
pub trait ConsoleHost {
    /// Forwards an input to the trip task.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleBusy`] when the input queue is full.
    fn submit(&mut self, input: BeaconInput) -> Result<(), ConsoleBusy>;

    fn status(&self) -> StatusSnapshot;
}

/// Line editor and dispatcher for one console session.
pub struct Console {
    buffer: Vec<u8, MAX_LINE_LEN>,
    completion: CompletionEngine,
}

impl Console {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            completion: CompletionEngine::new(),
        }
    }

    /// Greets a freshly attached host.
    pub fn on_connect<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        self.buffer.clear();
        out.write_str("SaarthiMitra beacon console. Type `help` for commands.\r\n")?;
        out.write_str(PROMPT)
    }

    /// Drops any half-typed line.
    pub fn on_disconnect(&mut self) {
        self.buffer.clear();
    }

    /// Feeds one byte from the host; echo and responses go to `out`.
    pub fn ingest<H, W>(&mut self, byte: u8, host: &mut H, out: &mut W) -> fmt::Result
    where
        H: ConsoleHost,
        W: Write,
    {
        match byte {
            b'\r' | b'\n' => {
                out.write_str("\r\n")?;
                if !self.buffer.is_empty() {
                    self.execute_line(host, &mut CrlfWriter(&mut *out))?;
                    self.buffer.clear();
                }
                out.write_str(PROMPT)
            }
            0x08 | 0x7f => {
                if self.buffer.pop().is_some() {
                    out.write_str("\u{8} \u{8}")?;
                }
                Ok(())
            }
            b'\t' => self.complete(out),
            0x20..=0x7e => {
                if self.buffer.push(byte).is_ok() {
                    out.write_char(char::from(byte))
                } else {
                    out.write_char(BELL)
                }
            }
            _ => Ok(()),
        }
    }

    /// Current line contents.
    #[must_use]
    pub fn line(&self) -> &str {
        // Only printable ASCII is ever pushed.
        str::from_utf8(&self.buffer).unwrap_or_default()
    }

    fn execute_line<H: ConsoleHost, W: Write>(&self, host: &mut H, out: &mut W) -> fmt::Result {
        let command = match grammar::parse(self.line()) {
            Ok(command) => command,
            Err(error) => return writeln!(out, "ERR {error}"),
        };

        let input = match command {
            Command::Start => BeaconInput::Start,
            Command::Ack => BeaconInput::Acknowledge,
            Command::Sos(SosAction::Press) => BeaconInput::SosPress,
            Command::Sos(SosAction::Confirm) => BeaconInput::SosConfirm,
            Command::Sos(SosAction::Cancel) => BeaconInput::SosCancel,
            Command::Probe => BeaconInput::Probe,
            Command::Teardown => BeaconInput::Teardown,
            Command::Advance(_) => {
                return writeln!(out, "ERR advance needs the emulator's simulated clock");
            }
            Command::Roadside(_) => {
                return writeln!(out, "ERR roadside help needs a driver session");
            }
            Command::Status => {
                let snapshot = host.status();
                let formatter = StatusFormatter::new(&snapshot);
                formatter.write_trip_line(out)?;
                out.write_char('\n')?;
                formatter.write_geofence_line(out)?;
                out.write_char('\n')?;
                formatter.write_sos_line(out)?;
                return out.write_char('\n');
            }
            Command::Help(help) => {
                let spec = match help.topic {
                    None => None,
                    Some(topic) => match catalog::find(topic) {
                        Some(spec) => Some(spec),
                        None => return writeln!(out, "ERR no help for `{topic}`"),
                    },
                };
                CommandOutcome::<()>::Help(spec).write_response(out)?;
                return out.write_char('\n');
            }
        };

        match host.submit(input) {
            Ok(()) => writeln!(out, "OK {}", input.as_str()),
            Err(ConsoleBusy) => writeln!(out, "ERR busy"),
        }
    }

    fn complete<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        let cursor = self.buffer.len();
        let result = self.completion.complete(self.line(), cursor);

        if let Some(replacement) = result.replacement {
            let extra = usize::from(replacement.append_space);
            if replacement.start + replacement.value.len() + extra > MAX_LINE_LEN {
                return out.write_char(BELL);
            }

            for _ in replacement.start..replacement.end {
                out.write_str("\u{8} \u{8}")?;
            }
            self.buffer.truncate(replacement.start);
            let _ = self.buffer.extend_from_slice(replacement.value.as_bytes());
            out.write_str(replacement.value)?;
            if replacement.append_space {
                let _ = self.buffer.push(b' ');
                out.write_char(' ')?;
            }
            return Ok(());
        }

        match result.options.as_slice() {
            [] => out.write_char(BELL),
            options => {
                out.write_str("\r\n")?;
                for (index, option) in options.iter().enumerate() {
                    if index > 0 {
                        out.write_str("  ")?;
                    }
                    out.write_str(option)?;
                }
                write!(out, "\r\n{PROMPT}{}", self.line())
            }
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands `\n` into `\r\n` for serial terminals.
struct CrlfWriter<W>(W);

impl<W: Write> Write for CrlfWriter<W> {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        for (index, part) in text.split('\n').enumerate() {
            if index > 0 {
                self.0.write_str("\r\n")?;
            }
            self.0.write_str(part)?;
        }
        Ok(())
    }
}
