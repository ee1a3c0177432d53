mod session;

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal;
use trip_core::alert::AlertKind;
use trip_core::random::DEFAULT_SEED;

use session::{CompletionResponse, LineStyle, OutputLine, Profile, Session};

const PROMPT: &str = "> ";

struct Options {
    profile: Profile,
    seed: u64,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: trip-emulator [--profile <passenger|driver>] [--seed <n>]");
        process::exit(2);
    });

    let mut session = Session::new(options.profile, options.seed, options.profile.tag())?;
    let interactive = io::stdin().is_terminal();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    writeln!(
        writer,
        "SaarthiMitra trip emulator ({} profile, seed {}). Type `help` for commands or `exit` to quit.",
        options.profile.tag(),
        options.seed
    )?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    loop {
        let line = if interactive {
            read_line_raw(&mut session, &mut writer)?
        } else {
            read_line_plain(&mut reader, &mut writer)?
        };
        let Some(line) = line else {
            writeln!(writer)?;
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for output in session.handle_command(trimmed)? {
            print_line(&mut writer, &output)?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn print_line<W: Write>(writer: &mut W, line: &OutputLine) -> io::Result<()> {
    let text = line.text.as_str();
    match line.style {
        LineStyle::Response => writeln!(writer, "{text}"),
        LineStyle::Error => writeln!(writer, "{}", text.red()),
        LineStyle::Event => writeln!(writer, "{}", text.dark_grey()),
        LineStyle::Alert(AlertKind::DeviationChime) => {
            writeln!(writer, "{}", text.yellow().bold())
        }
        LineStyle::Alert(AlertKind::SosSiren) => writeln!(writer, "{}", text.red().bold()),
    }
}

fn read_line_plain<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<Option<String>> {
    write!(writer, "{PROMPT}")?;
    writer.flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Leaves raw mode when the line editor returns, including on error.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Reads one line with echo, backspace and Tab completion.
fn read_line_raw<W: Write>(session: &mut Session, writer: &mut W) -> io::Result<Option<String>> {
    let _guard = RawModeGuard::enable()?;
    let mut buffer = String::new();
    write!(writer, "{PROMPT}")?;
    writer.flush()?;

    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press | KeyEventKind::Repeat,
            ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                write!(writer, "\r\n")?;
                writer.flush()?;
                return Ok(Some(buffer));
            }
            KeyCode::Char('c' | 'd') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Backspace => {
                if buffer.pop().is_some() {
                    write!(writer, "\x08 \x08")?;
                }
            }
            KeyCode::Tab => {
                let cursor = buffer.len();
                match session.handle_completion(&buffer, cursor)? {
                    CompletionResponse::Applied { replacement } => {
                        let mut updated = String::with_capacity(buffer.len() + 16);
                        updated.push_str(&buffer[..replacement.start]);
                        updated.push_str(replacement.value);
                        if replacement.append_space {
                            updated.push(' ');
                        }
                        updated.push_str(&buffer[replacement.end..]);
                        buffer = updated;
                        write!(writer, "\r{PROMPT}{buffer}")?;
                    }
                    CompletionResponse::Suggestions { options } => {
                        let listing = options.join("  ");
                        write!(writer, "\r\n{}\r\n{PROMPT}{buffer}", listing.dark_grey())?;
                    }
                    CompletionResponse::NoMatches => write!(writer, "\x07")?,
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                buffer.push(ch);
                write!(writer, "{ch}")?;
            }
            _ => {}
        }
        writer.flush()?;
    }
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        profile: Profile::Passenger,
        seed: DEFAULT_SEED,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--profile" => options.profile = Profile::from_tag(&value()?)?,
            "--seed" => {
                let raw = value()?;
                options.seed = raw
                    .parse()
                    .map_err(|_| format!("Invalid seed `{raw}`"))?;
            }
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}
