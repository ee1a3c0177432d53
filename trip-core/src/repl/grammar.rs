#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the operator console.
//!
//! The lexer uses `regal` to produce a bounded token stream; the parser walks
//! the [`catalog`](super::catalog) AST over that stream and hands literal
//! payloads (durations) to small `winnow` parsers.

use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
use winnow::ascii::digit1;
use winnow::combinator::{alt, eof};
use winnow::error::ContextError;
use winnow::prelude::*;

use super::catalog::{self, ChoiceTag, CommandTag, Node, ValueSpec};
use crate::dispatch::RoadsideKind;

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 16;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal ending in `ms` or `s`.
    #[regex(r"[0-9]+(?:ms|s)", priority = 2)]
    Duration,
    /// Unsuffixed integer literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Identifier or keyword (case-insensitive match performed later).
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Anything the grammar does not know about.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => f.write_str("lexer engine error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarError<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: &'a str,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    UnknownCommand {
        name: &'a str,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    InvalidToken {
        lexeme: &'a str,
        span: Range<usize>,
    },
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found `{found}` at {span:?}"),
            GrammarError::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarError::UnknownCommand { name } => {
                write!(f, "unknown command `{name}` (try `help`)")
            }
            GrammarError::InvalidDuration { span } => {
                write!(f, "invalid duration literal at {span:?}")
            }
            GrammarError::InvalidToken { lexeme, span } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        match token {
            Some(token) if token.kind != TokenKind::Eol => GrammarError::UnexpectedToken {
                expected,
                found: token.lexeme,
                span: token.span.clone(),
            },
            _ => GrammarError::UnexpectedEnd { expected },
        }
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

impl From<LexError> for ParseError<'_> {
    fn from(error: LexError) -> Self {
        ParseError::Lex(error)
    }
}

impl<'a> From<GrammarError<'a>> for ParseError<'a> {
    fn from(error: GrammarError<'a>) -> Self {
        ParseError::Grammar(error)
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Advance(Duration),
    Ack,
    Sos(SosAction),
    Probe,
    Roadside(RoadsideKind),
    Status,
    Teardown,
    Help(HelpCommand<'a>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SosAction {
    Press,
    Confirm,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

type Input<'src, 'slice> = &'slice [Token<'src>];

/// Tokenize the provided line.
///
/// # Errors
///
/// Fails when the line produces more than [`MAX_TOKENS`] tokens.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(&mut buffer, record.token, lexeme, span)?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let span = start..start + partial.fragment.len();
        push_token(&mut buffer, TokenKind::Error, partial.fragment, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    kind: TokenKind,
    lexeme: &'a str,
    span: Range<usize>,
) -> Result<(), LexError> {
    buffer
        .push(Token { kind, lexeme, span })
        .map_err(|_| LexError::TooManyTokens {
            processed: MAX_TOKENS + 1,
        })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first token that does not fit the
/// grammar.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::InvalidToken {
            lexeme: token.lexeme,
            span: token.span.clone(),
        }));
    }

    let (command, mut rest) = parse_tokens_partial(tokens.as_slice())?;

    while let Some((token, remaining)) = rest.split_first() {
        if token.kind == TokenKind::Eol {
            rest = remaining;
        } else {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
    }

    Ok(command)
}

/// Parses one command and returns the tokens it did not consume.
pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: Input<'src, 'slice>,
) -> Result<(Command<'src>, Input<'src, 'slice>), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    let keyword = expect_kind(&mut input, TokenKind::Ident, "command keyword")?;
    let spec = catalog::find(keyword.lexeme).ok_or(GrammarError::UnknownCommand {
        name: keyword.lexeme,
    })?;

    let mut state = CommandState::new(spec.tag);
    parse_node(spec.grammar, &mut input, &mut state)?;
    Ok((state.finish(), input))
}

fn parse_node<'src, 'slice>(
    node: &'static Node,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), GrammarError<'src>>
where
    'src: 'slice,
{
    match node {
        Node::End => Ok(()),
        Node::Value { value, next } => {
            match value {
                ValueSpec::Duration { .. } => {
                    let token = expect_kind(input, TokenKind::Duration, "duration")?;
                    let duration = parse_duration(&token)?;
                    state.set_duration(duration);
                }
            }
            parse_node(next, input, state)
        }
        Node::OptionalChoice { choices, default } => match input.split_first() {
            Some((token, rest)) if token.kind == TokenKind::Ident => {
                let branch = catalog::find_choice(choices, token.lexeme)
                    .ok_or_else(|| GrammarError::unexpected(choice_label(choices), Some(token)))?;
                *input = rest;
                state.apply_choice(branch.tag);
                Ok(())
            }
            Some((token, _)) if token.kind != TokenKind::Eol => Err(GrammarError::unexpected(
                choice_label(choices),
                Some(token),
            )),
            _ => {
                if let Some(tag) = default {
                    state.apply_choice(*tag);
                }
                Ok(())
            }
        },
        Node::Topic => match input.split_first() {
            Some((token, rest)) if token.kind == TokenKind::Ident => {
                state.set_topic(token.lexeme);
                *input = rest;
                Ok(())
            }
            Some((token, _)) if token.kind != TokenKind::Eol => {
                Err(GrammarError::unexpected("identifier", Some(token)))
            }
            _ => Ok(()),
        },
    }
}

fn choice_label(choices: &'static [catalog::ChoiceBranch]) -> &'static str {
    choices.first().map_or("keyword", |choice| choice.keyword)
}

fn expect_kind<'src>(
    input: &mut Input<'src, '_>,
    kind: TokenKind,
    label: &'static str,
) -> Result<Token<'src>, GrammarError<'src>> {
    match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        other => Err(GrammarError::unexpected(label, other.map(|(token, _)| token))),
    }
}

enum CommandState<'a> {
    Start,
    Advance(Option<Duration>),
    Ack,
    Sos(Option<SosAction>),
    Probe,
    Roadside(Option<RoadsideKind>),
    Status,
    Teardown,
    Help(Option<&'a str>),
}

impl<'a> CommandState<'a> {
    fn new(tag: CommandTag) -> Self {
        match tag {
            CommandTag::Start => CommandState::Start,
            CommandTag::Advance => CommandState::Advance(None),
            CommandTag::Ack => CommandState::Ack,
            CommandTag::Sos => CommandState::Sos(None),
            CommandTag::Probe => CommandState::Probe,
            CommandTag::Roadside => CommandState::Roadside(None),
            CommandTag::Status => CommandState::Status,
            CommandTag::Teardown => CommandState::Teardown,
            CommandTag::Help => CommandState::Help(None),
        }
    }

    fn apply_choice(&mut self, tag: ChoiceTag) {
        match (self, tag) {
            (CommandState::Sos(action), ChoiceTag::SosPress) => *action = Some(SosAction::Press),
            (CommandState::Sos(action), ChoiceTag::SosConfirm) => {
                *action = Some(SosAction::Confirm);
            }
            (CommandState::Sos(action), ChoiceTag::SosCancel) => *action = Some(SosAction::Cancel),
            (CommandState::Roadside(kind), ChoiceTag::RoadsideTyre) => {
                *kind = Some(RoadsideKind::Tyre);
            }
            (CommandState::Roadside(kind), ChoiceTag::RoadsideMechanic) => {
                *kind = Some(RoadsideKind::Mechanic);
            }
            _ => {}
        }
    }

    fn set_duration(&mut self, duration: Duration) {
        if let CommandState::Advance(slot) = self {
            *slot = Some(duration);
        }
    }

    fn set_topic(&mut self, topic: &'a str) {
        if let CommandState::Help(slot) = self {
            *slot = Some(topic);
        }
    }

    fn finish(self) -> Command<'a> {
        match self {
            CommandState::Start => Command::Start,
            CommandState::Advance(duration) => Command::Advance(duration.unwrap_or_default()),
            CommandState::Ack => Command::Ack,
            CommandState::Sos(action) => Command::Sos(action.unwrap_or(SosAction::Press)),
            CommandState::Probe => Command::Probe,
            CommandState::Roadside(kind) => Command::Roadside(kind.unwrap_or(RoadsideKind::Tyre)),
            CommandState::Status => Command::Status,
            CommandState::Teardown => Command::Teardown,
            CommandState::Help(topic) => Command::Help(HelpCommand { topic }),
        }
    }
}

fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let mut text = token.lexeme;
    duration_literal(&mut text).map_err(|_| GrammarError::InvalidDuration {
        span: token.span.clone(),
    })
}

/// `<digits>ms` or `<digits>s`, consuming the whole input.
fn duration_literal(input: &mut &str) -> Result<Duration, ContextError> {
    (digit1.parse_to::<u64>(), alt(("ms", "s")), eof)
        .map(|(value, unit, _)| {
            if unit == "ms" {
                Duration::from_millis(value)
            } else {
                Duration::from_secs(value)
            }
        })
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Command<'_> {
        parse(input).expect("command should parse")
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_ok("start"), Command::Start);
        assert_eq!(parse_ok("ack"), Command::Ack);
        assert_eq!(parse_ok("probe"), Command::Probe);
        assert_eq!(parse_ok("status\n"), Command::Status);
        assert_eq!(parse_ok("teardown"), Command::Teardown);
    }

    #[test]
    fn parses_advance_durations() {
        assert_eq!(
            parse_ok("advance 500ms"),
            Command::Advance(Duration::from_millis(500))
        );
        assert_eq!(parse_ok("advance 6s"), Command::Advance(Duration::from_secs(6)));
    }

    #[test]
    fn advance_requires_a_duration() {
        assert_eq!(
            parse("advance"),
            Err(ParseError::Grammar(GrammarError::UnexpectedEnd {
                expected: "duration"
            }))
        );
        assert!(matches!(
            parse("advance 5"),
            Err(ParseError::Grammar(GrammarError::UnexpectedToken {
                expected: "duration",
                ..
            }))
        ));
    }

    #[test]
    fn oversized_duration_is_rejected() {
        assert!(matches!(
            parse("advance 99999999999999999999999ms"),
            Err(ParseError::Grammar(GrammarError::InvalidDuration { .. }))
        ));
    }

    #[test]
    fn sos_defaults_to_press() {
        assert_eq!(parse_ok("sos"), Command::Sos(SosAction::Press));
        assert_eq!(parse_ok("sos confirm"), Command::Sos(SosAction::Confirm));
        assert_eq!(parse_ok("SOS Cancel"), Command::Sos(SosAction::Cancel));
        assert!(matches!(
            parse("sos later"),
            Err(ParseError::Grammar(GrammarError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn roadside_defaults_to_tyre() {
        assert_eq!(parse_ok("roadside"), Command::Roadside(RoadsideKind::Tyre));
        assert_eq!(
            parse_ok("roadside mechanic"),
            Command::Roadside(RoadsideKind::Mechanic)
        );
        assert!(matches!(
            parse("roadside confirm"),
            Err(ParseError::Grammar(GrammarError::UnexpectedToken {
                expected: "tyre",
                ..
            }))
        ));
    }

    #[test]
    fn parses_help_topic() {
        assert_eq!(
            parse_ok("help sos"),
            Command::Help(HelpCommand { topic: Some("sos") })
        );
        assert_eq!(parse_ok("help"), Command::Help(HelpCommand { topic: None }));
    }

    #[test]
    fn rejects_unknown_commands_and_trailing_tokens() {
        assert_eq!(
            parse("reboot now"),
            Err(ParseError::Grammar(GrammarError::UnknownCommand { name: "reboot" }))
        );
        assert!(matches!(
            parse("start now"),
            Err(ParseError::Grammar(GrammarError::UnexpectedToken {
                expected: "end of command",
                ..
            }))
        ));
    }

    #[test]
    fn lexer_emits_error_token_for_unknown_symbol() {
        let tokens = lex("sos press$").expect("lexing should succeed");
        let last = tokens.last().expect("expected at least one token");
        assert_eq!(last.kind, TokenKind::Error);
        assert_eq!(last.lexeme, "$");
        assert!(matches!(
            parse("sos press$"),
            Err(ParseError::Grammar(GrammarError::InvalidToken { lexeme: "$", .. }))
        ));
    }
}
