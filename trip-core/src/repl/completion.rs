//! Grammar-aware completion engine shared by firmware and emulator REPLs.
//!
//! Suggestions are read straight from [`catalog`](super::catalog), so every
//! keyword the parser accepts is also offered on Tab.

use heapless::Vec as HeaplessVec;

use super::catalog::{self, ChoiceBranch, Node, ValueSpec};
use super::grammar::{self, Token, TokenKind};

const MAX_SUGGESTIONS: usize = 16;

/// Completion result returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionResult {
    /// Applied automatically when a single candidate matches or the
    /// candidates share a longer prefix than what was typed.
    pub replacement: Option<Replacement>,
    /// Candidates for the word under the cursor; empty when nothing fits.
    pub options: HeaplessVec<&'static str, MAX_SUGGESTIONS>,
}

impl CompletionResult {
    const fn empty() -> Self {
        Self {
            replacement: None,
            options: HeaplessVec::new(),
        }
    }
}

/// Portion of the buffer to substitute with `value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub value: &'static str,
    pub append_space: bool,
}

/// Stateless completion engine over the command catalog.
#[derive(Default)]
pub struct CompletionEngine;

impl CompletionEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes completions for `buffer` with the cursor at byte `cursor`.
    ///
    /// The caller keeps the buffer ASCII so every index is a char boundary.
    #[must_use]
    pub fn complete(&self, buffer: &str, cursor: usize) -> CompletionResult {
        let Some(upto_cursor) = buffer.get(..cursor) else {
            return CompletionResult::empty();
        };

        let prefix_start = token_start(upto_cursor);
        let prefix = &upto_cursor[prefix_start..];
        let Ok(leading) = grammar::lex(&upto_cursor[..prefix_start]) else {
            return CompletionResult::empty();
        };

        let context = determine_context(leading.as_slice());
        let mut matches: HeaplessVec<&'static str, MAX_SUGGESTIONS> = HeaplessVec::new();
        for candidate in context.candidates() {
            if starts_with_ignore_ascii_case(candidate, prefix) && matches.push(candidate).is_err() {
                break;
            }
        }

        let replacement = match matches.as_slice() {
            [] => None,
            [single] => Some(Replacement {
                start: prefix_start,
                end: cursor,
                value: single,
                append_space: context.takes_arguments(single),
            }),
            several => {
                let shared = longest_common_prefix(several);
                (shared.len() > common_prefix_len_ignore_case(prefix, shared)).then_some(
                    Replacement {
                        start: prefix_start,
                        end: cursor,
                        value: shared,
                        append_space: false,
                    },
                )
            }
        };

        CompletionResult {
            replacement,
            options: matches,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompletionContext {
    Command,
    Choice(&'static [ChoiceBranch]),
    Value(&'static [&'static str]),
    None,
}

impl CompletionContext {
    fn candidates(self) -> impl Iterator<Item = &'static str> {
        let commands = match self {
            Self::Command => catalog::commands(),
            _ => &[],
        };
        let choices = match self {
            Self::Choice(choices) => choices,
            _ => &[],
        };
        let values = match self {
            Self::Value(values) => values,
            _ => &[],
        };

        commands
            .iter()
            .map(|spec| spec.name)
            .chain(choices.iter().map(|choice| choice.keyword))
            .chain(values.iter().copied())
    }

    fn takes_arguments(self, candidate: &str) -> bool {
        self == Self::Command
            && catalog::find(candidate).is_some_and(|spec| *spec.grammar != Node::End)
    }
}

fn determine_context(tokens: &[Token<'_>]) -> CompletionContext {
    if tokens.iter().any(|token| token.kind == TokenKind::Error) {
        return CompletionContext::None;
    }

    let Some((keyword, arguments)) = tokens.split_first() else {
        return CompletionContext::Command;
    };
    let Some(spec) = catalog::find(keyword.lexeme) else {
        return CompletionContext::None;
    };
    if !arguments.is_empty() {
        return CompletionContext::None;
    }

    match *spec.grammar {
        Node::End => CompletionContext::None,
        Node::Value {
            value: ValueSpec::Duration { suggestions },
            ..
        } => CompletionContext::Value(suggestions),
        Node::OptionalChoice { choices, .. } => CompletionContext::Choice(choices),
        Node::Topic => CompletionContext::Command,
    }
}

fn token_start(buffer: &str) -> usize {
    buffer
        .rfind([' ', '\t'])
        .map_or(0, |separator| separator + 1)
}

fn starts_with_ignore_ascii_case(candidate: &str, prefix: &str) -> bool {
    candidate
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn common_prefix_len_ignore_case(lhs: &str, rhs: &str) -> usize {
    lhs.as_bytes()
        .iter()
        .zip(rhs.as_bytes())
        .take_while(|(l, r)| l.eq_ignore_ascii_case(r))
        .count()
}

fn longest_common_prefix(candidates: &[&'static str]) -> &'static str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };

    let mut prefix = *first;
    for candidate in rest {
        let len = common_prefix_len_ignore_case(prefix, candidate);
        prefix = &prefix[..len];
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(result: &CompletionResult) -> &[&'static str] {
        result.options.as_slice()
    }

    #[test]
    fn offers_every_command_from_empty_buffer() {
        let result = CompletionEngine::new().complete("", 0);
        assert!(result.replacement.is_none());
        assert_eq!(
            options(&result),
            [
                "start", "advance", "ack", "sos", "probe", "roadside", "status", "teardown",
                "help"
            ]
        );
    }

    #[test]
    fn shared_prefix_is_extended_without_space() {
        let result = CompletionEngine::new().complete("s", 1);
        assert_eq!(options(&result), ["start", "sos", "status"]);
        assert!(result.replacement.is_none());

        let result = CompletionEngine::new().complete("st", 2);
        assert_eq!(options(&result), ["start", "status"]);
        let replacement = result.replacement.expect("shared prefix");
        assert_eq!(replacement.value, "sta");
        assert!(!replacement.append_space);
    }

    #[test]
    fn commands_with_arguments_get_a_trailing_space() {
        let engine = CompletionEngine::new();

        let replacement = engine.complete("adv", 3).replacement.expect("unique");
        assert_eq!((replacement.start, replacement.end), (0, 3));
        assert_eq!(replacement.value, "advance");
        assert!(replacement.append_space);

        let replacement = engine.complete("tear", 4).replacement.expect("unique");
        assert_eq!(replacement.value, "teardown");
        assert!(!replacement.append_space);
    }

    #[test]
    fn suggests_sos_actions_case_insensitively() {
        let engine = CompletionEngine::new();
        assert_eq!(
            options(&engine.complete("sos ", 4)),
            ["press", "confirm", "cancel"]
        );

        let result = engine.complete("SOS C", 5);
        assert_eq!(options(&result), ["confirm", "cancel"]);
        let result = engine.complete("SOS CA", 6);
        let replacement = result.replacement.expect("unique");
        assert_eq!((replacement.start, replacement.end), (4, 6));
        assert_eq!(replacement.value, "cancel");
        assert!(!replacement.append_space);
    }

    #[test]
    fn suggests_roadside_kinds() {
        let engine = CompletionEngine::new();
        assert_eq!(options(&engine.complete("roadside ", 9)), ["tyre", "mechanic"]);

        let replacement = engine.complete("road", 4).replacement.expect("unique");
        assert_eq!(replacement.value, "roadside");
        assert!(replacement.append_space);
    }

    #[test]
    fn suggests_advance_durations() {
        let result = CompletionEngine::new().complete("advance ", 8);
        assert_eq!(options(&result), ["500ms", "3s", "6s", "10s"]);
    }

    #[test]
    fn help_topics_are_command_names() {
        let result = CompletionEngine::new().complete("help pr", 7);
        let replacement = result.replacement.expect("unique");
        assert_eq!(replacement.start, 5);
        assert_eq!(replacement.value, "probe");
        assert!(!replacement.append_space);
    }

    #[test]
    fn nothing_follows_a_complete_command() {
        let engine = CompletionEngine::new();
        assert!(engine.complete("status ", 7).options.is_empty());
        assert!(engine.complete("sos press ", 10).options.is_empty());
        assert!(engine.complete("reboot ", 7).options.is_empty());
        assert!(engine.complete("status", 99).options.is_empty());
    }
}
