//! Operator console grammar expressed as a small declarative AST.
//!
//! The parser, the completion engine and `help` all read the same catalog so
//! keywords, defaults and value layouts cannot drift apart.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Start,
    Advance,
    Ack,
    Sos,
    Probe,
    Roadside,
    Status,
    Teardown,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTag {
    SosPress,
    SosConfirm,
    SosCancel,
    RoadsideTyre,
    RoadsideMechanic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    Duration {
        suggestions: &'static [&'static str],
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub grammar: &'static Node,
    pub usage: &'static str,
    pub summary: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    End,
    /// A mandatory value followed by `next`.
    Value {
        value: ValueSpec,
        next: &'static Node,
    },
    /// One keyword out of `choices`, or `default` when the line ends.
    OptionalChoice {
        choices: &'static [ChoiceBranch],
        default: Option<ChoiceTag>,
    },
    /// Optional free identifier naming another command.
    Topic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub keyword: &'static str,
    pub tag: ChoiceTag,
}

const END: Node = Node::End;

const ADVANCE_SUGGESTIONS: [&str; 4] = ["500ms", "3s", "6s", "10s"];

const ADVANCE_GRAMMAR: Node = Node::Value {
    value: ValueSpec::Duration {
        suggestions: &ADVANCE_SUGGESTIONS,
    },
    next: &END,
};

const SOS_CHOICES: [ChoiceBranch; 3] = [
    ChoiceBranch {
        keyword: "press",
        tag: ChoiceTag::SosPress,
    },
    ChoiceBranch {
        keyword: "confirm",
        tag: ChoiceTag::SosConfirm,
    },
    ChoiceBranch {
        keyword: "cancel",
        tag: ChoiceTag::SosCancel,
    },
];

const SOS_GRAMMAR: Node = Node::OptionalChoice {
    choices: &SOS_CHOICES,
    default: Some(ChoiceTag::SosPress),
};

const ROADSIDE_CHOICES: [ChoiceBranch; 2] = [
    ChoiceBranch {
        keyword: "tyre",
        tag: ChoiceTag::RoadsideTyre,
    },
    ChoiceBranch {
        keyword: "mechanic",
        tag: ChoiceTag::RoadsideMechanic,
    },
];

const ROADSIDE_GRAMMAR: Node = Node::OptionalChoice {
    choices: &ROADSIDE_CHOICES,
    default: Some(ChoiceTag::RoadsideTyre),
};

const HELP_GRAMMAR: Node = Node::Topic;

const COMMANDS: [CommandSpec; 9] = [
    CommandSpec {
        name: "start",
        tag: CommandTag::Start,
        grammar: &END,
        usage: "start",
        summary: "start the trip",
    },
    CommandSpec {
        name: "advance",
        tag: CommandTag::Advance,
        grammar: &ADVANCE_GRAMMAR,
        usage: "advance <duration>",
        summary: "move the simulated clock (e.g. 500ms, 6s)",
    },
    CommandSpec {
        name: "ack",
        tag: CommandTag::Ack,
        grammar: &END,
        usage: "ack",
        summary: "acknowledge the deviation alert",
    },
    CommandSpec {
        name: "sos",
        tag: CommandTag::Sos,
        grammar: &SOS_GRAMMAR,
        usage: "sos [press|confirm|cancel]",
        summary: "drive the SOS flow (default press)",
    },
    CommandSpec {
        name: "probe",
        tag: CommandTag::Probe,
        grammar: &END,
        usage: "probe",
        summary: "run the route-deviation check once",
    },
    CommandSpec {
        name: "roadside",
        tag: CommandTag::Roadside,
        grammar: &ROADSIDE_GRAMMAR,
        usage: "roadside [tyre|mechanic]",
        summary: "book roadside help (driver only, default tyre)",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        grammar: &END,
        usage: "status",
        summary: "print trip / geofence / sos lines",
    },
    CommandSpec {
        name: "teardown",
        tag: CommandTag::Teardown,
        grammar: &END,
        usage: "teardown",
        summary: "release timers and audio",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        grammar: &HELP_GRAMMAR,
        usage: "help [topic]",
        summary: "list commands or describe one",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Finds a choice keyword (case insensitive).
#[must_use]
pub fn find_choice(choices: &'static [ChoiceBranch], keyword: &str) -> Option<&'static ChoiceBranch> {
    choices
        .iter()
        .find(|choice| choice.keyword.eq_ignore_ascii_case(keyword))
}
