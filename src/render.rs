//! Reply text for command outcomes. Every command produces exactly one reply.

use chrono::TimeDelta;

use crate::command::{ParseError, usage};
use crate::session::SessionError;
use crate::state_machine::tally::{CommandKind, Outcome};

/// Renders replies, pointing users at commands with the configured prefix.
#[derive(Debug, Clone)]
pub struct Renderer {
    prefix: String,
}

impl Renderer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Reply for an engine outcome of a `kind` command.
    pub fn outcome(&self, kind: CommandKind, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Created { name, count } => {
                format!("{name} tally created with a count of {count}")
            }
            Outcome::AlreadyExists { name, count } => {
                format!("{name} tally already exists, with a count of {count}")
            }
            Outcome::Updated { name, count } => format!("{name} tally updated to a count of {count}"),
            Outcome::Increased { name, count } => {
                format!("{name} tally increased to a count of {count}")
            }
            Outcome::Decreased { name, count } => {
                format!("{name} tally decreased to a count of {count}")
            }
            Outcome::Status {
                name,
                count,
                last_entry: None,
            } => format!("{name} tally has a count of {count}"),
            Outcome::Status {
                name,
                count,
                last_entry: Some(entry),
            } => format!("{name} tally has a count of {count} and was last updated at {entry} GMT"),
            Outcome::Deleted { name } => format!("{name} tally deleted"),
            Outcome::Elapsed { name, elapsed } => {
                format!("{name} tally was last updated {} ago", format_timespan(*elapsed))
            }
            Outcome::NoCount { name } => format!("{name} tally has no count"),
            Outcome::NoHistory { name, count } => {
                format!("{name} tally has a count of {count}, but no associated dates")
            }
            Outcome::UnknownElapsed { name } => {
                format!("{name} tally was last updated an unknown amount of time ago")
            }
            Outcome::NotFound { name } if kind == CommandKind::DeleteTally => {
                format!("{name} tally does not exist")
            }
            Outcome::NotFound { .. } => format!(
                "Tally does not exist, please start it first using `{}start_tally name count`",
                self.prefix
            ),
            Outcome::Underflow {
                name,
                requested,
                available,
            } => format!(
                "{name} tally cannot be decreased by {requested}, it only has {available} recorded updates"
            ),
            Outcome::BackfillTooLarge {
                name,
                requested,
                limit,
            } => format!(
                "{name} tally cannot jump by {requested} unrecorded updates at once (limit is {limit})"
            ),
            Outcome::CountOutOfRange { name } => {
                format!("{name} tally count would be out of range, nothing was changed")
            }
            Outcome::InvalidName { .. } => format!(
                "Tally names cannot be blank. Usage: `{}{}`",
                self.prefix,
                usage(kind)
            ),
        }
    }

    /// Reply for a command that could not be parsed.
    pub fn parse_error(&self, err: &ParseError) -> String {
        match err.command() {
            Some(kind) => format!("Invalid command: {err}. Usage: `{}{}`", self.prefix, usage(kind)),
            None => {
                let commands = CommandKind::ALL
                    .iter()
                    .map(|kind| format!("`{}{}`", self.prefix, kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Invalid command: {err}. Available commands: {commands}")
            }
        }
    }

    /// Reply for a command the coordinator could not run.
    pub fn session_error(&self, err: &SessionError) -> String {
        match err {
            SessionError::ShuttingDown => {
                "The bot is shutting down, please try again shortly".to_string()
            }
            SessionError::Storage(_)
            | SessionError::NoOutcome
            | SessionError::Aborted => {
                "Tally storage is unavailable right now, nothing was changed".to_string()
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(crate::command::DEFAULT_PREFIX)
    }
}

const TIMESPAN_UNITS: [(&str, i64); 6] = [
    ("year", 60 * 60 * 24 * 7 * 52),
    ("week", 60 * 60 * 24 * 7),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Render a duration as a human readable span, e.g. `1 hour, 2 minutes and 3 seconds`.
///
/// At most the three largest non-zero units are shown. Negative spans render as zero.
pub fn format_timespan(span: TimeDelta) -> String {
    let mut remaining = span.num_seconds().max(0);
    if remaining == 0 {
        return "0 seconds".to_string();
    }

    let mut parts = Vec::new();
    for (unit, seconds) in TIMESPAN_UNITS {
        let amount = remaining / seconds;
        remaining %= seconds;
        if amount > 0 {
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{amount} {unit}{plural}"));
        }
    }
    parts.truncate(3);

    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => "0 seconds".to_string(),
    }
}
