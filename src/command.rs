//! Parsing of prefixed chat commands (`!inc 2 coffee`) into [`TallyCommand`]s.

use crate::state_machine::tally::{CommandKind, TallyCommand};

/// Default prefix that addresses the bot.
pub const DEFAULT_PREFIX: &str = "!";

/// Indicates that a prefixed message could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} is missing the '{argument}' argument")]
    MissingArgument {
        command: CommandKind,
        argument: &'static str,
    },

    #[error("{command} expects a whole number for '{argument}', got '{value}'")]
    InvalidInteger {
        command: CommandKind,
        argument: &'static str,
        value: String,
    },

    #[error("unterminated quote")]
    UnterminatedQuote,
}

impl ParseError {
    /// The command the error relates to, if it was recognised.
    pub fn command(&self) -> Option<CommandKind> {
        match self {
            Self::MissingArgument { command, .. } | Self::InvalidInteger { command, .. } => {
                Some(*command)
            }
            Self::UnknownCommand(_) | Self::UnterminatedQuote => None,
        }
    }
}

/// The argument order users type for each command.
pub fn usage(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::StartTally => "start_tally name [count]",
        CommandKind::UpdateCount => "update_count name count",
        CommandKind::Inc => "inc add name",
        CommandKind::Dec => "dec remove name",
        CommandKind::CheckTally => "check_tally name",
        CommandKind::DeleteTally => "delete_tally name",
        CommandKind::LastInc => "last_inc name",
    }
}

/// Turns message text into commands for messages that start with the configured prefix.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse `text` as a command.
    ///
    /// Returns `Ok(None)` for text that does not address the bot. Extra trailing arguments are
    /// ignored.
    pub fn parse(&self, text: &str) -> Result<Option<TallyCommand>, ParseError> {
        let Some(body) = text.trim_start().strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };

        let tokens = tokenize(body)?;
        let mut args = tokens.into_iter();
        let Some(verb) = args.next() else {
            return Ok(None);
        };
        let kind = CommandKind::from_name(&verb).ok_or(ParseError::UnknownCommand(verb))?;
        let mut args = Args { kind, args };

        let command = match kind {
            CommandKind::StartTally => TallyCommand::StartTally {
                name: args.text("name")?,
                start_count: args.optional_integer("count")?.unwrap_or(0),
            },
            CommandKind::UpdateCount => TallyCommand::UpdateCount {
                name: args.text("name")?,
                count: args.integer("count")?,
            },
            CommandKind::Inc => TallyCommand::Increment {
                add: args.integer("add")?,
                name: args.text("name")?,
            },
            CommandKind::Dec => TallyCommand::Decrement {
                remove: args.integer("remove")?,
                name: args.text("name")?,
            },
            CommandKind::CheckTally => TallyCommand::CheckTally {
                name: args.text("name")?,
            },
            CommandKind::DeleteTally => TallyCommand::DeleteTally {
                name: args.text("name")?,
            },
            CommandKind::LastInc => TallyCommand::LastIncrement {
                name: args.text("name")?,
            },
        };

        Ok(Some(command))
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

struct Args<I> {
    kind: CommandKind,
    args: I,
}

impl<I: Iterator<Item = String>> Args<I> {
    fn text(&mut self, argument: &'static str) -> Result<String, ParseError> {
        self.args
            .next()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ParseError::MissingArgument {
                command: self.kind,
                argument,
            })
    }

    fn integer(&mut self, argument: &'static str) -> Result<i64, ParseError> {
        let value = self.text(argument)?;
        self.to_integer(argument, value)
    }

    fn optional_integer(&mut self, argument: &'static str) -> Result<Option<i64>, ParseError> {
        self.args
            .next()
            .map(|value| self.to_integer(argument, value))
            .transpose()
    }

    fn to_integer(&self, argument: &'static str, value: String) -> Result<i64, ParseError> {
        value.parse().map_err(|_| ParseError::InvalidInteger {
            command: self.kind,
            argument,
            value,
        })
    }
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(body: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in body.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
