use std::collections::VecDeque;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};

use super::StateMachine;
use super::wrappers::input::SystemInput;
use crate::model::{GuildState, HistoryEntry, Tally};

/// Default cap on the `UNKNOWN` entries a single command may synthesize.
pub const DEFAULT_BACKFILL_LIMIT: u64 = 100_000;

/// Largest backfill limit accepted. Bounds the memory a single command can allocate.
pub const MAX_BACKFILL_LIMIT: u64 = 10_000_000;

/// An operation against one guild's tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyCommand {
    StartTally { name: String, start_count: i64 },
    UpdateCount { name: String, count: i64 },
    Increment { name: String, add: i64 },
    Decrement { name: String, remove: i64 },
    CheckTally { name: String },
    DeleteTally { name: String },
    LastIncrement { name: String },
}

impl TallyCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::StartTally { .. } => CommandKind::StartTally,
            Self::UpdateCount { .. } => CommandKind::UpdateCount,
            Self::Increment { .. } => CommandKind::Inc,
            Self::Decrement { .. } => CommandKind::Dec,
            Self::CheckTally { .. } => CommandKind::CheckTally,
            Self::DeleteTally { .. } => CommandKind::DeleteTally,
            Self::LastIncrement { .. } => CommandKind::LastInc,
        }
    }

    /// Name of the tally the command targets.
    pub fn name(&self) -> &str {
        match self {
            Self::StartTally { name, .. }
            | Self::UpdateCount { name, .. }
            | Self::Increment { name, .. }
            | Self::Decrement { name, .. }
            | Self::CheckTally { name }
            | Self::DeleteTally { name }
            | Self::LastIncrement { name } => name,
        }
    }
}

/// The command surface, named the way users type it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    StartTally,
    UpdateCount,
    Inc,
    Dec,
    CheckTally,
    DeleteTally,
    LastInc,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        Self::StartTally,
        Self::UpdateCount,
        Self::Inc,
        Self::Dec,
        Self::CheckTally,
        Self::DeleteTally,
        Self::LastInc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTally => "start_tally",
            Self::UpdateCount => "update_count",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::CheckTally => "check_tally",
            Self::DeleteTally => "delete_tally",
            Self::LastInc => "last_inc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a [`TallyCommand`]. Every engine-level condition is reported here as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created {
        name: String,
        count: i64,
    },
    AlreadyExists {
        name: String,
        count: i64,
    },
    Updated {
        name: String,
        count: i64,
    },
    Increased {
        name: String,
        count: i64,
    },
    Decreased {
        name: String,
        count: i64,
    },
    Status {
        name: String,
        count: i64,
        last_entry: Option<HistoryEntry>,
    },
    Deleted {
        name: String,
    },
    Elapsed {
        name: String,
        elapsed: TimeDelta,
    },
    NoCount {
        name: String,
    },
    NoHistory {
        name: String,
        count: i64,
    },
    UnknownElapsed {
        name: String,
    },
    NotFound {
        name: String,
    },
    /// A decrement asked to remove more history entries than exist.
    Underflow {
        name: String,
        requested: i64,
        available: usize,
    },
    /// A start or update would synthesize more `UNKNOWN` entries than allowed.
    BackfillTooLarge {
        name: String,
        requested: u64,
        limit: u64,
    },
    /// The resulting count does not fit in an `i64`.
    CountOutOfRange {
        name: String,
    },
    /// The tally name is empty or only whitespace.
    InvalidName {
        name: String,
    },
}

impl Outcome {
    /// Whether the command was refused and the state left untouched for that reason.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Underflow { .. }
                | Self::BackfillTooLarge { .. }
                | Self::CountOutOfRange { .. }
                | Self::InvalidName { .. }
        )
    }
}

pub type TallyInput = SystemInput<TallyCommand, NaiveDateTime>;

/// The tally engine for one guild.
///
/// Holds a snapshot of a [`GuildState`] and applies commands to it. The current time is injected
/// through [`SystemInput::System`]; until a time is provided, modifications are recorded as
/// [`HistoryEntry::Unknown`] and elapsed time cannot be computed.
#[derive(Debug)]
pub struct TallyMachine {
    state: GuildState,
    now: Option<NaiveDateTime>,
    backfill_limit: u64,
    modified: bool,
    pending_outcomes: VecDeque<Outcome>,
}

impl TallyMachine {
    pub fn new(state: GuildState) -> Self {
        Self {
            state,
            now: None,
            backfill_limit: DEFAULT_BACKFILL_LIMIT,
            modified: false,
            pending_outcomes: VecDeque::new(),
        }
    }

    /// Limits above [`MAX_BACKFILL_LIMIT`] are clamped to it.
    pub fn with_backfill_limit(mut self, backfill_limit: u64) -> Self {
        self.backfill_limit = backfill_limit.min(MAX_BACKFILL_LIMIT);
        self
    }

    pub fn state(&self) -> &GuildState {
        &self.state
    }

    /// Consume the machine, returning the (possibly modified) guild state.
    pub fn into_state(self) -> GuildState {
        self.state
    }

    /// Whether any processed command changed the guild state.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_now(&mut self, now: NaiveDateTime) {
        self.now = Some(now);
    }

    fn stamp(&self) -> HistoryEntry {
        self.now.map_or(HistoryEntry::Unknown, HistoryEntry::At)
    }

    fn apply(&mut self, command: TallyCommand) -> Outcome {
        if !is_valid_name(command.name()) {
            return Outcome::InvalidName {
                name: command.name().to_string(),
            };
        }

        match command {
            TallyCommand::StartTally { name, start_count } => self.start_tally(name, start_count),
            TallyCommand::UpdateCount { name, count } => self.update_count(&name, count),
            TallyCommand::Increment { name, add } => self.increment(&name, add),
            TallyCommand::Decrement { name, remove } => self.decrement(&name, remove),
            TallyCommand::CheckTally { name } => self.check_tally(&name),
            TallyCommand::DeleteTally { name } => self.delete_tally(&name),
            TallyCommand::LastIncrement { name } => self.last_increment(&name),
        }
    }

    pub fn start_tally(&mut self, name: impl Into<String>, start_count: i64) -> Outcome {
        let name = name.into();
        if !is_valid_name(&name) {
            return Outcome::InvalidName { name };
        }
        if let Some(existing) = self.state.get(&name) {
            return Outcome::AlreadyExists {
                count: existing.count,
                name,
            };
        }

        // A negative start asserts no observed modifications.
        let backfill = u64::try_from(start_count).unwrap_or(0);
        if backfill > self.backfill_limit {
            return Outcome::BackfillTooLarge {
                name,
                requested: backfill,
                limit: self.backfill_limit,
            };
        }

        let history = vec![HistoryEntry::Unknown; backfill as usize];
        self.state
            .insert(name.clone(), Tally::new(start_count, history));
        self.modified = true;

        Outcome::Created {
            name,
            count: start_count,
        }
    }

    /// Set the count outright. A jump of more than one backfills `UNKNOWN` entries for the
    /// unobserved steps; a decrease still appends one entry and removes nothing.
    pub fn update_count(&mut self, name: &str, count: i64) -> Outcome {
        let now = self.stamp();
        let limit = self.backfill_limit;
        let Some(tally) = self.state.get_mut(name) else {
            return not_found(name);
        };

        let gap = i128::from(count) - i128::from(tally.count) - 1;
        let backfill = u64::try_from(gap).unwrap_or(0);
        if backfill > limit {
            return Outcome::BackfillTooLarge {
                name: name.to_string(),
                requested: backfill,
                limit,
            };
        }

        tally
            .history
            .extend(std::iter::repeat_n(HistoryEntry::Unknown, backfill as usize));
        tally.history.push(now);
        tally.count = count;
        self.modified = true;

        Outcome::Updated {
            name: name.to_string(),
            count,
        }
    }

    /// Add `add` to the count and record one modification, whatever the size of `add`.
    pub fn increment(&mut self, name: &str, add: i64) -> Outcome {
        let now = self.stamp();
        let Some(tally) = self.state.get_mut(name) else {
            return not_found(name);
        };

        let Some(count) = tally.count.checked_add(add) else {
            return out_of_range(name);
        };

        tally.history.push(now);
        tally.count = count;
        self.modified = true;

        Outcome::Increased {
            name: name.to_string(),
            count,
        }
    }

    /// Remove `remove` trailing history entries and subtract `remove` from the count.
    pub fn decrement(&mut self, name: &str, remove: i64) -> Outcome {
        let Some(tally) = self.state.get_mut(name) else {
            return not_found(name);
        };

        let available = tally.history.len();
        // Non-positive removals drop no history.
        let removed = usize::try_from(remove.max(0)).unwrap_or(usize::MAX);
        if removed > available {
            return Outcome::Underflow {
                name: name.to_string(),
                requested: remove,
                available,
            };
        }

        let Some(count) = tally.count.checked_sub(remove) else {
            return out_of_range(name);
        };

        tally.history.truncate(available - removed);
        tally.count = count;
        self.modified = true;

        Outcome::Decreased {
            name: name.to_string(),
            count,
        }
    }

    pub fn check_tally(&self, name: &str) -> Outcome {
        match self.state.get(name) {
            Some(tally) => Outcome::Status {
                name: name.to_string(),
                count: tally.count,
                last_entry: tally.last_entry().cloned(),
            },
            None => not_found(name),
        }
    }

    pub fn delete_tally(&mut self, name: &str) -> Outcome {
        match self.state.remove(name) {
            Some(_) => {
                self.modified = true;
                Outcome::Deleted {
                    name: name.to_string(),
                }
            }
            None => not_found(name),
        }
    }

    /// Time since the last recorded modification. Never fails: sentinel or malformed entries,
    /// or a missing clock, degrade to [`Outcome::UnknownElapsed`].
    pub fn last_increment(&self, name: &str) -> Outcome {
        let Some(tally) = self.state.get(name) else {
            return not_found(name);
        };
        let name = name.to_string();

        if tally.count == 0 {
            return Outcome::NoCount { name };
        }

        let Some(last) = tally.last_entry() else {
            return Outcome::NoHistory {
                name,
                count: tally.count,
            };
        };

        match (self.now, last.timestamp()) {
            (Some(now), Some(at)) => Outcome::Elapsed {
                name,
                elapsed: now.signed_duration_since(at),
            },
            _ => Outcome::UnknownElapsed { name },
        }
    }
}

/// Tally names must contain something other than whitespace.
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
}

fn not_found(name: &str) -> Outcome {
    Outcome::NotFound {
        name: name.to_string(),
    }
}

fn out_of_range(name: &str) -> Outcome {
    Outcome::CountOutOfRange {
        name: name.to_string(),
    }
}

impl StateMachine for TallyMachine {
    type Input = TallyInput;
    type Output = Outcome;

    fn process_input(&mut self, input: Self::Input) {
        match input {
            SystemInput::System(now) => self.set_now(now),
            SystemInput::Input(command) => {
                let outcome = self.apply(command);
                self.pending_outcomes.push_back(outcome);
            }
        }
    }

    fn poll_output(&mut self) -> Option<Self::Output> {
        self.pending_outcomes.pop_front()
    }
}
