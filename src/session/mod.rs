//! Serializes engine invocations against the [`Store`] so each command is observed as atomic.
//!
//! The store persists the whole [`Database`] on every save, so two overlapping load/save spans
//! would lose whichever update saved first, even across different guilds. The coordinator
//! therefore holds a single exclusive section around the full load → apply → save span.

pub mod error;
mod operation;

use std::sync::{Arc, Mutex, MutexGuard};

use bon::Builder;
use chrono::NaiveDateTime;
use tracing::{debug, error, info, info_span, warn};

pub use self::error::SessionError;
pub use self::operation::OperationId;
use crate::guild::GuildId;
use crate::model::Database;
use crate::state_machine::StateMachine;
use crate::state_machine::tally::{DEFAULT_BACKFILL_LIMIT, Outcome, TallyCommand, TallyMachine};
use crate::state_machine::wrappers::input::{SystemInput, SystemResource};
use crate::store::Store;

/// How guilds map onto stored tally namespaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Tenancy {
    /// Each guild owns its own tallies.
    #[default]
    PerGuild,
    /// Every guild shares the single [`GuildId::GLOBAL`] namespace.
    Single,
}

/// Configuration for the [`SessionCoordinator`].
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    #[builder(default)]
    pub tenancy: Tenancy,

    /// Cap on `UNKNOWN` entries a single command may synthesize.
    #[builder(default = DEFAULT_BACKFILL_LIMIT)]
    pub backfill_limit: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Default)]
struct Gate {
    draining: bool,
    completed: u64,
}

/// Runs tally commands against a [`Store`], one at a time.
#[derive(Debug)]
pub struct SessionCoordinator<S> {
    store: S,
    config: SessionConfig,
    gate: Mutex<Gate>,
}

impl<S: Store> SessionCoordinator<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            gate: Mutex::new(Gate::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The namespace a command from `guild_id` operates on.
    pub fn scope(&self, guild_id: &GuildId) -> GuildId {
        match self.config.tenancy {
            Tenancy::PerGuild => guild_id.clone(),
            Tenancy::Single => GuildId::global(),
        }
    }

    /// Apply `command` to the tallies of `guild_id` and persist the result.
    ///
    /// If the save fails the returned error is [`SessionError::Storage`] and nothing from the
    /// command is committed.
    pub fn execute(
        &self,
        guild_id: &GuildId,
        command: TallyCommand,
    ) -> Result<Outcome, SessionError> {
        let operation = OperationId::generate();
        let scope = self.scope(guild_id);
        let span = info_span!(
            "tally_command",
            operation = %operation,
            guild = %scope,
            command = %command.kind(),
        );
        let _entered = span.enter();

        let mut gate = self.enter()?;
        let mut db = self.load()?;

        let created = db.register(&scope);
        let state = std::mem::take(db.get_or_create(&scope));

        let mut machine = TallyMachine::new(state).with_backfill_limit(self.config.backfill_limit);
        machine.process_input(SystemInput::System(NaiveDateTime::generate()));
        machine.process_input(SystemInput::Input(command));
        let Some(outcome) = machine.poll_output() else {
            return Err(SessionError::NoOutcome);
        };

        if machine.is_modified() || created {
            db.put(scope, machine.into_state());
            self.save(&db)?;
        }

        gate.completed += 1;
        if outcome.is_rejection() {
            warn!(?outcome, "Command rejected");
        } else {
            debug!(?outcome, "Command applied");
        }

        Ok(outcome)
    }

    /// Persist an empty tally namespace for a guild the bot joined. Returns whether one was
    /// created; an existing namespace is left untouched.
    pub fn register_guild(&self, guild_id: &GuildId) -> Result<bool, SessionError> {
        let scope = self.scope(guild_id);
        let mut gate = self.enter()?;
        let mut db = self.load()?;

        let created = db.register(&scope);
        if created {
            self.save(&db)?;
            info!(guild = %scope, "Guild registered");
        }

        gate.completed += 1;
        Ok(created)
    }

    /// Wait for the in-flight operation, if any, then refuse all further operations.
    ///
    /// Once this returns no save is in progress and none will start.
    pub fn drain(&self) {
        let mut gate = self.lock_gate();
        if !gate.draining {
            gate.draining = true;
            info!(completed = gate.completed, "Coordinator drained");
        }
    }

    pub fn is_draining(&self) -> bool {
        self.lock_gate().draining
    }

    /// The store is the only durable state, so a panic inside the section leaves nothing to
    /// repair here.
    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(|poisoned| {
            warn!("Previous operation panicked inside the exclusive section, continuing");
            poisoned.into_inner()
        })
    }

    fn enter(&self) -> Result<MutexGuard<'_, Gate>, SessionError> {
        let gate = self.lock_gate();
        if gate.draining {
            return Err(SessionError::ShuttingDown);
        }
        Ok(gate)
    }

    fn load(&self) -> Result<Database, SessionError> {
        match self.store.load() {
            Ok(db) => Ok(db),
            Err(e) if e.is_missing() => {
                info!("No stored tallies yet, starting empty");
                Ok(Database::new())
            }
            Err(e) => {
                error!(error = %e, "Failed to load tallies");
                Err(e.into())
            }
        }
    }

    fn save(&self, db: &Database) -> Result<(), SessionError> {
        self.store.save(db).map_err(|e| {
            error!(error = %e, "Failed to save tallies, command not committed");
            SessionError::from(e)
        })
    }
}

impl<S: Store + 'static> SessionCoordinator<S> {
    /// [`execute`](Self::execute) on the blocking pool, for callers on an async runtime.
    pub async fn dispatch(
        self: Arc<Self>,
        guild_id: GuildId,
        command: TallyCommand,
    ) -> Result<Outcome, SessionError> {
        tokio::task::spawn_blocking(move || self.execute(&guild_id, command))
            .await
            .map_err(|_| SessionError::Aborted)?
    }

    /// [`drain`](Self::drain) on the blocking pool.
    pub async fn drain_async(self: Arc<Self>) -> Result<(), SessionError> {
        tokio::task::spawn_blocking(move || self.drain())
            .await
            .map_err(|_| SessionError::Aborted)
    }
}
