pub mod command;
pub mod config;
pub mod guild;
pub mod model;
pub mod render;
pub mod secret;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod telemetry;

pub use command::CommandParser;
pub use guild::GuildId;
pub use model::{Database, GuildState, HistoryEntry, Tally};
pub use render::Renderer;
pub use session::{SessionConfig, SessionCoordinator, SessionError, Tenancy};
pub use state_machine::tally::{CommandKind, Outcome, TallyCommand, TallyMachine};
pub use store::{JsonFileStore, MemoryStore, StorageUnavailable, Store};
