use crate::store::StorageUnavailable;

/// Errors surfaced by the [`SessionCoordinator`](super::SessionCoordinator). Engine-level
/// conditions are never errors; see [`Outcome`](crate::state_machine::tally::Outcome).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The store failed to load or save. Nothing from the operation was committed.
    #[error("storage unavailable")]
    Storage(#[from] StorageUnavailable),

    /// The coordinator was drained and accepts no further operations.
    #[error("coordinator is shutting down")]
    ShuttingDown,

    /// The engine accepted a command without reporting an outcome.
    #[error("engine produced no outcome")]
    NoOutcome,

    /// The blocking task running the operation was cancelled or panicked.
    #[error("operation task aborted")]
    Aborted,
}
