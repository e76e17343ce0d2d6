//! Durable storage of the whole [`Database`].
//!
//! A [`Store`] never caches: every [`load`](Store::load) goes back to the backing medium, which
//! stays the single source of truth. Callers serialize load/save pairs themselves (see
//! [`SessionCoordinator`](crate::session::SessionCoordinator)).

pub mod error;
mod json_file;
mod memory;

pub use error::StorageUnavailable;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::model::Database;

pub trait Store: Send + Sync {
    /// Read the entire persisted state.
    ///
    /// Returns [`StorageUnavailable::Missing`] when nothing was ever persisted; callers start from
    /// an empty [`Database`] in that case.
    fn load(&self) -> Result<Database, StorageUnavailable>;

    /// Replace the entire persisted state with `db`. All or nothing.
    fn save(&self, db: &Database) -> Result<(), StorageUnavailable>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn load(&self) -> Result<Database, StorageUnavailable> {
        (**self).load()
    }

    fn save(&self, db: &Database) -> Result<(), StorageUnavailable> {
        (**self).save(db)
    }
}
