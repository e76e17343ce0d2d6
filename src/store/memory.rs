use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Store, StorageUnavailable};
use crate::model::Database;

/// A [`Store`] held in process memory. Useful for tests and ephemeral deployments.
///
/// Loads hand out a copy, so callers observe the same copy-on-load semantics as a file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: Mutex<Option<Database>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `db`.
    pub fn with_database(db: Database) -> Self {
        Self {
            db: Mutex::new(Some(db)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Database, StorageUnavailable> {
        let db = self.db.lock().map_err(|_| StorageUnavailable::Poisoned)?;
        db.clone().ok_or_else(|| StorageUnavailable::Missing {
            path: "<memory>".into(),
        })
    }

    fn save(&self, db: &Database) -> Result<(), StorageUnavailable> {
        let mut slot = self.db.lock().map_err(|_| StorageUnavailable::Poisoned)?;
        *slot = Some(db.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild::GuildId;

    #[test]
    fn test_empty_store_is_missing() {
        assert!(MemoryStore::new().load().unwrap_err().is_missing());
    }

    #[test]
    fn test_loads_are_independent_copies() {
        let store = MemoryStore::with_database(Database::new());

        let mut copy = store.load().unwrap();
        copy.register(&GuildId::from("1"));

        assert_eq!(store.load().unwrap().guild_count(), 0);
        store.save(&copy).unwrap();
        assert_eq!(store.load().unwrap().guild_count(), 1);
        assert_eq!(store.save_count(), 1);
    }
}
