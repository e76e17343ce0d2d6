use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, trace};

use super::{Store, StorageUnavailable};
use crate::model::Database;

/// A [`Store`] that keeps the [`Database`] as a single JSON document.
///
/// Saves write a sibling `<file>.tmp`, sync it, then rename it over the document, so a failed
/// save leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("data.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_err(&self, source: io::Error) -> StorageUnavailable {
        StorageUnavailable::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Database, StorageUnavailable> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageUnavailable::Missing {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(StorageUnavailable::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // A freshly touched file counts as never written.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(StorageUnavailable::Missing {
                path: self.path.clone(),
            });
        }

        let db = serde_json::from_slice(&bytes).map_err(|source| StorageUnavailable::Decode {
            path: self.path.clone(),
            source,
        })?;

        trace!(path = %self.path.display(), bytes = bytes.len(), "Loaded database");
        Ok(db)
    }

    fn save(&self, db: &Database) -> Result<(), StorageUnavailable> {
        let encoded = serde_json::to_vec(db).map_err(StorageUnavailable::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        let temp_path = self.temp_path();
        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(&encoded)?;
            file.sync_all()
        });

        if let Err(e) = written.and_then(|()| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.write_err(e));
        }

        debug!(
            path = %self.path.display(),
            guilds = db.guild_count(),
            bytes = encoded.len(),
            "Saved database"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild::GuildId;
    use crate::model::{HistoryEntry, Tally};
    use tempfile::TempDir;

    fn sample_db() -> Database {
        let mut db = Database::new();
        db.get_or_create(&GuildId::from("1"))
            .insert("coffee", Tally::new(2, vec![HistoryEntry::Unknown; 2]));
        db.get_or_create(&GuildId::from("2"))
            .insert("tea", Tally::new(0, Vec::new()));
        db
    }

    #[test]
    fn test_missing_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));

        let err = store.load().unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_empty_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, b"  \n").unwrap();

        assert!(JsonFileStore::new(path).load().unwrap_err().is_missing());
    }

    #[test]
    fn test_corrupt_file_is_not_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, b"{\"1\": {\"coffee\": [1,").unwrap();

        let err = JsonFileStore::new(path).load().unwrap_err();
        assert!(matches!(err, StorageUnavailable::Decode { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        let db = sample_db();

        store.save(&db).unwrap();
        assert_eq!(store.load().unwrap(), db);
    }

    #[test]
    fn test_save_replaces_whole_document_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));

        store.save(&sample_db()).unwrap();
        store.save(&Database::new()).unwrap();

        assert_eq!(store.load().unwrap(), Database::new());
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("state").join("data.json"));

        store.save(&sample_db()).unwrap();
        assert_eq!(store.load().unwrap(), sample_db());
    }

    #[test]
    fn test_failed_save_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample_db()).unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(dir.path().join("data.json.tmp")).unwrap();
        let err = store.save(&Database::new()).unwrap_err();

        assert!(matches!(err, StorageUnavailable::Write { .. }));
        assert_eq!(store.load().unwrap(), sample_db());
    }

    #[test]
    fn test_reads_document_written_by_earlier_releases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(
            &path,
            br#"{"123": {"coffee": [2, ["UNKNOWN", "14:02:11 2023-11-30"]]}, "456": {}}"#,
        )
        .unwrap();

        let db = JsonFileStore::new(path).load().unwrap();
        assert_eq!(db.guild_count(), 2);
        assert_eq!(
            db.guild(&GuildId::from("123"))
                .unwrap()
                .get("coffee")
                .unwrap()
                .count,
            2
        );
    }
}
