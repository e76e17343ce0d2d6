use std::path::PathBuf;

/// Indicates that the store could not complete a load or save.
#[derive(Debug, thiserror::Error)]
pub enum StorageUnavailable {
    /// Nothing has been persisted yet.
    #[error("no database found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read database at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database at {} is not valid", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode database")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write database to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An in-process store was poisoned by a panicking writer.
    #[error("store poisoned")]
    Poisoned,
}

impl StorageUnavailable {
    /// Whether this only means that nothing was persisted yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}
