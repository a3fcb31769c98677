//! Persistence seam for the ledger snapshot.
//!
//! A store holds a single serialized snapshot under one key. It knows nothing
//! about the snapshot's shape; parsing and defaulting live in the ledger.

use thiserror::Error;

/// Errors raised by a snapshot store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other backend failure (database, bridge, ...).
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Wraps a backend error, keeping it as the source.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Key-value style storage for the serialized ledger snapshot.
pub trait SnapshotStore {
    /// Reads the stored payload, or `None` if nothing was ever written.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the stored payload.
    fn write(&mut self, payload: &str) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &mut S {
    fn read(&self) -> Result<Option<String>, StoreError> {
        (**self).read()
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        (**self).write(payload)
    }
}

/// In-memory store.
///
/// Writes can be made to fail with [`MemoryStore::fail_writes`], which is how
/// tests exercise the ledger's warning path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    payload: Option<String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `payload`.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            ..Self::default()
        }
    }

    /// Makes subsequent writes fail (or succeed again).
    pub const fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// The last successfully written payload.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Number of successful writes.
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload.clone())
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::other(
                "memory store is read-only",
            )));
        }
        self.payload = Some(payload.to_string());
        self.writes += 1;
        Ok(())
    }
}
