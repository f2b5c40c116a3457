//! The execution metadata store: a durable key/value bag scoped to one
//! orchestration attempt.
//!
//! The controller reads and writes this store to make its own steps
//! idempotent across process restarts. The store is owned and persisted by
//! the caller; the controller only goes through the narrow [`MetadataStore`]
//! interface and assumes the content can be stale across any call boundary.
//!
//! Invariant: once a flag key is written it is never silently reset within
//! the same attempt. The controller only ever reads-then-conditionally-writes
//! flags; blind overwrites happen only for the remote job id when a dead
//! remote job is deliberately replaced.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Error raised when the caller-provided store cannot persist.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MetadataError {
    /// What went wrong.
    pub message: String,
}

impl MetadataError {
    /// Creates a new metadata error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Durable key/value storage for one orchestration attempt.
///
/// `persist` is the explicit durability point: the controller calls it after
/// each state transition it wants to survive a crash.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Gets a value by key.
    async fn get(&self, key: &str) -> Option<String>;

    /// Sets a value. Not durable until [`MetadataStore::persist`] is called.
    async fn set(&self, key: &str, value: &str);

    /// Flushes all pending writes to durable storage.
    async fn persist(&self) -> Result<(), MetadataError>;
}

/// Metadata key layout.
///
/// Upload and ready flags are namespaced per remote job id. A local job that
/// is resubmitted as a brand-new remote job after a failed attempt therefore
/// starts with clean flags; stale `done` markers from the dead attempt can
/// never suppress a required upload.
pub mod keys {
    use crate::job::RemoteJobId;

    /// Key holding the remote job id of the current attempt.
    pub const REMOTE_JOB_ID: &str = "remote.job.id";

    /// Key marking one artifact upload as completed for the given remote job.
    #[must_use]
    pub fn upload_done(job_id: RemoteJobId, artifact: &str) -> String {
        format!("remote.job.{job_id}.upload.{artifact}.done")
    }

    /// Key marking the given remote job as marked-ready-to-start.
    #[must_use]
    pub fn marked_ready(job_id: RemoteJobId) -> String {
        format!("remote.job.{job_id}.marked.ready")
    }
}

/// Returns true if a stored value represents a set flag.
#[must_use]
pub fn is_flag_set(value: Option<&str>) -> bool {
    matches!(value, Some("true"))
}

/// In-memory metadata store.
///
/// Suitable for tests and for embedders that handle durability themselves
/// (every write is immediately visible, `persist` is a no-op).
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryMetadataStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns a snapshot of all entries.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    async fn persist(&self) -> Result<(), MetadataError> {
        Ok(())
    }
}
