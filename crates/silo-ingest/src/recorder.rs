//! Metadata recording for upload events.
//!
//! One record per `(set_id, object_key)` pair. Writes are idempotent upserts
//! with no read-modify-write: a later notification for the same key simply
//! overwrites size and time. The store tracks *presence* of uploads, not
//! history, which is the deliberate consistency model. Data and manifest
//! events are recorded identically; the kind is not persisted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use silo_core::error::{Error, Result};
use silo_core::event::UploadEvent;

/// One persisted row per uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Dataset the object belongs to (partition key).
    pub set_id: String,
    /// Full object key (sort key; unique within a dataset).
    pub object_key: String,
    /// Bucket the object was uploaded to.
    pub bucket_name: String,
    /// Object size in bytes, last known.
    pub object_size: i64,
    /// Upload time in epoch seconds, last known.
    pub event_time: i64,
}

impl UploadRecord {
    /// Builds a record from an upload event.
    #[must_use]
    pub fn from_event(event: &UploadEvent) -> Self {
        Self {
            set_id: event.set_id.clone(),
            object_key: event.object_key.clone(),
            bucket_name: event.bucket_name.clone(),
            object_size: event.object_size,
            event_time: event.event_time,
        }
    }
}

/// Capability trait over the durable keyed store.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Idempotent upsert keyed by `(set_id, object_key)`.
    async fn record(&self, record: UploadRecord) -> Result<()>;

    /// Returns the unordered `object_key` projection for one dataset.
    ///
    /// This is the snapshot read the reconcile comparison uses; it is scoped
    /// to a single dataset, so concurrent runs never interfere.
    async fn set_keys(&self, set_id: &str) -> Result<Vec<String>>;
}

/// Stored attributes for one record (everything but the composite key).
#[derive(Debug, Clone)]
struct RecordAttrs {
    bucket_name: String,
    object_size: i64,
    event_time: i64,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// In-memory record store for testing and single-process deployment.
///
/// Thread-safe via `RwLock`. Not durable.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    sets: RwLock<HashMap<String, HashMap<String, RecordAttrs>>>,
}

impl MemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records held for one dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the interior lock is poisoned.
    pub fn record_count(&self, set_id: &str) -> Result<usize> {
        let sets = self.sets.read().map_err(poison_err)?;
        Ok(sets.get(set_id).map_or(0, HashMap::len))
    }

    /// Returns one record, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the interior lock is poisoned.
    pub fn get(&self, set_id: &str, object_key: &str) -> Result<Option<UploadRecord>> {
        let sets = self.sets.read().map_err(poison_err)?;
        Ok(sets.get(set_id).and_then(|records| {
            records.get(object_key).map(|attrs| UploadRecord {
                set_id: set_id.to_string(),
                object_key: object_key.to_string(),
                bucket_name: attrs.bucket_name.clone(),
                object_size: attrs.object_size,
                event_time: attrs.event_time,
            })
        }))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn record(&self, record: UploadRecord) -> Result<()> {
        let mut sets = self.sets.write().map_err(poison_err)?;
        sets.entry(record.set_id).or_default().insert(
            record.object_key,
            RecordAttrs {
                bucket_name: record.bucket_name,
                object_size: record.object_size,
                event_time: record.event_time,
            },
        );
        Ok(())
    }

    async fn set_keys(&self, set_id: &str) -> Result<Vec<String>> {
        let sets = self.sets.read().map_err(poison_err)?;
        Ok(sets
            .get(set_id)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }
}

/// Persists upload events into a [`RecordStore`].
pub struct Recorder {
    store: Arc<dyn RecordStore>,
}

impl Recorder {
    /// Creates a recorder over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Records one upload event. Data and manifest uploads are recorded
    /// identically.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn record_event(&self, event: &UploadEvent) -> Result<()> {
        tracing::debug!(
            set_id = %event.set_id,
            object_key = %event.object_key,
            "recording upload metadata"
        );
        self.store.record(UploadRecord::from_event(event)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(set_id: &str, object_key: &str, size: i64, time: i64) -> UploadEvent {
        UploadEvent {
            set_id: set_id.to_string(),
            event_time: time,
            bucket_name: "upload-bucket".to_string(),
            object_key: object_key.to_string(),
            object_size: size,
        }
    }

    #[tokio::test]
    async fn records_and_projects_keys() {
        let store = Arc::new(MemoryRecordStore::new());
        let recorder = Recorder::new(store.clone());

        recorder
            .record_event(&event("job1", "job1-upload/a.csv", 1, 100))
            .await
            .expect("record should succeed");
        recorder
            .record_event(&event("job1", "job1-upload/b.csv", 2, 101))
            .await
            .expect("record should succeed");
        recorder
            .record_event(&event("job2", "job2-upload/c.csv", 3, 102))
            .await
            .expect("record should succeed");

        let mut keys = store.set_keys("job1").await.expect("set_keys");
        keys.sort();
        assert_eq!(keys, vec!["job1-upload/a.csv", "job1-upload/b.csv"]);

        let other = store.set_keys("job2").await.expect("set_keys");
        assert_eq!(other, vec!["job2-upload/c.csv"]);
    }

    #[tokio::test]
    async fn reupload_overwrites_without_duplicating() {
        let store = Arc::new(MemoryRecordStore::new());
        let recorder = Recorder::new(store.clone());

        recorder
            .record_event(&event("job1", "job1-upload/a.csv", 10, 100))
            .await
            .expect("record should succeed");
        recorder
            .record_event(&event("job1", "job1-upload/a.csv", 20, 200))
            .await
            .expect("record should succeed");

        assert_eq!(store.record_count("job1").expect("count"), 1);

        let record = store
            .get("job1", "job1-upload/a.csv")
            .expect("get")
            .expect("record exists");
        assert_eq!(record.object_size, 20);
        assert_eq!(record.event_time, 200);
    }

    #[tokio::test]
    async fn unknown_set_has_no_keys() {
        let store = MemoryRecordStore::new();
        assert!(store.set_keys("absent").await.expect("set_keys").is_empty());
    }
}
