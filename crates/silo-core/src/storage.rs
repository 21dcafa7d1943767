//! Object-store capability for manifest reads.
//!
//! The reconcile driver only needs two operations from the object store:
//! fetch a whole object body by `(bucket, key)` and, for fixtures and the
//! single-process deployment, write one. The trait is deliberately narrow so
//! the driver can be tested against the in-memory backend. A filesystem
//! backend maps buckets to directories for local deployments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Object-store capability used by Silo components.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns [`Error::NotFound`] if the object doesn't exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Writes an object unconditionally, creating or replacing it.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;
}

/// In-memory object store for testing and single-process deployment.
///
/// Thread-safe via `RwLock`. Not durable.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), Bytes>>>,
}

impl MemoryObjectStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object not found: {bucket}/{key}")))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}

/// Filesystem-backed object store: one directory per bucket.
///
/// Suitable for local single-process deployments where producers drop files
/// under a shared data root. Keys map to paths relative to the bucket
/// directory; keys containing a `..` segment are rejected.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        if key.split('/').any(|segment| segment == "..") || bucket.contains("..") {
            return Err(Error::InvalidInput(format!(
                "object key escapes the bucket: {bucket}/{key}"
            )));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object not found: {bucket}/{key}")))
            }
            Err(e) => Err(Error::storage_with_source(
                format!("failed to read {bucket}/{key}"),
                e,
            )),
        }
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_with_source(format!("failed to create {bucket} directories"), e)
            })?;
        }
        tokio::fs::write(&path, &data).await.map_err(|e| {
            Error::storage_with_source(format!("failed to write {bucket}/{key}"), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryObjectStore::new();
        store
            .put("bucket", "job1-upload/job1-manifest.txt", Bytes::from("a\nb"))
            .await
            .expect("put should succeed");

        let body = store
            .get("bucket", "job1-upload/job1-manifest.txt")
            .await
            .expect("get should succeed");
        assert_eq!(body, Bytes::from("a\nb"));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store
            .get("bucket", "absent")
            .await
            .expect_err("get should fail");
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn put_replaces_existing_object() {
        let store = MemoryObjectStore::new();
        store
            .put("bucket", "key", Bytes::from("v1"))
            .await
            .expect("put should succeed");
        store
            .put("bucket", "key", Bytes::from("v2"))
            .await
            .expect("put should succeed");

        let body = store.get("bucket", "key").await.expect("get should succeed");
        assert_eq!(body, Bytes::from("v2"));
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let store = FsObjectStore::new("/tmp/silo-test-data");
        let err = store
            .get("bucket", "../outside")
            .await
            .expect_err("get should fail");
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
