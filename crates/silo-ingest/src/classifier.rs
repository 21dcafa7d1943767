//! Classifies upload notifications into data or manifest upload events.
//!
//! Object keys under a managed job directory are structured as
//! `<set_id>-<job_dir_suffix>/<...>/<filename>`. The first path segment
//! decides everything: a segment that does not end with the configured
//! job-directory suffix means the object is not part of any managed dataset
//! and the notification is dropped without an event. Otherwise the set id is
//! the segment's text before its first `-`, and a key ending in
//! `<set_id><manifest_suffix>` is the dataset's manifest.
//!
//! Classification is a pure function of the key and the configured suffixes:
//! identical input always yields the identical `(kind, set_id)` pair.

use silo_core::config::SiloConfig;
use silo_core::error::Result;
use silo_core::event::{UploadEvent, UploadKind};

use crate::notification::UploadNotification;

/// One classified upload: the kind plus the event body to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUpload {
    /// Whether the object is a data file or the dataset's manifest.
    pub kind: UploadKind,
    /// The event body, carried unchanged through recording and reconciliation.
    pub event: UploadEvent,
}

/// Classifies upload notifications against the configured suffixes.
#[derive(Debug, Clone)]
pub struct Classifier {
    job_dir_suffix: String,
    manifest_suffix: String,
}

impl Classifier {
    /// Creates a classifier from the startup configuration.
    #[must_use]
    pub fn new(config: &SiloConfig) -> Self {
        Self {
            job_dir_suffix: config.job_dir_suffix.clone(),
            manifest_suffix: config.manifest_suffix.clone(),
        }
    }

    /// Classifies one notification.
    ///
    /// Returns `Ok(None)` when the object does not live under a managed job
    /// directory; such notifications are dropped silently by contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification timestamp cannot be parsed. No
    /// partial event is emitted in that case.
    pub fn classify(&self, notification: &UploadNotification) -> Result<Option<ClassifiedUpload>> {
        let object_key = notification.detail.object_key.as_str();

        let job_dir = match object_key.find('/') {
            Some(i) => &object_key[..i],
            None => object_key,
        };
        if !job_dir.ends_with(&self.job_dir_suffix) {
            tracing::debug!(object_key, "object outside managed job directories, dropping");
            return Ok(None);
        }

        let set_id = match job_dir.find('-') {
            Some(i) => &job_dir[..i],
            None => job_dir,
        };

        let event_time = notification.event_time_epoch()?;

        let manifest_name = format!("{set_id}{}", self.manifest_suffix);
        let kind = if object_key.ends_with(&manifest_name) {
            UploadKind::Manifest
        } else {
            UploadKind::Data
        };

        Ok(Some(ClassifiedUpload {
            kind,
            event: UploadEvent {
                set_id: set_id.to_string(),
                event_time,
                bucket_name: notification.detail.bucket_name.clone(),
                object_key: object_key.to_string(),
                object_size: notification.detail.object_size,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationDetail;

    fn classifier() -> Classifier {
        Classifier::new(&SiloConfig::new("-upload", "-manifest.txt"))
    }

    fn notification(object_key: &str) -> UploadNotification {
        UploadNotification {
            detail: NotificationDetail {
                object_key: object_key.to_string(),
                object_size: 42,
                bucket_name: "upload-bucket".to_string(),
            },
            time: "2026-08-06T10:15:00Z".to_string(),
        }
    }

    #[test]
    fn data_file_under_managed_directory() {
        let classified = classifier()
            .classify(&notification("job1-upload/a.csv"))
            .expect("classify should succeed")
            .expect("object is managed");

        assert_eq!(classified.kind, UploadKind::Data);
        assert_eq!(classified.event.set_id, "job1");
        assert_eq!(classified.event.object_key, "job1-upload/a.csv");
        assert_eq!(classified.event.bucket_name, "upload-bucket");
        assert_eq!(classified.event.object_size, 42);
    }

    #[test]
    fn manifest_file_is_detected_by_suffix() {
        let classified = classifier()
            .classify(&notification("job1-upload/job1-manifest.txt"))
            .expect("classify should succeed")
            .expect("object is managed");

        assert_eq!(classified.kind, UploadKind::Manifest);
        assert_eq!(classified.event.set_id, "job1");
    }

    #[test]
    fn nested_paths_keep_the_top_level_set_id() {
        let classified = classifier()
            .classify(&notification("job2-upload/2026/08/b.csv"))
            .expect("classify should succeed")
            .expect("object is managed");

        assert_eq!(classified.kind, UploadKind::Data);
        assert_eq!(classified.event.set_id, "job2");
    }

    #[test]
    fn unmanaged_object_is_dropped_silently() {
        let result = classifier()
            .classify(&notification("randomfile.txt"))
            .expect("classify should succeed");
        assert!(result.is_none());

        let result = classifier()
            .classify(&notification("archive/job1-upload/a.csv"))
            .expect("classify should succeed");
        assert!(result.is_none(), "suffix must match the first segment");
    }

    #[test]
    fn classification_is_idempotent() {
        let c = classifier();
        let n = notification("job1-upload/job1-manifest.txt");

        let first = c.classify(&n).expect("classify").expect("managed");
        let second = c.classify(&n).expect("classify").expect("managed");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_timestamp_fails_without_partial_event() {
        let mut n = notification("job1-upload/a.csv");
        n.time = "not-a-time".to_string();
        assert!(classifier().classify(&n).is_err());
    }
}
