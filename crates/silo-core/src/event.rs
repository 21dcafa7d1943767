//! Upload event payloads and the outbound event envelope.
//!
//! Producers upload objects independently; every qualifying upload
//! notification is classified into exactly one [`UploadEvent`] and published
//! wrapped in an [`EventEnvelope`]. The envelope mirrors a bus entry: a
//! category string (`detail_type`), a fixed `source`, and a JSON `detail`
//! body. The body uses kebab-case field names on the wire.
//!
//! ## Why ULID for envelope ids
//!
//! Envelope ids are ULIDs rather than UUIDv4: they sort lexicographically in
//! chronological order and embed a millisecond timestamp, which keeps any
//! downstream event log orderable without a separate sequence field.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Source attribute stamped on every outbound envelope.
pub const EVENT_SOURCE: &str = "silo.application";

/// Kind of upload observed for a dataset object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// A data file belonging to a dataset.
    Data,
    /// The manifest listing the dataset's expected file names.
    Manifest,
}

impl UploadKind {
    /// Returns the envelope category for this upload kind.
    #[must_use]
    pub const fn detail_type(self) -> &'static str {
        match self {
            Self::Data => "Data File Upload Event",
            Self::Manifest => "Manifest File Upload Event",
        }
    }
}

/// Terminal outcome of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every key listed in the manifest was recorded.
    Reconciled,
    /// The attempt budget ran out before the sets matched.
    TimedOut,
}

impl Verdict {
    /// Returns the envelope category for this verdict.
    #[must_use]
    pub const fn detail_type(self) -> &'static str {
        match self {
            Self::Reconciled => "File Upload Reconciliation Successful",
            Self::TimedOut => "File Upload Reconciliation Timeout",
        }
    }
}

/// One classified upload. Immutable once emitted.
///
/// Field names follow the wire contract; the upload kind travels in the
/// envelope's `detail_type`, not in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Dataset this object belongs to.
    #[serde(rename = "set-id")]
    pub set_id: String,

    /// Upload time in epoch seconds.
    #[serde(rename = "event-time")]
    pub event_time: i64,

    /// Bucket the object was uploaded to.
    #[serde(rename = "bucket-name")]
    pub bucket_name: String,

    /// Full object key.
    #[serde(rename = "object-key")]
    pub object_key: String,

    /// Object size in bytes.
    #[serde(rename = "object-size")]
    pub object_size: i64,
}

/// Outbound event envelope: category, source, and JSON detail body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique envelope id (ULID).
    pub id: String,

    /// Event category (e.g. `"Manifest File Upload Event"`).
    #[serde(rename = "detail-type")]
    pub detail_type: String,

    /// Producing component, always [`EVENT_SOURCE`].
    pub source: String,

    /// When the envelope was created.
    pub time: DateTime<Utc>,

    /// The event body.
    pub detail: serde_json::Value,
}

impl EventEnvelope {
    /// Wraps a payload in a new envelope with the given category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the payload cannot be serialized.
    pub fn new(detail_type: impl Into<String>, detail: &impl Serialize) -> Result<Self> {
        let detail = serde_json::to_value(detail).map_err(|e| Error::Serialization {
            message: format!("failed to serialize event detail: {e}"),
        })?;
        Ok(Self {
            id: Ulid::new().to_string(),
            detail_type: detail_type.into(),
            source: EVENT_SOURCE.to_string(),
            time: Utc::now(),
            detail,
        })
    }

    /// Deserializes the detail body into a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the body does not match `T`.
    pub fn detail_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.detail.clone()).map_err(|e| Error::Serialization {
            message: format!("failed to deserialize event detail: {e}"),
        })
    }
}
