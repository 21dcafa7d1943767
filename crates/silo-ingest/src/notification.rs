//! Wire schema for upload notifications.
//!
//! A notification describes one object upload:
//!
//! ```json
//! { "detail": { "object-key": "job1-upload/a.csv",
//!               "object-size": "42",
//!               "bucket-name": "upload-bucket" },
//!   "time": "2026-08-06T10:15:00Z" }
//! ```
//!
//! `object-size` arrives as either a JSON string or an integer depending on
//! the producer. Missing fields and non-numeric sizes are rejected at parse
//! time; an unparseable timestamp is rejected before any event is built.
//! Partial metadata is worse than a dropped notification, so a malformed
//! notification never produces a partial event.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

use silo_core::error::{Error, Result};

/// One upload notification as delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadNotification {
    /// Object-level detail.
    pub detail: NotificationDetail,

    /// Upload timestamp, RFC 3339.
    pub time: String,
}

/// Object-level fields of an upload notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDetail {
    /// Full key of the uploaded object.
    #[serde(rename = "object-key")]
    pub object_key: String,

    /// Object size in bytes; tolerates string or integer encoding.
    #[serde(rename = "object-size", deserialize_with = "size_from_string_or_int")]
    pub object_size: i64,

    /// Bucket the object was uploaded to.
    #[serde(rename = "bucket-name")]
    pub bucket_name: String,
}

impl UploadNotification {
    /// Parses a notification from its JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedNotification`] if required fields are
    /// missing or the size is not numeric.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::malformed(format!("invalid payload: {e}")))
    }

    /// Converts the notification timestamp to epoch seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedNotification`] if the timestamp is not
    /// valid RFC 3339.
    pub fn event_time_epoch(&self) -> Result<i64> {
        DateTime::parse_from_rfc3339(&self.time)
            .map(|t| t.timestamp())
            .map_err(|e| Error::malformed(format!("unparseable event time {:?}: {e}", self.time)))
    }
}

fn size_from_string_or_int<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Int(i64),
        Str(String),
    }

    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Int(n) => Ok(n),
        SizeRepr::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("object-size is not numeric: {s:?}"))),
    }
}
