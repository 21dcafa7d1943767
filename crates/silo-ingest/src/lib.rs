//! # silo-ingest
//!
//! Ingestion path for Silo: parses upload notifications as delivered by the
//! queue fabric, classifies each one as a data or manifest upload, and
//! records per-object metadata keyed by dataset.
//!
//! The classifier is a pure function of the object key and the configured
//! suffixes; the recorder is an idempotent upsert. Neither holds state of its
//! own, so both can be exercised directly in tests.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod classifier;
pub mod notification;
pub mod recorder;

pub use classifier::{ClassifiedUpload, Classifier};
pub use notification::{NotificationDetail, UploadNotification};
pub use recorder::{MemoryRecordStore, RecordStore, Recorder, UploadRecord};
