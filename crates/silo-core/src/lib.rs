//! # silo-core
//!
//! Core abstractions for Silo, a service that records and reconciles
//! asynchronous bulk file uploads.
//!
//! This crate provides the foundational types and traits used across all Silo
//! components:
//!
//! - **Error Types**: Shared error definitions and result types
//! - **Configuration**: Immutable startup configuration for every component
//! - **Events**: Upload event payloads and the outbound event envelope
//! - **Storage Trait**: Abstract object-store interface for manifest reads
//! - **Event Bus Trait**: Abstract publish interface for outbound events
//!
//! ## Crate Boundary
//!
//! `silo-core` is the **only** crate allowed to define shared primitives.
//! All cross-component interaction happens via the contracts defined here.
//!
//! ## Example
//!
//! ```rust
//! use silo_core::prelude::*;
//!
//! let config = SiloConfig::new("-upload", "-manifest.txt");
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod observability;
pub mod storage;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use silo_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bus::{EventBus, MemoryBus};
    pub use crate::config::{ReconcileConfig, SiloConfig};
    pub use crate::error::{Error, Result};
    pub use crate::event::{EventEnvelope, UploadEvent, UploadKind, Verdict};
    pub use crate::storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
}
