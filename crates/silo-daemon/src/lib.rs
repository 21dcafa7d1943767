//! # silo-daemon
//!
//! Service binary for Silo.
//!
//! The daemon exposes the delivery boundary the queue fabric would otherwise
//! provide: upload notifications arrive over HTTP, get classified and
//! recorded, and a manifest arrival spawns an independent reconciliation
//! task for its dataset.
//!
//! ## Endpoints
//!
//! - `POST /notifications` - one upload-notification JSON document
//! - `GET /health` - shallow liveness check (always 200)
//! - `GET /ready` - readiness with ingest and reconcile counters

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod dispatch;
pub mod server;
