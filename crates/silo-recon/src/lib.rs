//! # silo-recon
//!
//! The reconciliation core of Silo.
//!
//! A reconciliation run compares two independently-updated, eventually-
//! consistent sources for one dataset: the set of object keys recorded by
//! the ingest path and the set of keys listed in the dataset's manifest.
//! There is no transactional coupling between the two, so there is no
//! "right moment" to compare; the driver instead polls with a bounded
//! attempt budget and a fixed wait between attempts, trading latency for a
//! hard upper bound on resource consumption and guaranteed termination.
//!
//! The state machine is an explicit value ([`driver::ReconcileState`])
//! advanced by a scheduler-agnostic [`driver::Driver::step`]; the
//! [`runner::ReconcileRunner`] is the orchestration layer that paces
//! attempts and reports the terminal verdict through the
//! [`notifier::OutcomeNotifier`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod compare;
pub mod driver;
pub mod notifier;
pub mod runner;

pub use driver::{Driver, ReconcileRun, ReconcileState};
pub use notifier::OutcomeNotifier;
pub use runner::ReconcileRunner;
