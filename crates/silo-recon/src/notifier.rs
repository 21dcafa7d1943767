//! Outcome notification for terminal reconciliation verdicts.
//!
//! The outcome event is the one observable signal consumers rely on, so a
//! publish failure surfaces to the caller instead of being swallowed. The
//! event body is the triggering manifest event, carried through unchanged.

use std::sync::Arc;

use silo_core::bus::EventBus;
use silo_core::error::Result;
use silo_core::event::{EventEnvelope, Verdict};

use crate::driver::ReconcileRun;

/// Publishes exactly one outcome event per terminal verdict.
pub struct OutcomeNotifier {
    bus: Arc<dyn EventBus>,
}

impl OutcomeNotifier {
    /// Creates a notifier over the given bus.
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publishes the outcome event for a verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be built or the publish
    /// fails. The caller treats this as fatal for the run.
    pub async fn notify(&self, run: &ReconcileRun, verdict: Verdict) -> Result<()> {
        let envelope = EventEnvelope::new(verdict.detail_type(), &run.event)?;
        tracing::info!(
            set_id = %run.set_id(),
            category = verdict.detail_type(),
            "publishing reconciliation outcome"
        );
        self.bus.publish(envelope).await
    }
}
