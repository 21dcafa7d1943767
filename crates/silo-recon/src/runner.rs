//! Drives one reconciliation run to its terminal verdict.
//!
//! The runner is the orchestration layer around [`Driver::step`]: it waits
//! the configured duration between attempts and calls the notifier exactly
//! once when the run reaches a terminal state. The wait is a plain
//! `tokio::time::sleep`; the run holds no resources while suspended.
//!
//! Runs for different datasets are fully independent; spawn one runner task
//! per dataset.

use std::time::Duration;

use silo_core::error::Result;
use silo_core::event::Verdict;

use crate::driver::{Driver, ReconcileRun, ReconcileState};
use crate::notifier::OutcomeNotifier;

/// Paces a reconciliation run and reports its outcome.
pub struct ReconcileRunner {
    driver: Driver,
    notifier: OutcomeNotifier,
    wait: Duration,
}

impl ReconcileRunner {
    /// Creates a runner with the given wait between attempts.
    #[must_use]
    pub fn new(driver: Driver, notifier: OutcomeNotifier, wait: Duration) -> Self {
        Self {
            driver,
            notifier,
            wait,
        }
    }

    /// Runs one dataset's reconciliation to completion.
    ///
    /// Returns the verdict after publishing the outcome notification.
    ///
    /// # Errors
    ///
    /// Returns an error if a comparison keeps failing past the local retry
    /// budget or the outcome publish fails; in either case the run ends
    /// without a verdict and the error is the operator-visible signal.
    #[tracing::instrument(skip(self, run), fields(set_id = %run.set_id()))]
    pub async fn run(&self, run: &ReconcileRun) -> Result<Verdict> {
        let mut state = ReconcileState::Init;
        loop {
            state = self.driver.step(run, state).await?;
            if let Some(verdict) = state.verdict() {
                self.notifier.notify(run, verdict).await?;
                return Ok(verdict);
            }
            tokio::time::sleep(self.wait).await;
        }
    }
}
