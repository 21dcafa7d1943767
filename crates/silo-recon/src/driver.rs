//! The reconciliation state machine.
//!
//! One run per dataset, triggered by the arrival of its manifest. The run is
//! an explicit state value advanced by [`Driver::step`]; the caller decides
//! how to wait between attempts and where to persist the state, which keeps
//! the core independent of any scheduling substrate and directly
//! unit-testable.
//!
//! ## Attempt budget
//!
//! The budget, not a comparison result, decides timeout: once the next
//! attempt index would exceed `max_attempts`, the run transitions to
//! `TimedOut` without comparing again. On the never-matching path exactly
//! `max_attempts` comparisons are performed.
//!
//! ## Infrastructure failures
//!
//! A failed store or object-store read is not "sets differ". The driver
//! retries the same attempt index up to a small local read budget, with a
//! short pause between reads, and then propagates the error as fatal.
//! Transient outages therefore never consume the attempt budget.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};

use silo_core::config::ReconcileConfig;
use silo_core::error::Result;
use silo_core::event::{UploadEvent, Verdict};
use silo_core::storage::ObjectStore;
use silo_ingest::recorder::RecordStore;

use crate::compare::{manifest_keys, sets_match};

/// State of one reconciliation run.
///
/// Serializable so an external orchestrator can persist it between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcileState {
    /// Run established, no attempt made yet.
    Init,
    /// Mid-run; `attempt` comparisons have completed without a match.
    Iterating {
        /// Index of the last completed attempt, starting at 1.
        attempt: u32,
    },
    /// Terminal: the recorded keys matched the manifest.
    Reconciled {
        /// Number of comparisons performed, including the matching one.
        attempts: u32,
    },
    /// Terminal: the attempt budget ran out before a match.
    TimedOut {
        /// Number of comparisons performed.
        attempts: u32,
    },
}

impl ReconcileState {
    /// Returns true for the two terminal states.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Reconciled { .. } | Self::TimedOut { .. })
    }

    /// Returns the verdict for a terminal state, `None` otherwise.
    #[must_use]
    pub const fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Reconciled { .. } => Some(Verdict::Reconciled),
            Self::TimedOut { .. } => Some(Verdict::TimedOut),
            Self::Init | Self::Iterating { .. } => None,
        }
    }
}

/// Context for one dataset's run.
///
/// Wraps the triggering manifest upload event; the event body is carried
/// through to the outcome notification unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRun {
    /// The manifest upload event that triggered this run.
    pub event: UploadEvent,
}

impl ReconcileRun {
    /// Creates a run context from the triggering manifest event.
    #[must_use]
    pub fn new(event: UploadEvent) -> Self {
        Self { event }
    }

    /// Dataset under reconciliation.
    #[must_use]
    pub fn set_id(&self) -> &str {
        &self.event.set_id
    }

    /// Bucket holding the manifest object.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.event.bucket_name
    }

    /// Key of the manifest object.
    #[must_use]
    pub fn manifest_key(&self) -> &str {
        &self.event.object_key
    }
}

/// Advances reconciliation runs by one attempt at a time.
pub struct Driver {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    config: ReconcileConfig,
}

impl Driver {
    /// Creates a driver over the given stores.
    #[must_use]
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            records,
            objects,
            config,
        }
    }

    /// Advances the run by one transition.
    ///
    /// Terminal states are fixed points: stepping them returns them
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error when a comparison read keeps failing past the local
    /// retry budget. The attempt in progress is not counted in that case.
    pub async fn step(&self, run: &ReconcileRun, state: ReconcileState) -> Result<ReconcileState> {
        match state {
            ReconcileState::Init => self.attempt(run, 1, 0).await,
            ReconcileState::Iterating { attempt } => self.attempt(run, attempt + 1, attempt).await,
            terminal @ (ReconcileState::Reconciled { .. } | ReconcileState::TimedOut { .. }) => {
                Ok(terminal)
            }
        }
    }

    /// Runs attempt `next`, where `completed` attempts have already finished.
    async fn attempt(
        &self,
        run: &ReconcileRun,
        next: u32,
        completed: u32,
    ) -> Result<ReconcileState> {
        if next > self.config.max_attempts {
            tracing::info!(
                set_id = %run.set_id(),
                attempts = completed,
                "attempt budget exhausted, reconciliation timed out"
            );
            counter!("silo_reconcile_verdicts_total", "verdict" => "timed_out").increment(1);
            return Ok(ReconcileState::TimedOut {
                attempts: completed,
            });
        }

        if self.compare_with_retry(run, next).await? {
            tracing::info!(set_id = %run.set_id(), attempts = next, "dataset reconciled");
            counter!("silo_reconcile_verdicts_total", "verdict" => "reconciled").increment(1);
            Ok(ReconcileState::Reconciled { attempts: next })
        } else {
            Ok(ReconcileState::Iterating { attempt: next })
        }
    }

    /// Performs one comparison, retrying transient read failures without
    /// advancing the attempt index.
    async fn compare_with_retry(&self, run: &ReconcileRun, attempt: u32) -> Result<bool> {
        let mut reads = 0u32;
        loop {
            match self.compare(run, attempt).await {
                Ok(matched) => return Ok(matched),
                Err(err) if err.is_retryable() && reads + 1 < self.config.infra_retry_limit => {
                    reads += 1;
                    tracing::warn!(
                        set_id = %run.set_id(),
                        attempt,
                        read = reads,
                        error = %err,
                        "transient read failure during comparison, retrying same attempt"
                    );
                    tokio::time::sleep(self.config.infra_retry_pause).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One comparison: recorded key set versus manifest key set.
    async fn compare(&self, run: &ReconcileRun, attempt: u32) -> Result<bool> {
        // The manifest upload is recorded like any other object, but its
        // body lists only the dataset's files; its own key is excluded from
        // the recorded side so equality can ever hold.
        let mut recorded = self.records.set_keys(run.set_id()).await?;
        recorded.retain(|key| key != run.manifest_key());

        let body = self.objects.get(run.bucket(), run.manifest_key()).await?;
        let body = std::str::from_utf8(&body).map_err(|e| {
            silo_core::Error::InvalidInput(format!(
                "manifest {} is not valid UTF-8: {e}",
                run.manifest_key()
            ))
        })?;
        let listed = manifest_keys(body);

        tracing::debug!(
            set_id = %run.set_id(),
            attempt,
            recorded = recorded.len(),
            listed = listed.len(),
            "comparison step"
        );
        Ok(sets_match(&recorded, &listed))
    }
}
