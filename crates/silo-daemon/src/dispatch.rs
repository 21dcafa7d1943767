//! Routes classified uploads to the recorder and the reconciler.
//!
//! The dispatcher is the in-process counterpart of the event-routing fabric:
//! every qualifying upload event is published to the bus and recorded; a
//! manifest event additionally spawns that dataset's reconciliation run as
//! an independent task. Runs for different datasets never share mutable
//! state, so there is nothing to coordinate between them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use metrics::counter;

use silo_core::bus::EventBus;
use silo_core::config::SiloConfig;
use silo_core::error::Result;
use silo_core::event::{EventEnvelope, UploadEvent, UploadKind};
use silo_core::storage::ObjectStore;
use silo_ingest::classifier::Classifier;
use silo_ingest::notification::UploadNotification;
use silo_ingest::recorder::{RecordStore, Recorder};
use silo_recon::{Driver, OutcomeNotifier, ReconcileRun, ReconcileRunner};

/// Result of dispatching one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The notification produced an upload event of this kind.
    Accepted(UploadKind),
    /// The object is outside managed job directories; nothing was emitted.
    Dropped,
}

/// Wires the classifier, recorder, bus, and reconciler together.
pub struct Dispatcher {
    classifier: Classifier,
    recorder: Recorder,
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    bus: Arc<dyn EventBus>,
    config: SiloConfig,
    active_runs: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given capability implementations.
    #[must_use]
    pub fn new(
        config: SiloConfig,
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            classifier: Classifier::new(&config),
            recorder: Recorder::new(records.clone()),
            records,
            objects,
            bus,
            config,
            active_runs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of reconciliation runs currently in flight.
    #[must_use]
    pub fn active_runs(&self) -> u64 {
        self.active_runs.load(Ordering::SeqCst)
    }

    /// Handles one upload notification end to end.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification is malformed or a publish or
    /// record write fails. A dropped (unmanaged) notification is not an
    /// error.
    pub async fn handle_notification(
        &self,
        notification: UploadNotification,
    ) -> Result<DispatchOutcome> {
        let Some(classified) = self.classifier.classify(&notification)? else {
            counter!("silo_notifications_total", "outcome" => "dropped").increment(1);
            return Ok(DispatchOutcome::Dropped);
        };

        let kind = classified.kind;
        let envelope = EventEnvelope::new(kind.detail_type(), &classified.event)?;
        self.bus.publish(envelope).await?;
        self.recorder.record_event(&classified.event).await?;

        let outcome = match kind {
            UploadKind::Data => "data",
            UploadKind::Manifest => "manifest",
        };
        counter!("silo_notifications_total", "outcome" => outcome).increment(1);

        if kind == UploadKind::Manifest {
            self.spawn_reconcile(classified.event);
        }

        Ok(DispatchOutcome::Accepted(kind))
    }

    /// Spawns one dataset's reconciliation run as an independent task.
    fn spawn_reconcile(&self, event: UploadEvent) {
        let runner = ReconcileRunner::new(
            Driver::new(
                self.records.clone(),
                self.objects.clone(),
                self.config.reconcile.clone(),
            ),
            OutcomeNotifier::new(self.bus.clone()),
            self.config.reconcile.wait,
        );
        let active_runs = self.active_runs.clone();
        active_runs.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let run = ReconcileRun::new(event);
            match runner.run(&run).await {
                Ok(verdict) => {
                    tracing::info!(set_id = %run.set_id(), ?verdict, "reconciliation run finished");
                }
                Err(err) => {
                    tracing::error!(
                        set_id = %run.set_id(),
                        error = %err,
                        "reconciliation run aborted without a verdict"
                    );
                }
            }
            active_runs.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// Bus implementation that emits envelopes to the log.
///
/// The single-process deployment has no downstream broker; the structured
/// log line is the outbound edge that operators and log routers consume.
#[derive(Debug, Default)]
pub struct LoggingBus;

#[async_trait]
impl EventBus for LoggingBus {
    async fn publish(&self, event: EventEnvelope) -> Result<()> {
        let payload =
            serde_json::to_string(&event).map_err(|e| silo_core::Error::Serialization {
                message: format!("failed to serialize envelope: {e}"),
            })?;
        tracing::info!(
            detail_type = %event.detail_type,
            event = %payload,
            "outbound event"
        );
        Ok(())
    }
}
