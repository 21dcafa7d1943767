//! End-to-end reconciliation flow tests.
//!
//! The record store is scripted per call so each scenario is deterministic:
//! no timing assumptions, no real waiting beyond millisecond pacing.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use silo_core::bus::{EventBus, MemoryBus};
use silo_core::config::ReconcileConfig;
use silo_core::error::{Error, Result};
use silo_core::event::{EventEnvelope, UploadEvent, Verdict};
use silo_core::storage::{MemoryObjectStore, ObjectStore};
use silo_ingest::recorder::{RecordStore, UploadRecord};
use silo_recon::{Driver, OutcomeNotifier, ReconcileRun, ReconcileRunner};

/// What one `set_keys` call should yield.
enum ScriptedRead {
    Keys(Vec<&'static str>),
    Fail,
}

/// Record store that replays a script of reads; the last entry repeats.
struct ScriptedRecordStore {
    script: Mutex<Vec<ScriptedRead>>,
    position: AtomicU32,
    calls: AtomicU32,
}

impl ScriptedRecordStore {
    fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: Mutex::new(script),
            position: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for ScriptedRecordStore {
    async fn record(&self, _record: UploadRecord) -> Result<()> {
        Ok(())
    }

    async fn set_keys(&self, _set_id: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().expect("script lock");
        let index = self.position.fetch_add(1, Ordering::SeqCst) as usize;
        let read = script.get(index.min(script.len() - 1)).expect("non-empty");
        match read {
            ScriptedRead::Keys(keys) => Ok(keys.iter().map(ToString::to_string).collect()),
            ScriptedRead::Fail => Err(Error::storage("store unavailable")),
        }
    }
}

/// Bus whose publishes always fail.
struct FailingBus;

#[async_trait]
impl EventBus for FailingBus {
    async fn publish(&self, _event: EventEnvelope) -> Result<()> {
        Err(Error::transport("bus unreachable"))
    }
}

fn manifest_event() -> UploadEvent {
    UploadEvent {
        set_id: "job1".to_string(),
        event_time: 1_700_000_000,
        bucket_name: "bucket".to_string(),
        object_key: "job1-x/job1-manifest.txt".to_string(),
        object_size: 36,
    }
}

fn config(max_attempts: u32, infra_retry_limit: u32) -> ReconcileConfig {
    ReconcileConfig {
        max_attempts,
        wait: Duration::from_millis(1),
        infra_retry_limit,
        infra_retry_pause: Duration::from_millis(1),
    }
}

async fn manifest_store(body: &'static str) -> Arc<MemoryObjectStore> {
    let objects = Arc::new(MemoryObjectStore::new());
    objects
        .put("bucket", "job1-x/job1-manifest.txt", Bytes::from(body))
        .await
        .expect("put should succeed");
    objects
}

#[tokio::test]
async fn reconciles_at_second_attempt_when_late_file_arrives() {
    // Manifest lists a and b; only a is recorded at attempt 1, b appears
    // before attempt 2.
    let records = Arc::new(ScriptedRecordStore::new(vec![
        ScriptedRead::Keys(vec!["job1-x/a.csv"]),
        ScriptedRead::Keys(vec!["job1-x/a.csv", "job1-x/b.csv"]),
    ]));
    let objects = manifest_store("job1-x/a.csv\njob1-x/b.csv\n").await;
    let bus = Arc::new(MemoryBus::new());

    let runner = ReconcileRunner::new(
        Driver::new(records.clone(), objects, config(5, 3)),
        OutcomeNotifier::new(bus.clone()),
        Duration::from_millis(1),
    );

    let verdict = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect("run should complete");

    assert_eq!(verdict, Verdict::Reconciled);
    assert_eq!(records.calls(), 2, "reconciled at attempt 2, not beyond");

    let events = bus.events();
    assert_eq!(events.len(), 1, "exactly one outcome notification");
    assert_eq!(
        events[0].detail_type,
        "File Upload Reconciliation Successful"
    );
    let body: UploadEvent = events[0].detail_as().expect("detail should decode");
    assert_eq!(body, manifest_event(), "event metadata carried unchanged");
}

#[tokio::test]
async fn times_out_after_exactly_max_attempts_comparisons() {
    // b.csv never arrives.
    let records = Arc::new(ScriptedRecordStore::new(vec![ScriptedRead::Keys(vec![
        "job1-x/a.csv",
    ])]));
    let objects = manifest_store("job1-x/a.csv\njob1-x/b.csv\n").await;
    let bus = Arc::new(MemoryBus::new());

    let runner = ReconcileRunner::new(
        Driver::new(records.clone(), objects, config(3, 3)),
        OutcomeNotifier::new(bus.clone()),
        Duration::from_millis(1),
    );

    let verdict = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect("run should complete");

    assert_eq!(verdict, Verdict::TimedOut);
    assert_eq!(records.calls(), 3, "exactly max_attempts comparisons");

    let events = bus.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detail_type, "File Upload Reconciliation Timeout");
    assert!(
        bus.events_of_type("File Upload Reconciliation Successful")
            .is_empty(),
        "no success event may ever be emitted"
    );
}

#[tokio::test]
async fn transient_failures_do_not_consume_the_attempt_budget() {
    // Two failed reads, then a matching snapshot. With max_attempts = 1 the
    // run can only succeed if the failures retried the same attempt.
    let records = Arc::new(ScriptedRecordStore::new(vec![
        ScriptedRead::Fail,
        ScriptedRead::Fail,
        ScriptedRead::Keys(vec!["job1-x/a.csv"]),
    ]));
    let objects = manifest_store("job1-x/a.csv\n").await;
    let bus = Arc::new(MemoryBus::new());

    let runner = ReconcileRunner::new(
        Driver::new(records.clone(), objects, config(1, 3)),
        OutcomeNotifier::new(bus.clone()),
        Duration::from_millis(1),
    );

    let verdict = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect("run should complete");

    assert_eq!(verdict, Verdict::Reconciled);
    assert_eq!(records.calls(), 3, "two retries plus the successful read");
    assert_eq!(bus.events().len(), 1);
}

#[tokio::test]
async fn persistent_infrastructure_failure_is_fatal_with_no_verdict() {
    let records = Arc::new(ScriptedRecordStore::new(vec![ScriptedRead::Fail]));
    let objects = manifest_store("job1-x/a.csv\n").await;
    let bus = Arc::new(MemoryBus::new());

    let runner = ReconcileRunner::new(
        Driver::new(records.clone(), objects, config(5, 3)),
        OutcomeNotifier::new(bus.clone()),
        Duration::from_millis(1),
    );

    let err = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect_err("run should fail");
    assert!(err.is_retryable(), "fatal error preserves its origin");

    assert_eq!(records.calls(), 3, "local read budget, then fatal");
    assert!(bus.events().is_empty(), "no verdict event on fatal error");
}

#[tokio::test]
async fn notifier_transport_failure_surfaces_to_the_caller() {
    let records = Arc::new(ScriptedRecordStore::new(vec![ScriptedRead::Keys(vec![
        "job1-x/a.csv",
    ])]));
    let objects = manifest_store("job1-x/a.csv\n").await;

    let runner = ReconcileRunner::new(
        Driver::new(records, objects, config(5, 3)),
        OutcomeNotifier::new(Arc::new(FailingBus)),
        Duration::from_millis(1),
    );

    let err = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect_err("run should fail");
    assert!(matches!(err, Error::Transport { .. }));
}

#[tokio::test]
async fn empty_manifest_with_no_records_reconciles_immediately() {
    let records = Arc::new(ScriptedRecordStore::new(vec![ScriptedRead::Keys(vec![])]));
    let objects = manifest_store("").await;
    let bus = Arc::new(MemoryBus::new());

    let runner = ReconcileRunner::new(
        Driver::new(records.clone(), objects, config(5, 3)),
        OutcomeNotifier::new(bus.clone()),
        Duration::from_millis(1),
    );

    let verdict = runner
        .run(&ReconcileRun::new(manifest_event()))
        .await
        .expect("run should complete");

    assert_eq!(verdict, Verdict::Reconciled);
    assert_eq!(records.calls(), 1, "first attempt suffices");
}
