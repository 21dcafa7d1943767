//! Silo daemon entry point.
//!
//! ## Usage
//!
//! ```bash
//! # Run the ingestion service
//! silo-daemon --job-dir-suffix -upload --manifest-suffix -manifest.txt serve --port 8080
//!
//! # Dry-run classification of a single object key
//! silo-daemon --job-dir-suffix -upload --manifest-suffix -manifest.txt \
//!     classify --object-key job1-upload/job1-manifest.txt
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use silo_core::config::{ReconcileConfig, SiloConfig};
use silo_core::error::Error;
use silo_core::observability::{LogFormat, init_logging};
use silo_core::storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
use silo_daemon::dispatch::{Dispatcher, LoggingBus};
use silo_daemon::server::{AppState, serve};
use silo_ingest::classifier::Classifier;
use silo_ingest::notification::{NotificationDetail, UploadNotification};
use silo_ingest::recorder::MemoryRecordStore;

/// Silo upload reconciliation daemon.
#[derive(Debug, Parser)]
#[command(name = "silo-daemon")]
#[command(about = "Records and reconciles bulk file uploads against dataset manifests")]
#[command(version)]
struct Args {
    /// Suffix marking a top-level key prefix as a managed job directory.
    #[arg(long, env = "SILO_JOB_DIR_SUFFIX", global = true)]
    job_dir_suffix: Option<String>,

    /// Suffix naming the manifest object within a dataset.
    #[arg(long, env = "SILO_MANIFEST_SUFFIX", global = true)]
    manifest_suffix: Option<String>,

    /// Maximum reconciliation attempts per dataset.
    #[arg(long, env = "SILO_RECONCILE_ATTEMPTS", default_value = "10", global = true)]
    reconcile_attempts: u32,

    /// Wait between reconciliation attempts, in seconds.
    #[arg(long, env = "SILO_RECONCILE_WAIT_SECS", default_value = "60", global = true)]
    reconcile_wait_secs: u64,

    /// Log output format.
    #[arg(long, env = "SILO_LOG_FORMAT", default_value = "pretty", global = true)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the ingestion service with health endpoints.
    Serve {
        /// HTTP port for the ingestion and health endpoints.
        #[arg(long, env = "SILO_PORT", default_value = "8080")]
        port: u16,

        /// Serve object reads from this directory (one subdirectory per
        /// bucket). Without it, an in-memory object store is used.
        #[arg(long, env = "SILO_DATA_ROOT")]
        data_root: Option<String>,
    },

    /// Classify a single object key without emitting anything.
    Classify {
        /// Object key to classify.
        #[arg(long)]
        object_key: String,

        /// Bucket name to report in the classification.
        #[arg(long, default_value = "local")]
        bucket: String,
    },
}

fn build_config(args: &Args) -> Result<SiloConfig> {
    let job_dir_suffix = args
        .job_dir_suffix
        .clone()
        .ok_or_else(|| Error::config("job_dir_suffix is required (SILO_JOB_DIR_SUFFIX)"))?;
    let manifest_suffix = args
        .manifest_suffix
        .clone()
        .ok_or_else(|| Error::config("manifest_suffix is required (SILO_MANIFEST_SUFFIX)"))?;

    let config = SiloConfig::new(job_dir_suffix, manifest_suffix).with_reconcile(ReconcileConfig {
        max_attempts: args.reconcile_attempts,
        wait: Duration::from_secs(args.reconcile_wait_secs),
        ..ReconcileConfig::default()
    });
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format.into());

    let config = build_config(&args)?;

    match args.command {
        Commands::Serve { port, data_root } => {
            let objects: Arc<dyn ObjectStore> = match data_root {
                Some(root) => Arc::new(FsObjectStore::new(root)),
                None => Arc::new(MemoryObjectStore::new()),
            };
            let dispatcher = Dispatcher::new(
                config,
                Arc::new(MemoryRecordStore::new()),
                objects,
                Arc::new(LoggingBus),
            );
            serve(Arc::new(AppState::new(dispatcher)), port).await?;
        }
        Commands::Classify { object_key, bucket } => {
            let classifier = Classifier::new(&config);
            let notification = UploadNotification {
                detail: NotificationDetail {
                    object_key,
                    object_size: 0,
                    bucket_name: bucket,
                },
                time: chrono::Utc::now().to_rfc3339(),
            };
            match classifier.classify(&notification)? {
                Some(classified) => println!(
                    "{}: set {}",
                    classified.kind.detail_type(),
                    classified.event.set_id
                ),
                None => println!("not a managed job directory"),
            }
        }
    }

    Ok(())
}
