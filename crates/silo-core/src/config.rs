//! Startup configuration for Silo components.
//!
//! Configuration is resolved once at process startup and handed to each
//! component as an immutable value. Components never read ambient global
//! state; the classifier and the reconcile driver stay pure and testable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration shared by the classifier, recorder, and reconcile driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiloConfig {
    /// Suffix that marks a top-level key prefix as a managed job directory.
    ///
    /// Objects whose first path segment does not end with this suffix are
    /// not part of any managed dataset and are silently dropped.
    pub job_dir_suffix: String,

    /// Suffix that, appended to a set id, names the dataset's manifest object.
    pub manifest_suffix: String,

    /// Reconciliation pacing and budget.
    pub reconcile: ReconcileConfig,
}

impl SiloConfig {
    /// Creates a configuration with the given suffixes and default
    /// reconciliation settings.
    #[must_use]
    pub fn new(job_dir_suffix: impl Into<String>, manifest_suffix: impl Into<String>) -> Self {
        Self {
            job_dir_suffix: job_dir_suffix.into(),
            manifest_suffix: manifest_suffix.into(),
            reconcile: ReconcileConfig::default(),
        }
    }

    /// Replaces the reconciliation settings.
    #[must_use]
    pub fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Validates required options.
    ///
    /// Absence of a required option is a startup-time configuration error,
    /// never a runtime error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required option is empty or a bound is
    /// not positive.
    pub fn validate(&self) -> Result<()> {
        if self.job_dir_suffix.trim().is_empty() {
            return Err(Error::config("job_dir_suffix is required"));
        }
        if self.manifest_suffix.trim().is_empty() {
            return Err(Error::config("manifest_suffix is required"));
        }
        self.reconcile.validate()
    }
}

/// Pacing and budget for one dataset's reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum number of comparison attempts before the run times out.
    pub max_attempts: u32,

    /// Wait between attempts. The wait is a true suspension point; no
    /// resources are held while waiting.
    pub wait: Duration,

    /// Total reads allowed per comparison step when infrastructure reads
    /// fail transiently. Transient failures retry the same attempt index and
    /// never consume the attempt budget.
    pub infra_retry_limit: u32,

    /// Pause between transient-failure retries within one comparison step.
    pub infra_retry_pause: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            wait: Duration::from_secs(60),
            infra_retry_limit: 3,
            infra_retry_pause: Duration::from_millis(250),
        }
    }
}

impl ReconcileConfig {
    /// Validates the reconciliation bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("reconcile max_attempts must be positive"));
        }
        if self.wait.is_zero() {
            return Err(Error::config("reconcile wait must be positive"));
        }
        if self.infra_retry_limit == 0 {
            return Err(Error::config("infra_retry_limit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = SiloConfig::new("-upload", "-manifest.txt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_suffixes_are_startup_errors() {
        assert!(SiloConfig::new("", "-manifest.txt").validate().is_err());
        assert!(SiloConfig::new("-upload", "  ").validate().is_err());
    }

    #[test]
    fn zero_bounds_are_rejected() {
        let config = SiloConfig::new("-upload", "-manifest.txt").with_reconcile(ReconcileConfig {
            max_attempts: 0,
            ..ReconcileConfig::default()
        });
        assert!(config.validate().is_err());

        let config = SiloConfig::new("-upload", "-manifest.txt").with_reconcile(ReconcileConfig {
            wait: Duration::ZERO,
            ..ReconcileConfig::default()
        });
        assert!(config.validate().is_err());
    }
}
