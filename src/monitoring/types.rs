/*!
 * Monitoring Types
 * Verdicts, outcomes and errors of the baseline/compare loop
 */

use crate::memory::{SnapshotDiff, SourceError};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monitoring operation result
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Monitoring errors
#[derive(Error, Debug, Diagnostic)]
pub enum MonitorError {
    #[error("Invalid configuration {key}={value}: {reason}")]
    #[diagnostic(
        code(monitor::invalid_config),
        help("Fix or unset the environment variable and restart the monitor.")
    )]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to deliver alert: {0}")]
    #[diagnostic(code(monitor::alert_delivery))]
    AlertDelivery(#[source] std::io::Error),
}

impl From<crate::memory::RegionError> for MonitorError {
    fn from(err: crate::memory::RegionError) -> Self {
        MonitorError::Source(SourceError::Region(err))
    }
}

/// Result of comparing one fresh snapshot against the baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "diff", rename_all = "snake_case")]
pub enum ScanVerdict {
    Clean,
    InjectionDetected(SnapshotDiff),
}

impl ScanVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanVerdict::Clean)
    }
}

/// Why the monitoring loop stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// The address space changed; the alert was dispatched
    Detected { cycle: u64, diff: SnapshotDiff },
    /// The configured number of cycles completed without a change
    CycleLimit { cycles: u64 },
    /// The monitored process went away
    ProcessExited { cycles: u64 },
    /// Ctrl-C
    Interrupted { cycles: u64 },
}
