/*!
 * Alerts
 * Injection alerts and the sinks that deliver them
 */

use super::tracer::generate_trace_id;
use super::types::{MonitorError, MonitorResult};
use crate::core::types::Pid;
use crate::memory::SnapshotDiff;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

/// Raised when a fresh snapshot no longer matches the baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub pid: Option<Pid>,
    pub cycle: u64,
    /// Milliseconds since the Unix epoch
    pub detected_at_ms: u64,
    pub diff: SnapshotDiff,
}

impl Alert {
    pub fn injection(pid: Option<Pid>, cycle: u64, diff: SnapshotDiff) -> Self {
        let detected_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            id: generate_trace_id(),
            pid,
            cycle,
            detected_at_ms,
            diff,
        }
    }
}

/// Destination for injection alerts
pub trait AlertSink {
    fn dispatch(&mut self, alert: &Alert) -> MonitorResult<()>;
}

/// Report alerts as error-level structured log events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn dispatch(&mut self, alert: &Alert) -> MonitorResult<()> {
        error!(
            alert_id = %alert.id,
            pid = alert.pid,
            cycle = alert.cycle,
            diff = %alert.diff,
            "INJECTION DETECTED"
        );
        Ok(())
    }
}

/// Write each alert as one JSON line
#[derive(Debug)]
pub struct JsonAlertSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonAlertSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonAlertSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> AlertSink for JsonAlertSink<W> {
    fn dispatch(&mut self, alert: &Alert) -> MonitorResult<()> {
        serde_json::to_writer(&mut self.writer, alert)
            .map_err(|e| MonitorError::AlertDelivery(e.into()))?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(MonitorError::AlertDelivery)
    }
}

/// Keep alerts in memory
impl AlertSink for Vec<Alert> {
    fn dispatch(&mut self, alert: &Alert) -> MonitorResult<()> {
        self.push(alert.clone());
        Ok(())
    }
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn dispatch(&mut self, alert: &Alert) -> MonitorResult<()> {
        (**self).dispatch(alert)
    }
}
