/*!
 * Injection Monitoring
 * Baseline/compare loop, alert delivery, configuration and tracing
 */

mod alerts;
mod config;
mod monitor;
mod tracer;
mod types;

pub use alerts::{Alert, AlertSink, JsonAlertSink, TracingAlertSink};
pub use config::{
    MonitorConfig, ENV_ALERT_JSON, ENV_DUMP_BASELINE, ENV_MAX_CYCLES, ENV_SCAN_INTERVAL_MS,
};
pub use monitor::Monitor;
pub use tracer::{generate_trace_id, init_tracing, ScanSpan};
pub use types::{MonitorError, MonitorOutcome, MonitorResult, ScanVerdict};
