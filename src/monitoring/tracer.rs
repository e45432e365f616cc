/*!
 * Structured Tracing
 * Subscriber setup and per-cycle spans for the monitoring loop
 *
 * Features:
 * - Env-driven filtering (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - One span per scan cycle with page counts and duration embedded
 */

use crate::core::types::Pid;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Cycles slower than this are reported at warn level
const SLOW_SCAN_THRESHOLD: Duration = Duration::from_millis(250);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - HONEYPROC_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("HONEYPROC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Generate a unique ID for alert correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one snapshot-and-compare cycle
pub struct ScanSpan {
    span: tracing::Span,
    start: Instant,
    cycle: u64,
}

impl ScanSpan {
    pub fn new(cycle: u64, pid: Option<Pid>) -> Self {
        let span = span!(
            Level::DEBUG,
            "scan",
            cycle = cycle,
            pid = pid,
            pages = tracing::field::Empty,
            verdict = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            cycle,
        }
    }

    /// Record the size of the fresh snapshot
    pub fn record_pages(&self, pages: usize) {
        self.span.record("pages", pages);
    }

    /// Record the comparison outcome
    pub fn record_verdict(&self, clean: bool) {
        self.span
            .record("verdict", if clean { "clean" } else { "changed" });
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ScanSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_SCAN_THRESHOLD {
            warn!(
                cycle = self.cycle,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow scan cycle"
            );
        } else {
            debug!(
                cycle = self.cycle,
                duration_us = duration.as_micros() as u64,
                "scan cycle completed"
            );
        }
    }
}
