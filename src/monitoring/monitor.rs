/*!
 * Injection Monitor
 * Baseline/compare loop over a decoy process address space
 *
 * The first snapshot is kept as the baseline. Every cycle takes a fresh
 * snapshot, compares it against the baseline and throws it away. Any
 * difference is treated as injection: the alert is dispatched and the loop
 * stops.
 */

use super::alerts::{Alert, AlertSink, TracingAlertSink};
use super::config::MonitorConfig;
use super::tracer::ScanSpan;
use super::types::{MonitorError, MonitorOutcome, MonitorResult, ScanVerdict};
use crate::memory::{build_snapshot, diff, MemoryRegionTracker, RegionSource, SourceError};
use tracing::{debug, info, warn};

/// Watches one address space for unexplained changes
pub struct Monitor<S, A = TracingAlertSink> {
    source: S,
    sink: A,
    config: MonitorConfig,
    baseline: MemoryRegionTracker,
    cycles: u64,
}

impl<S, A> Monitor<S, A>
where
    S: RegionSource,
    A: AlertSink,
{
    /// Validate `config` and take the baseline snapshot
    pub fn new(mut source: S, config: MonitorConfig, sink: A) -> MonitorResult<Self> {
        config.validate()?;

        let baseline = build_snapshot(&mut source)?;
        info!(
            pid = config.pid,
            pages = baseline.len(),
            executable_pages = baseline.executable_pages(),
            "Baseline snapshot taken"
        );
        if config.dump_baseline {
            baseline.log_pages();
        }

        Ok(Self {
            source,
            sink,
            config,
            baseline,
            cycles: 0,
        })
    }

    pub fn baseline(&self) -> &MemoryRegionTracker {
        &self.baseline
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Completed comparison cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    /// Take one fresh snapshot and compare it against the baseline
    pub fn scan_once(&mut self) -> MonitorResult<ScanVerdict> {
        let cycle = self.cycles + 1;
        let span = ScanSpan::new(cycle, self.config.pid);

        let snapshot = build_snapshot(&mut self.source)?;
        span.record_pages(snapshot.len());
        let result = diff(&self.baseline, &snapshot);
        snapshot.teardown();
        self.cycles = cycle;

        span.record_verdict(result.is_identical());
        let _entered = span.enter();

        if result.is_identical() {
            debug!(cycle, "Snapshots identical");
            return Ok(ScanVerdict::Clean);
        }

        warn!(cycle, diff = %result, "Address space diverged from baseline");
        let alert = Alert::injection(self.config.pid, cycle, result.clone());
        self.sink.dispatch(&alert)?;
        Ok(ScanVerdict::InjectionDetected(result))
    }

    /// Scan every `scan_interval` until a change is detected, the cycle
    /// limit is reached, the process exits or the user interrupts.
    pub async fn run(&mut self) -> MonitorResult<MonitorOutcome> {
        info!(
            pid = self.config.pid,
            interval_ms = self.config.scan_interval.as_millis() as u64,
            max_cycles = self.config.max_cycles,
            "Monitoring started"
        );

        loop {
            if let Some(max) = self.config.max_cycles {
                if self.cycles >= max {
                    info!(cycles = self.cycles, "Cycle limit reached");
                    return Ok(MonitorOutcome::CycleLimit {
                        cycles: self.cycles,
                    });
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.scan_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!(cycles = self.cycles, "Interrupted");
                    return Ok(MonitorOutcome::Interrupted { cycles: self.cycles });
                }
            }

            if !self.source.is_alive() {
                info!(pid = self.config.pid, "Monitored process exited");
                return Ok(MonitorOutcome::ProcessExited {
                    cycles: self.cycles,
                });
            }

            match self.scan_once() {
                Ok(ScanVerdict::Clean) => {}
                Ok(ScanVerdict::InjectionDetected(diff)) => {
                    return Ok(MonitorOutcome::Detected {
                        cycle: self.cycles,
                        diff,
                    });
                }
                Err(MonitorError::Source(SourceError::ProcessGone(pid))) => {
                    info!(pid, "Monitored process exited");
                    return Ok(MonitorOutcome::ProcessExited {
                        cycles: self.cycles,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
