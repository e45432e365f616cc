/*!
 * Monitor Configuration
 *
 * Defaults, named presets and environment overrides for the monitoring loop
 */

use super::types::{MonitorError, MonitorResult};
use crate::core::limits::{AGGRESSIVE_SCAN_INTERVAL, DEFAULT_SCAN_INTERVAL, MIN_SCAN_INTERVAL};
use crate::core::types::Pid;
use std::time::Duration;

pub const ENV_SCAN_INTERVAL_MS: &str = "HONEYPROC_SCAN_INTERVAL_MS";
pub const ENV_MAX_CYCLES: &str = "HONEYPROC_MAX_CYCLES";
pub const ENV_ALERT_JSON: &str = "HONEYPROC_ALERT_JSON";
pub const ENV_DUMP_BASELINE: &str = "HONEYPROC_DUMP_BASELINE";

/// Monitoring loop configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Decoy process being watched
    pub pid: Option<Pid>,
    /// Delay between snapshot cycles
    pub scan_interval: Duration,
    /// Stop after this many clean cycles (None = run until detection)
    pub max_cycles: Option<u64>,
    /// Emit alerts as JSON lines on stdout instead of log events
    pub json_alerts: bool,
    /// Dump every baseline page at debug level
    pub dump_baseline: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pid: None,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            max_cycles: None,
            json_alerts: false,
            dump_baseline: false,
        }
    }
}

impl MonitorConfig {
    pub fn for_pid(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            ..Self::default()
        }
    }

    /// Short interval for decoys expected to be attacked soon
    pub fn aggressive(pid: Pid) -> Self {
        Self {
            scan_interval: AGGRESSIVE_SCAN_INTERVAL,
            ..Self::for_pid(pid)
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Defaults for `pid` overridden by the process environment
    pub fn from_env(pid: Pid) -> MonitorResult<Self> {
        Self::from_lookup(pid, |key| std::env::var(key).ok())
    }

    /// Defaults for `pid` overridden by whatever `lookup` returns per key
    pub fn from_lookup<F>(pid: Pid, lookup: F) -> MonitorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::for_pid(pid);

        if let Some(value) = lookup(ENV_SCAN_INTERVAL_MS) {
            let millis = parse_u64(ENV_SCAN_INTERVAL_MS, &value)?;
            config.scan_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_MAX_CYCLES) {
            config.max_cycles = Some(parse_u64(ENV_MAX_CYCLES, &value)?);
        }
        if let Some(value) = lookup(ENV_ALERT_JSON) {
            config.json_alerts = parse_flag(ENV_ALERT_JSON, &value)?;
        }
        if let Some(value) = lookup(ENV_DUMP_BASELINE) {
            config.dump_baseline = parse_flag(ENV_DUMP_BASELINE, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.scan_interval < MIN_SCAN_INTERVAL {
            return Err(MonitorError::InvalidConfig {
                key: ENV_SCAN_INTERVAL_MS,
                value: self.scan_interval.as_millis().to_string(),
                reason: format!("must be at least {}ms", MIN_SCAN_INTERVAL.as_millis()),
            });
        }
        if self.max_cycles == Some(0) {
            return Err(MonitorError::InvalidConfig {
                key: ENV_MAX_CYCLES,
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_u64(key: &'static str, value: &str) -> MonitorResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| MonitorError::InvalidConfig {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(key: &'static str, value: &str) -> MonitorResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(MonitorError::InvalidConfig {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
