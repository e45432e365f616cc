/*!
 * HoneyProc Library
 * Code-injection detection for decoy processes via address-space snapshots
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::{OrderedMap, Pid};
pub use memory::{
    build_snapshot, diff, equal, MemoryRegion, MemoryRegionTracker, ProcMapsSource, RawRegion,
    RegionSource, SnapshotDiff, StaticSource, Tracked,
};
pub use monitoring::{
    init_tracing, Alert, AlertSink, JsonAlertSink, Monitor, MonitorConfig, MonitorOutcome,
    ScanVerdict, TracingAlertSink,
};
