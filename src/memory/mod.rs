/*!
 * Memory Module
 * Page-level address-space snapshots and their comparison
 */

pub mod diff;
pub mod procfs;
pub mod source;
pub mod tracker;
pub mod types;

// Re-export for convenience
pub use diff::{diff, equal, SnapshotDiff};
pub use procfs::{process_alive, ProcMapsSource};
pub use source::{build_snapshot, RawRegion, RegionSource, StaticSource};
pub use tracker::{MemoryRegionTracker, Tracked};
pub use types::*;
