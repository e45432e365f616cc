/*!
 * Snapshot Diffing
 * Decide whether two address-space snapshots are identical
 *
 * Both snapshots are ordered by page start address under the same
 * comparator, so position `i` in each materialized sequence is the page with
 * the `i`-th smallest start address. Positional comparison is therefore
 * exact, and independent of insertion order or tree shape.
 */

use super::tracker::MemoryRegionTracker;
use super::types::MemoryRegion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First difference found between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SnapshotDiff {
    Identical,
    /// Page counts differ; no page-level comparison was done
    CountMismatch { left: usize, right: usize },
    /// Pages at `index` (ascending order) differ in address or attributes
    RegionMismatch {
        index: usize,
        left: MemoryRegion,
        right: MemoryRegion,
    },
}

impl SnapshotDiff {
    #[inline]
    pub fn is_identical(&self) -> bool {
        matches!(self, SnapshotDiff::Identical)
    }
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotDiff::Identical => write!(f, "snapshots identical"),
            SnapshotDiff::CountMismatch { left, right } => {
                write!(f, "page count changed: {} != {}", left, right)
            }
            SnapshotDiff::RegionMismatch { index, left, right } => {
                write!(f, "page #{} changed: [{}] != [{}]", index, left, right)
            }
        }
    }
}

/// Compare two snapshots, stopping at the first difference
pub fn diff(a: &MemoryRegionTracker, b: &MemoryRegionTracker) -> SnapshotDiff {
    if a.len() != b.len() {
        return SnapshotDiff::CountMismatch {
            left: a.len(),
            right: b.len(),
        };
    }

    let left = a.to_vec();
    let right = b.to_vec();

    for (index, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        if l != r {
            return SnapshotDiff::RegionMismatch {
                index,
                left: **l,
                right: **r,
            };
        }
    }

    SnapshotDiff::Identical
}

/// True when both snapshots hold exactly the same pages and attributes
pub fn equal(a: &MemoryRegionTracker, b: &MemoryRegionTracker) -> bool {
    diff(a, b).is_identical()
}
