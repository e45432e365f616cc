/*!
 * System Limits and Constants
 *
 * Centralized location for page geometry, scan pacing and tree bounds.
 */

use std::time::Duration;

// =============================================================================
// ADDRESS SPACE
// =============================================================================

/// Granularity at which the address space is tracked (4KB)
/// Shared between the tracker and every region source
pub const PAGE_SIZE: u64 = 4096;

/// Mask selecting the in-page offset bits
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

// =============================================================================
// SCAN PACING
// =============================================================================

/// Default delay between snapshot cycles (5s)
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(5000);

/// Delay used by the aggressive preset (500ms)
pub const AGGRESSIVE_SCAN_INTERVAL: Duration = Duration::from_millis(500);

/// Lower bound accepted for a configured scan interval (10ms)
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(10);

// =============================================================================
// ORDERED MAP
// =============================================================================

/// Worst-case AVL height for a tree holding `entries` keys.
///
/// `ceil(1.44 * log2(n + 2) - 0.328)`
pub fn max_avl_height(entries: usize) -> usize {
    let n = entries as f64 + 2.0;
    let bound = 1.44 * n.log2() - 0.328;
    if bound <= 0.0 {
        0
    } else {
        bound.ceil() as usize
    }
}
