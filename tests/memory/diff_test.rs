/*!
 * Snapshot Diff Tests
 * Equality, symmetry and first-difference reporting
 */

use honeyproc::memory::{
    diff, equal, kind, protect, state, MemoryRegionTracker, SnapshotDiff,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn scenario_baseline() -> MemoryRegionTracker {
    let mut tracker = MemoryRegionTracker::new();
    tracker
        .track(0x1000, state::COMMIT, protect::READONLY, kind::PRIVATE)
        .unwrap();
    tracker
        .track(0x2000, state::COMMIT, protect::EXECUTE_READ, kind::IMAGE)
        .unwrap();
    tracker
}

#[test]
fn test_injected_page_detected_by_count() {
    let a = scenario_baseline();
    let mut b = scenario_baseline();
    assert!(equal(&a, &b));

    b.track(0x3000, state::COMMIT, protect::EXECUTE_READWRITE, kind::PRIVATE)
        .unwrap();
    assert!(!equal(&a, &b));
    assert_eq!(diff(&a, &b), SnapshotDiff::CountMismatch { left: 2, right: 3 });
}

#[test]
fn test_reflexive_and_symmetric() {
    let a = scenario_baseline();
    assert!(equal(&a, &a));

    let mut b = MemoryRegionTracker::new();
    b.track(0x1000, state::COMMIT, protect::READONLY, kind::PRIVATE)
        .unwrap();
    b.track(0x2000, state::COMMIT, protect::READWRITE, kind::IMAGE)
        .unwrap();
    assert_eq!(equal(&a, &b), equal(&b, &a));
    assert!(!equal(&a, &b));
}

#[test]
fn test_protection_change_reported_at_index() {
    let a = scenario_baseline();
    let mut b = MemoryRegionTracker::new();
    b.track(0x1000, state::COMMIT, protect::READONLY, kind::PRIVATE)
        .unwrap();
    b.track(0x2000, state::COMMIT, protect::EXECUTE_READWRITE, kind::IMAGE)
        .unwrap();

    match diff(&a, &b) {
        SnapshotDiff::RegionMismatch { index, left, right } => {
            assert_eq!(index, 1);
            assert_eq!(left.page_start, 0x2000);
            assert_eq!(left.protect, protect::EXECUTE_READ);
            assert_eq!(right.protect, protect::EXECUTE_READWRITE);
        }
        other => panic!("expected region mismatch, got {:?}", other),
    }
}

#[test]
fn test_moved_page_is_a_mismatch() {
    let a = scenario_baseline();
    let mut b = MemoryRegionTracker::new();
    b.track(0x1000, state::COMMIT, protect::READONLY, kind::PRIVATE)
        .unwrap();
    b.track(0x8000, state::COMMIT, protect::EXECUTE_READ, kind::IMAGE)
        .unwrap();
    assert!(matches!(
        diff(&a, &b),
        SnapshotDiff::RegionMismatch { index: 1, .. }
    ));
}

#[test]
fn test_insertion_order_does_not_matter() {
    let mut addrs: Vec<u64> = (0..512u64).map(|i| 0x10_0000 + i * 0x1000).collect();

    let mut a = MemoryRegionTracker::new();
    for &addr in &addrs {
        a.track(addr, state::COMMIT, protect::READWRITE, kind::PRIVATE)
            .unwrap();
    }

    addrs.shuffle(&mut StdRng::seed_from_u64(0x5eed));
    let mut b = MemoryRegionTracker::new();
    for &addr in &addrs {
        b.track(addr + 0x10, state::COMMIT, protect::READWRITE, kind::PRIVATE)
            .unwrap();
    }

    assert!(equal(&a, &b));
    assert!(equal(&b, &a));
}
