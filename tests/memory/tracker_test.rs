/*!
 * Memory Region Tracker Tests
 * Page normalization, duplicate handling and snapshot import
 */

use honeyproc::memory::{kind, protect, state, MemoryRegionTracker, RegionResult, Tracked};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn tracker_with(pages: &[(u64, u32)]) -> RegionResult<MemoryRegionTracker> {
    let mut tracker = MemoryRegionTracker::new();
    for &(addr, prot) in pages {
        tracker.track(addr, state::COMMIT, prot, kind::PRIVATE)?;
    }
    Ok(tracker)
}

#[test]
fn test_unaligned_address_tracked_as_page() {
    let mut tracker = MemoryRegionTracker::new();
    tracker
        .track(0x1050, state::COMMIT, protect::READONLY, kind::PRIVATE)
        .unwrap();

    let regions = tracker.to_vec();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].page_start, 0x1000);
    assert_eq!(regions[0].page_end, 0x1FFF);
}

#[test]
fn test_second_track_of_same_page_is_noop() {
    let mut tracker = MemoryRegionTracker::new();
    assert_eq!(
        tracker.track(0x1000, state::COMMIT, protect::READONLY, kind::PRIVATE),
        Ok(Tracked::New)
    );
    assert_eq!(
        tracker.track(0x1800, state::COMMIT, protect::READWRITE, kind::PRIVATE),
        Ok(Tracked::AlreadyTracked)
    );
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.get(0x1000).unwrap().protect, protect::READONLY);
}

#[test]
fn test_import_produces_union_with_first_writer_wins() {
    let mut dst = tracker_with(&[(0x1000, protect::READONLY), (0x3000, protect::READONLY)]).unwrap();
    let src = tracker_with(&[
        (0x2000, protect::READWRITE),
        (0x3000, protect::EXECUTE_READWRITE),
        (0x4000, protect::READWRITE),
    ])
    .unwrap();

    let added = dst.import(&src).unwrap();
    assert_eq!(added, 2);
    assert_eq!(dst.len(), 4);
    // Source is only read
    assert_eq!(src.len(), 3);

    let expected = tracker_with(&[
        (0x1000, protect::READONLY),
        (0x2000, protect::READWRITE),
        (0x3000, protect::READONLY),
        (0x4000, protect::READWRITE),
    ])
    .unwrap();
    assert!(honeyproc::equal(&dst, &expected));
}

#[test]
fn test_import_into_empty_copies_source() {
    let src = tracker_with(&[(0x7000, protect::EXECUTE_READ), (0x5000, protect::READONLY)]).unwrap();
    let mut dst = MemoryRegionTracker::new();
    assert_eq!(dst.import(&src).unwrap(), 2);
    assert!(honeyproc::equal(&dst, &src));
}

#[test]
fn test_iteration_is_ascending() {
    let tracker = tracker_with(&[
        (0x9000, protect::READONLY),
        (0x2000, protect::READONLY),
        (0x5000, protect::READONLY),
    ])
    .unwrap();
    let starts: Vec<u64> = (&tracker).into_iter().map(|r| r.page_start).collect();
    assert_eq!(starts, vec![0x2000, 0x5000, 0x9000]);
}

fn page_set() -> impl Strategy<Value = Vec<(u64, u32)>> {
    let prot = prop::sample::select(vec![
        protect::READONLY,
        protect::READWRITE,
        protect::EXECUTE_READ,
        protect::EXECUTE_READWRITE,
    ]);
    prop::collection::vec((0u64..96, prot), 0..64)
        .prop_map(|pages| {
            pages
                .into_iter()
                .map(|(n, p)| (0x1000 * (n + 1), p))
                .collect::<Vec<_>>()
        })
}

proptest! {
    #[test]
    fn prop_import_is_union_keeping_destination(dst_pages in page_set(), src_pages in page_set()) {
        let mut dst = tracker_with(&dst_pages).unwrap();
        let src = tracker_with(&src_pages).unwrap();
        let src_before: Vec<_> = src.regions().copied().collect();
        let dst_len = dst.len();

        // First writer wins inside each tracker, and dst wins over src
        let mut expected: BTreeMap<u64, u32> = BTreeMap::new();
        for &(addr, prot) in src_pages.iter().rev().chain(dst_pages.iter().rev()) {
            expected.insert(addr, prot);
        }

        let added = dst.import(&src).unwrap();
        prop_assert_eq!(added, dst.len() - dst_len);

        let actual: Vec<(u64, u32)> = dst.regions().map(|r| (r.page_start, r.protect)).collect();
        let expected: Vec<(u64, u32)> = expected.into_iter().collect();
        prop_assert_eq!(actual, expected);

        let src_after: Vec<_> = src.regions().copied().collect();
        prop_assert_eq!(src_after, src_before);
    }
}
