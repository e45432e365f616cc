/*!
 * Memory Region Tracker
 * Page-granular snapshot of a process address space
 *
 * Every page is an independent entry keyed by its start address. Adjacent
 * pages with identical attributes are never merged, so two snapshots of the
 * same address space always hold the same number of entries.
 */

use super::types::{MemoryRegion, RegionError, RegionResult};
use crate::core::data_structures::{InsertError, Iter, OrderedMap};
use crate::core::types::{Address, Attribute};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

type RegionOrder = fn(&MemoryRegion, &MemoryRegion) -> Ordering;

/// Outcome of a successful `track` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracked {
    /// The page was not known and is now recorded
    New,
    /// A page with the same start address was already recorded and kept
    AlreadyTracked,
}

/// Ordered, duplicate-free set of pages
pub struct MemoryRegionTracker {
    pages: OrderedMap<MemoryRegion, RegionOrder>,
}

impl MemoryRegionTracker {
    pub fn new() -> Self {
        Self {
            pages: OrderedMap::new(MemoryRegion::cmp_start as RegionOrder),
        }
    }

    /// Record the page containing `addr`.
    ///
    /// Re-tracking a known page is a no-op: the first attributes recorded for
    /// a start address win.
    pub fn track(
        &mut self,
        addr: Address,
        state: Attribute,
        protect: Attribute,
        kind: Attribute,
    ) -> RegionResult<Tracked> {
        self.track_region(MemoryRegion::containing(addr, state, protect, kind))
    }

    fn track_region(&mut self, region: MemoryRegion) -> RegionResult<Tracked> {
        insert_outcome(self.pages.insert(region))
    }

    /// Track every page of `src` using its recorded attributes.
    ///
    /// Afterwards `self` holds the union of both snapshots; pages already
    /// present in `self` keep their attributes. Returns how many pages were
    /// new to `self`.
    pub fn import(&mut self, src: &MemoryRegionTracker) -> RegionResult<usize> {
        let mut added = 0;
        for region in src.regions() {
            if self.track_region(*region)? == Tracked::New {
                added += 1;
            }
        }
        Ok(added)
    }

    /// The tracked page containing `addr`
    pub fn get(&self, addr: Address) -> Option<&MemoryRegion> {
        self.pages.get(&MemoryRegion::probe(addr))
    }

    /// Number of tracked pages
    #[inline]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in ascending start-address order
    pub fn regions(&self) -> Iter<'_, MemoryRegion> {
        self.pages.iter()
    }

    /// Materialize the pages in ascending start-address order
    pub fn to_vec(&self) -> Vec<&MemoryRegion> {
        self.pages.to_vec()
    }

    /// Number of tracked pages whose protection allows execution
    pub fn executable_pages(&self) -> usize {
        self.regions().filter(|region| region.is_executable()).count()
    }

    /// Dump every page at debug level
    pub fn log_pages(&self) {
        debug!(pages = self.len(), "Memory map");
        for region in self.regions() {
            debug!(start = region.page_start, "Page: {}", region);
        }
    }

    /// Release the snapshot and every page it holds
    pub fn teardown(self) {
        self.pages.teardown();
    }
}

/// Duplicates are benign for a tracker; only allocation failure is an error
fn insert_outcome(result: Result<(), InsertError<'_, MemoryRegion>>) -> RegionResult<Tracked> {
    match result {
        Ok(()) => Ok(Tracked::New),
        Err(InsertError::Duplicate { .. }) => Ok(Tracked::AlreadyTracked),
        Err(InsertError::AllocationFailure { rejected }) => Err(RegionError::AllocationFailure {
            page: rejected.page_start,
        }),
    }
}

impl Default for MemoryRegionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryRegionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegionTracker")
            .field("pages", &self.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a MemoryRegionTracker {
    type Item = &'a MemoryRegion;
    type IntoIter = Iter<'a, MemoryRegion>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions()
    }
}
