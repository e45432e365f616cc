/*!
 * Region Sources
 * Enumerate a process address space and turn it into a page snapshot
 */

use super::tracker::MemoryRegionTracker;
use super::types::{state, SourceResult};
use crate::core::limits::PAGE_SIZE;
use crate::core::types::{Address, Attribute, Size};
use serde::{Deserialize, Serialize};

/// One contiguous region as reported by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRegion {
    pub base: Address,
    pub size: Size,
    pub state: Attribute,
    pub protect: Attribute,
    pub kind: Attribute,
}

impl RawRegion {
    pub fn new(base: Address, size: Size, state: Attribute, protect: Attribute, kind: Attribute) -> Self {
        Self {
            base,
            size,
            state,
            protect,
            kind,
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == state::FREE
    }

    /// Addresses of every page-sized chunk in the region
    pub fn pages(&self) -> impl Iterator<Item = Address> + '_ {
        (0..self.size)
            .step_by(PAGE_SIZE as usize)
            .map_while(move |offset| self.base.checked_add(offset))
    }
}

/// Address-space enumeration for one process
pub trait RegionSource {
    /// Regions from the lowest to the highest address, FREE ones included
    fn regions(&mut self) -> SourceResult<Vec<RawRegion>>;

    /// Whether the enumerated process still exists
    fn is_alive(&self) -> bool {
        true
    }
}

/// Build a snapshot with one entry per page of every non-free region
pub fn build_snapshot<S>(source: &mut S) -> SourceResult<MemoryRegionTracker>
where
    S: RegionSource + ?Sized,
{
    let mut tracker = MemoryRegionTracker::new();
    for region in source.regions()? {
        if region.is_free() {
            continue;
        }
        for addr in region.pages() {
            tracker.track(addr, region.state, region.protect, region.kind)?;
        }
    }
    Ok(tracker)
}

/// Replayable in-memory source
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    regions: Vec<RawRegion>,
}

impl StaticSource {
    pub fn new(regions: Vec<RawRegion>) -> Self {
        Self { regions }
    }

    /// Add a region to every future enumeration
    pub fn push(&mut self, region: RawRegion) {
        self.regions.push(region);
    }

    /// Replace the reported layout
    pub fn set_regions(&mut self, regions: Vec<RawRegion>) {
        self.regions = regions;
    }
}

impl RegionSource for StaticSource {
    fn regions(&mut self) -> SourceResult<Vec<RawRegion>> {
        Ok(self.regions.clone())
    }
}
