//! Address-space lifecycle: creation, fork, teardown, and TLB (de)activation.

use crate::collaborators::{FrameSource, InterruptControl, InterruptGuard, TlbPort};
use crate::error::VmResult;
use crate::region::{Permissions, RegionList};
use crate::map::Map;

/// One process's virtual address space: its region list plus its translation map.
pub struct AddressSpace {
    regions: RegionList,
    map: Map,
}

impl AddressSpace {
    /// Creates an empty address space with no regions and an empty map.
    pub fn create() -> Self {
        Self {
            regions: RegionList::new(),
            map: Map::new(),
        }
    }

    pub fn regions(&self) -> &RegionList {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut RegionList {
        &mut self.regions
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    pub fn define_region(&mut self, vaddr: u32, memsize: u32, perms: Permissions) -> VmResult<()> {
        self.regions.define_region(vaddr, memsize, perms)
    }

    pub fn define_stack(&mut self) -> VmResult<()> {
        self.regions.define_stack()
    }

    /// Opens the load window: every region not already writable becomes writable.
    pub fn prepare_load(&mut self) {
        self.regions.prepare_load();
    }

    /// Closes the load window: restores each region's original permissions, then
    /// invalidates the entire TLB so no stale translation outlives the temporarily
    /// widened permissions that were in effect while the window was open.
    pub fn complete_load(&mut self, tlb: &mut impl TlbPort, interrupts: &mut impl InterruptControl) {
        self.regions.complete_load();
        let _guard = InterruptGuard::enter(interrupts);
        tlb.invalidate_all();
    }

    /// Forks this address space: every mapped frame is deep-copied into a freshly
    /// allocated frame in the child, and the region list is duplicated by value. There is
    /// no copy-on-write sharing between parent and child.
    pub fn fork(&self, frames: &mut impl FrameSource) -> VmResult<Self> {
        Ok(Self {
            regions: self.regions.clone(),
            map: self.map.duplicate(frames)?,
        })
    }

    /// Tears down this address space, freeing every frame it holds.
    ///
    /// # Safety
    ///
    /// The caller must guarantee this address space is not the one currently active in any
    /// TLB (call `deactivate` first, or ensure it was never activated).
    pub unsafe fn destroy(self, frames: &mut impl FrameSource) {
        // SAFETY: forwarded from this function's own safety contract.
        unsafe { self.map.destroy(frames) };
    }

    /// Activates this address space: invalidates every TLB entry under raised interrupt
    /// priority, so the next access in any region refaults through this map.
    pub fn activate(&self, tlb: &mut impl TlbPort, interrupts: &mut impl InterruptControl) {
        let _guard = InterruptGuard::enter(interrupts);
        tlb.invalidate_all();
    }

    /// Deactivates this address space ahead of a switch away from it.
    ///
    /// Uniprocessor teaching kernels typically have nothing to do here beyond what
    /// `activate` already performs on the way in; kept as a distinct entry point so a host
    /// kernel can call it symmetrically.
    pub fn deactivate(&self) {}
}
