//! The three-level translation map: L1 -> L2 -> L3 -> frame descriptor.
//!
//! Intermediate levels are plain owned `Box` nodes, allocated lazily on first use by a
//! lookup that needs to descend through them. Leaf frames are not stored inline: the L3
//! table holds `FrameDescriptor` words referencing frames obtained from a `FrameSource`,
//! since those must be real physical memory the TLB hardware can address.

use alloc::boxed::Box;

use crate::bits::VirtPage;
use crate::collaborators::FrameSource;
use crate::config::{L1_SIZE, L2_SIZE, L3_SIZE};
use crate::error::{VmError, VmResult};
use crate::frame::{Frame, FrameDescriptor};

struct L3Table {
    entries: [FrameDescriptor; L3_SIZE],
}

impl L3Table {
    fn new() -> Box<Self> {
        Box::new(Self {
            entries: [FrameDescriptor::new(); L3_SIZE],
        })
    }
}

struct L2Table {
    entries: [Option<Box<L3Table>>; L2_SIZE],
}

impl L2Table {
    fn new() -> Box<Self> {
        Box::new(Self {
            entries: core::array::from_fn(|_| None),
        })
    }
}

struct L1Table {
    entries: [Option<Box<L2Table>>; L1_SIZE],
}

impl L1Table {
    fn new() -> Box<Self> {
        Box::new(Self {
            entries: core::array::from_fn(|_| None),
        })
    }
}

/// The root of one address space's translation map.
pub struct Map {
    root: Box<L1Table>,
}

impl Map {
    pub fn new() -> Self {
        Self { root: L1Table::new() }
    }

    /// Looks up the leaf descriptor for `page`, without allocating any intermediate table.
    pub fn lookup(&self, page: VirtPage) -> Option<FrameDescriptor> {
        let l2 = self.root.entries[page.l1_index()].as_deref()?;
        let l3 = l2.entries[page.l2_index()].as_deref()?;
        let desc = l3.entries[page.l3_index()];
        (!desc.is_absent()).then_some(desc)
    }

    /// Installs `descriptor` at `page`, lazily allocating any missing intermediate tables.
    pub fn install(&mut self, page: VirtPage, descriptor: FrameDescriptor) -> VmResult<()> {
        let l2 = self.root.entries[page.l1_index()].get_or_insert_with(L2Table::new);
        let l3 = l2.entries[page.l2_index()].get_or_insert_with(L3Table::new);
        l3.entries[page.l3_index()] = descriptor;
        Ok(())
    }

    /// Allocates a fresh zero-filled frame and installs it at `page` with the given
    /// dirty/writable bit, returning the frame.
    pub fn allocate_and_install(
        &mut self,
        page: VirtPage,
        writable: bool,
        frames: &mut impl FrameSource,
    ) -> VmResult<Frame> {
        let frame = frames.alloc_frame().ok_or(VmError::Enomem)?;
        self.install(page, FrameDescriptor::present(frame, writable))?;
        Ok(frame)
    }

    /// Deep-copies every mapped page into freshly allocated frames, preserving the tree
    /// shape. Used by address-space fork; there is no copy-on-write sharing.
    pub fn duplicate(&self, frames: &mut impl FrameSource) -> VmResult<Self> {
        let mut copy = Self::new();
        if let Err(err) = copy.duplicate_into(self, frames) {
            // SAFETY: `copy` only holds frames this loop itself allocated from `frames`,
            // and `copy` is not installed in any TLB.
            unsafe { copy.destroy(frames) };
            return Err(err);
        }
        Ok(copy)
    }

    fn duplicate_into(&mut self, source: &Self, frames: &mut impl FrameSource) -> VmResult<()> {
        for l1 in 0..L1_SIZE {
            let Some(l2) = source.root.entries[l1].as_deref() else {
                continue;
            };
            for l2i in 0..L2_SIZE {
                let Some(l3) = l2.entries[l2i].as_deref() else {
                    continue;
                };
                for l3i in 0..L3_SIZE {
                    let desc = l3.entries[l3i];
                    if desc.is_absent() {
                        continue;
                    }
                    let src_frame = desc.frame().expect("present descriptor has a frame");
                    let dst_frame = frames.alloc_frame().ok_or(VmError::Enomem)?;

                    // SAFETY: both frames were just obtained from `frames` and are not yet
                    // referenced by any installed mapping.
                    unsafe {
                        let src = frames.kernel_view_mut(src_frame) as *mut [u8];
                        let dst = frames.kernel_view_mut(dst_frame);
                        dst.copy_from_slice(&*src);
                    }

                    let page = VirtPage::reconstruct(l1, l2i, l3i);
                    self.install(page, FrameDescriptor::present(dst_frame, desc.dirty()))?;
                }
            }
        }
        Ok(())
    }

    /// Frees every frame referenced by this map's leaves.
    ///
    /// # Safety
    ///
    /// The caller must guarantee this map is not installed in any active TLB.
    pub unsafe fn destroy(self, frames: &mut impl FrameSource) {
        for l2 in self.root.entries.into_iter().flatten() {
            for l3 in l2.entries.into_iter().flatten() {
                for desc in l3.entries {
                    if let Some(frame) = desc.frame() {
                        // SAFETY: caller guarantees no active TLB references these frames.
                        unsafe { frames.free_frame(frame) };
                    }
                }
            }
        }
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}
