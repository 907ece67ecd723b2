//! Physical frame numbers and the packed frame-descriptor word stored at L3 leaves.

use bitfield_struct::bitfield;

use crate::config::PAGE_SIZE_BITS;

/// A physical frame number (a page-aligned physical address, shifted right by the page size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(u32);

impl Frame {
    /// Wraps a page-aligned physical address as a frame.
    ///
    /// Panics if `paddr` is not page-aligned; the frame allocator is expected to hand back
    /// page-aligned addresses only.
    pub fn from_paddr(paddr: u32) -> Self {
        assert_eq!(paddr & ((1 << PAGE_SIZE_BITS) - 1), 0, "frame address not page-aligned");
        Self(paddr >> PAGE_SIZE_BITS)
    }

    pub const fn paddr(self) -> u32 {
        self.0 << PAGE_SIZE_BITS
    }
}

/// A single L3 leaf entry: one 32-bit word packing validity, dirtiness, and the frame number.
///
/// A zero word means "absent" — no frame has been allocated for this page yet. This mirrors
/// the frame descriptor used to build the hardware TLB entry's low word.
#[bitfield(u32)]
pub struct FrameDescriptor {
    pub valid: bool,
    pub dirty: bool,
    #[bits(10)]
    _reserved: u16,
    #[bits(20)]
    frame_number: u32,
}

impl FrameDescriptor {
    /// Builds a descriptor for a present, mapped page.
    pub fn present(frame: Frame, writable: bool) -> Self {
        Self::new()
            .with_valid(true)
            .with_dirty(writable)
            .with_frame_number(frame.0)
    }

    /// `true` if this slot has no frame allocated.
    pub fn is_absent(self) -> bool {
        self.into_bits() == 0
    }

    pub fn frame(self) -> Option<Frame> {
        self.valid().then(|| Frame(self.frame_number()))
    }
}
