//! Compile-time sizing constants for the translation map and the user stack.
//!
//! Centralized here, in one `pub const` surface, rather than scattered through the map,
//! region, and fault-handler modules — mirrors how the board's clock/affinity configuration
//! is centralized rather than inlined at each call site.

/// Bits of page offset within a virtual or physical address.
pub const PAGE_SIZE_BITS: u32 = 12;

/// Size, in bytes, of one page.
pub const PAGE_SIZE: usize = 1 << PAGE_SIZE_BITS;

/// Mask selecting the page offset out of a virtual address.
pub const PAGE_OFFSET_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// Mask selecting the page-aligned portion of a virtual address.
pub const PAGE_FRAME_MASK: u32 = !PAGE_OFFSET_MASK;

/// Bits consumed by the L1 index (the top slice of the virtual page number).
pub const L1_BITS: u32 = 8;
/// Bits consumed by the L2 index.
pub const L2_BITS: u32 = 6;
/// Bits consumed by the L3 index.
pub const L3_BITS: u32 = 6;

/// Number of entries in an L1 table.
pub const L1_SIZE: usize = 1 << L1_BITS;
/// Number of entries in an L2 table.
pub const L2_SIZE: usize = 1 << L2_BITS;
/// Number of entries in an L3 table.
pub const L3_SIZE: usize = 1 << L3_BITS;

const _: () = assert!(L1_BITS + L2_BITS + L3_BITS + PAGE_SIZE_BITS == 32);

/// Top of user virtual memory; the stack region grows downward from here.
///
/// This is a platform constant in the host kernel (traditionally `0x8000_0000` on the
/// teaching OS this subsystem is modeled after); fixed here since the core has no board
/// layer of its own to source it from.
pub const USERSTACK: u32 = 0x8000_0000;

/// Size, in bytes, of the initial user stack region.
pub const STACK_SIZE: usize = 2 * 1024 * 1024;

const _: () = assert!(STACK_SIZE % PAGE_SIZE == 0);
