//! Hardware TLB entry construction from a page number and a leaf descriptor.

use crate::bits::VirtPage;
use crate::collaborators::TlbEntry;
use crate::frame::FrameDescriptor;

/// Builds the hardware entry pair for `page` backed by `descriptor`.
///
/// `entry_hi` carries the page number bare; `entry_lo` carries the descriptor's packed
/// valid/dirty/frame-number word unchanged, since `FrameDescriptor` was designed to match
/// the hardware's low-word layout directly.
pub fn build_entry(page: VirtPage, descriptor: FrameDescriptor) -> TlbEntry {
    TlbEntry {
        entry_hi: page.addr(),
        entry_lo: descriptor.into_bits(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn entry_hi_carries_page_number() {
        let page = VirtPage::containing(0x0040_1000);
        let desc = FrameDescriptor::present(Frame::from_paddr(0x2000), true);
        let entry = build_entry(page, desc);
        assert_eq!(entry.entry_hi, 0x0040_1000);
        assert_eq!(entry.entry_lo, desc.into_bits());
    }
}
