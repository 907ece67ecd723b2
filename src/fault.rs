//! The trap entry point: classifies a fault, resolves it against the map and region list,
//! and refills the TLB.

use crate::address_space::AddressSpace;
use crate::bits::VirtPage;
use crate::collaborators::{CurrentProcess, FrameSource, InterruptControl, InterruptGuard, TlbPort};
use crate::error::{VmError, VmResult};
use crate::region::Permissions;
use crate::tlb::build_entry;

/// The kind of access that missed the TLB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Read,
    Write,
    /// A write that the hardware itself already flagged as hitting a read-only entry.
    ReadonlyWrite,
}

/// Services one TLB miss for `fault_vaddr` in the current process's address space.
///
/// Implements the fault protocol: no current process or a hardware-flagged read-only write
/// are rejected outright; a map hit is refilled directly; a map miss falls through to the
/// region list, which must cover the address and, for writes, grant write permission,
/// before a frame is allocated and installed.
pub fn fault<P, F, T, I>(
    process: &mut P,
    frames: &mut F,
    tlb: &mut T,
    interrupts: &mut I,
    kind: FaultKind,
    fault_vaddr: u32,
) -> VmResult<()>
where
    P: CurrentProcess,
    F: FrameSource,
    T: TlbPort,
    I: InterruptControl,
{
    process.with_current_address_space(|maybe_as| {
        let Some(address_space) = maybe_as else {
            log::warn!("fault with no current address space");
            return Err(VmError::Efault);
        };

        if kind == FaultKind::ReadonlyWrite {
            log::warn!("hardware-flagged read-only write at {fault_vaddr:#x}");
            return Err(VmError::Efault);
        }

        service(address_space, frames, tlb, interrupts, kind, fault_vaddr)
    })
}

fn service<F, T, I>(
    address_space: &mut AddressSpace,
    frames: &mut F,
    tlb: &mut T,
    interrupts: &mut I,
    kind: FaultKind,
    fault_vaddr: u32,
) -> VmResult<()>
where
    F: FrameSource,
    T: TlbPort,
    I: InterruptControl,
{
    let page = VirtPage::containing(fault_vaddr);

    if let Some(descriptor) = address_space.map().lookup(page) {
        if kind == FaultKind::Write {
            let writable = address_space
                .regions()
                .find(fault_vaddr)
                .is_some_and(|r| r.permissions().contains(Permissions::WRITE));
            if !writable {
                log::debug!("write fault at {fault_vaddr:#x} against now read-only region");
                return Err(VmError::Efault);
            }
        }
        log::trace!("fault hit at {fault_vaddr:#x}, refilling tlb");
        refill(tlb, interrupts, page, descriptor);
        return Ok(());
    }

    let Some(region) = address_space.regions().find(fault_vaddr) else {
        log::debug!("fault at {fault_vaddr:#x} outside every region");
        return Err(VmError::Efault);
    };

    if kind == FaultKind::Write && !region.permissions().contains(Permissions::WRITE) {
        log::debug!("write fault at {fault_vaddr:#x} against read-only region");
        return Err(VmError::Efault);
    }

    let writable = region.permissions().contains(Permissions::WRITE);
    let frame = address_space
        .map_mut()
        .allocate_and_install(page, writable, frames)?;

    // SAFETY: `frame` was just allocated by `allocate_and_install` and is not yet visible
    // to any other mapping, so exclusive access to zero it is sound.
    unsafe {
        frames.kernel_view_mut(frame).fill(0);
    }

    log::trace!("fault at {fault_vaddr:#x} resolved with fresh frame, refilling tlb");
    let descriptor = address_space
        .map()
        .lookup(page)
        .expect("just installed");
    refill(tlb, interrupts, page, descriptor);
    Ok(())
}

fn refill<T: TlbPort, I: InterruptControl>(
    tlb: &mut T,
    interrupts: &mut I,
    page: VirtPage,
    descriptor: crate::frame::FrameDescriptor,
) {
    let _guard = InterruptGuard::enter(interrupts);
    tlb.write_random(build_entry(page, descriptor));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;
    use crate::test_support::{MockFrames, MockInterrupts, MockProcess, MockTlb};

    fn harness() -> (MockProcess, MockFrames, MockTlb, MockInterrupts) {
        (
            MockProcess::new(AddressSpace::create()),
            MockFrames::new(16),
            MockTlb::new(4),
            MockInterrupts::new(),
        )
    }

    #[test]
    fn first_touch_read_succeeds_and_installs() {
        let (mut process, mut frames, mut tlb, mut interrupts) = harness();
        process
            .as_mut()
            .unwrap()
            .define_region(0x0040_0000, PAGE_SIZE as u32, Permissions::READ | Permissions::EXEC)
            .unwrap();

        fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Read, 0x0040_0010)
            .unwrap();

        let page = VirtPage::containing(0x0040_0010);
        let desc = process.as_mut().unwrap().map().lookup(page).unwrap();
        assert!(desc.valid());
    }

    #[test]
    fn fault_outside_any_region_is_efault_and_leaves_map_empty() {
        let (mut process, mut frames, mut tlb, mut interrupts) = harness();
        let err = fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Read, 0x0040_0000)
            .unwrap_err();
        assert_eq!(err, VmError::Efault);
        assert_eq!(
            process.as_mut().unwrap().map().lookup(VirtPage::containing(0x0040_0000)),
            None
        );
    }

    #[test]
    fn write_to_readonly_region_is_efault_without_allocating() {
        let (mut process, mut frames, mut tlb, mut interrupts) = harness();
        process
            .as_mut()
            .unwrap()
            .define_region(0x0040_0000, 2 * PAGE_SIZE as u32, Permissions::READ | Permissions::EXEC)
            .unwrap();

        let err = fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Write, 0x0040_0500)
            .unwrap_err();
        assert_eq!(err, VmError::Efault);
        assert_eq!(frames.allocated_count(), 0);
    }

    #[test]
    fn load_window_permits_then_forbids_write() {
        let (mut process, mut frames, mut tlb, mut interrupts) = harness();
        process
            .as_mut()
            .unwrap()
            .define_region(0x0040_0000, PAGE_SIZE as u32, Permissions::READ | Permissions::EXEC)
            .unwrap();

        process.as_mut().unwrap().prepare_load();
        fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Write, 0x0040_0000)
            .unwrap();

        process.as_mut().unwrap().complete_load(&mut tlb, &mut interrupts);
        let err = fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Write, 0x0040_0004)
            .unwrap_err();
        assert_eq!(err, VmError::Efault);
    }

    #[test]
    fn readonly_write_kind_is_always_efault() {
        let (mut process, mut frames, mut tlb, mut interrupts) = harness();
        let err = fault(
            &mut process,
            &mut frames,
            &mut tlb,
            &mut interrupts,
            FaultKind::ReadonlyWrite,
            0x0040_0000,
        )
        .unwrap_err();
        assert_eq!(err, VmError::Efault);
    }

    #[test]
    fn no_current_process_is_efault() {
        let mut process = MockProcess::empty();
        let mut frames = MockFrames::new(4);
        let mut tlb = MockTlb::new(4);
        let mut interrupts = MockInterrupts::new();
        let err = fault(&mut process, &mut frames, &mut tlb, &mut interrupts, FaultKind::Read, 0x1000)
            .unwrap_err();
        assert_eq!(err, VmError::Efault);
    }
}
