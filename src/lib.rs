#![cfg_attr(not(test), no_std)]

//! Software-refilled TLB virtual memory core.
//!
//! Hosts a per-address-space three-level translation map, a region list describing
//! permissions over a process's virtual address ranges, and the fault handler that
//! bridges a hardware TLB-miss trap between the two. The map, region list, and fault
//! handler know nothing about frame allocation, real TLB hardware, or interrupt priority
//! directly; those are supplied by the host kernel through the traits in
//! [`collaborators`].

extern crate alloc;

pub mod address_space;
pub mod bits;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod fault;
pub mod frame;
pub mod map;
pub mod region;
pub mod tlb;

#[cfg(test)]
mod test_support;

pub use address_space::AddressSpace;
pub use collaborators::{CurrentProcess, FrameSource, InterruptControl, TlbPort};
pub use error::{VmError, VmResult};
pub use fault::{fault, FaultKind};
pub use region::Permissions;

/// Brings up a fresh address space with its stack region already defined.
///
/// Mirrors the host kernel's boot-time call into `as_create` followed by
/// `as_define_region` for the stack, bundled as one entry point so callers don't have to
/// remember the ordering.
pub fn vm_bootstrap() -> VmResult<AddressSpace> {
    let mut space = AddressSpace::create();
    space.define_stack()?;
    log::debug!("address space bootstrapped with stack region");
    Ok(space)
}

/// Cross-CPU TLB invalidation hook.
///
/// This core targets a single-CPU kernel only; a multiprocessor host that calls this is
/// misusing the crate outside its supported scope, so this is a hard panic rather than a
/// silently-ignored no-op.
pub fn vm_tlbshootdown() -> ! {
    panic!("TLB shootdown is not supported on a uniprocessor kernel");
}
