//! Platform virtual memory primitives for vmarray.
//!
//! Exposes the three-operation backend contract the slot array is built
//! on, with one implementation per platform family:
//!
//! | Operation | POSIX | Windows |
//! |-----------|-------|---------|
//! | [`reserve`] | `mmap(PROT_NONE)` | `VirtualAlloc(MEM_RESERVE)` |
//! | [`commit`] | `mprotect(PROT_READ \| PROT_WRITE)` | `VirtualAlloc(MEM_COMMIT)` |
//! | [`release`] | `munmap` | `VirtualFree(MEM_RELEASE)` |
//!
//! Reserving claims address space only; no physical memory is consumed
//! until a sub-range is committed. Committed memory is zero-filled.
//!
//! Most callers want the RAII [`Reservation`] wrapper instead of the raw
//! functions: it validates offsets and page alignment and releases the
//! range on drop.
//!
//! This crate is one of two in the workspace that contain `unsafe` code
//! (along with `vmarray-slots`).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod page;
pub mod reservation;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

use std::ptr::NonNull;

pub use error::VmError;
pub use page::{page_size, round_up_to_page_size};
pub use reservation::Reservation;

/// Reserve `size` bytes of contiguous address space with no access rights
/// and no physical backing.
///
/// Fails only on address-space exhaustion (or `size == 0`), never because
/// of physical memory pressure.
pub fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    if size == 0 {
        return Err(VmError::ZeroSize);
    }
    platform::reserve(size)
}

/// Grant read/write access to `size` bytes starting at `addr` and back
/// them with (demand-paged) physical memory.
///
/// Committing an already committed range is a no-op.
///
/// # Safety
///
/// `addr..addr + size` must lie inside a single range obtained from
/// [`reserve`] that has not been released, and `addr` must be page-aligned.
pub unsafe fn commit(addr: NonNull<u8>, size: usize) -> Result<NonNull<u8>, VmError> {
    if size == 0 {
        return Ok(addr);
    }
    // SAFETY: forwarded from the caller.
    unsafe { platform::commit(addr, size) }
}

/// Release an entire reservation, including every committed sub-range.
///
/// # Safety
///
/// `addr` and `size` must be exactly the base address and size of a
/// range returned by [`reserve`], and nothing may access the range
/// afterwards.
pub unsafe fn release(addr: NonNull<u8>, size: usize) -> Result<(), VmError> {
    // SAFETY: forwarded from the caller.
    unsafe { platform::release(addr, size) }
}
