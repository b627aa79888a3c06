//! Windows backend: `VirtualAlloc` / `VirtualFree`.

use std::ffi::c_void;
use std::io;
use std::ptr::{self, NonNull};

use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
    PAGE_READWRITE,
};

use crate::error::VmError;

pub(crate) fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    // SAFETY: a null base address lets the OS pick a fresh range.
    let ptr = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| VmError::Reserve {
        size,
        source: io::Error::last_os_error(),
    })
}

pub(crate) unsafe fn commit(addr: NonNull<u8>, size: usize) -> Result<NonNull<u8>, VmError> {
    // SAFETY: the caller guarantees the range lies inside a live reservation.
    let ptr = unsafe {
        VirtualAlloc(
            addr.as_ptr().cast_const().cast::<c_void>(),
            size,
            MEM_COMMIT,
            PAGE_READWRITE,
        )
    };
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| VmError::Commit {
        offset: 0,
        size,
        source: io::Error::last_os_error(),
    })
}

pub(crate) unsafe fn release(addr: NonNull<u8>, size: usize) -> Result<(), VmError> {
    // SAFETY: the caller guarantees `addr` is the base of a whole reservation.
    let r = unsafe { VirtualFree(addr.as_ptr().cast::<c_void>(), 0, MEM_RELEASE) };
    if r == 0 {
        return Err(VmError::Release {
            size,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
