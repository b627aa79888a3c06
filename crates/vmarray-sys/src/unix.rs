//! POSIX backend: `mmap` / `mprotect` / `munmap`.

use std::io;
use std::ptr::{self, NonNull};

use crate::error::VmError;

// Linux overcommits PROT_NONE mappings anyway; MAP_NORESERVE makes the
// intent explicit so strict-overcommit setups do not charge the range.
#[cfg(any(target_os = "linux", target_os = "android"))]
const RESERVE_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANON | libc::MAP_NORESERVE;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const RESERVE_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANON;

pub(crate) fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    // SAFETY: an anonymous private mapping with a null hint does not alias
    // any existing memory.
    let ptr = unsafe { libc::mmap(ptr::null_mut(), size, libc::PROT_NONE, RESERVE_FLAGS, -1, 0) };
    if ptr == libc::MAP_FAILED {
        return Err(VmError::Reserve {
            size,
            source: io::Error::last_os_error(),
        });
    }
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| VmError::Reserve {
        size,
        source: io::Error::other("mmap returned a null mapping"),
    })
}

pub(crate) unsafe fn commit(addr: NonNull<u8>, size: usize) -> Result<NonNull<u8>, VmError> {
    // SAFETY: the caller guarantees the range lies inside a live reservation.
    unsafe { region::protect(addr.as_ptr().cast_const(), size, region::Protection::READ_WRITE) }
        .map_err(|e| VmError::Commit {
            offset: 0,
            size,
            source: io::Error::other(e),
        })?;
    Ok(addr)
}

pub(crate) unsafe fn release(addr: NonNull<u8>, size: usize) -> Result<(), VmError> {
    // SAFETY: the caller guarantees `addr`/`size` describe a whole reservation.
    let r = unsafe { libc::munmap(addr.as_ptr().cast::<libc::c_void>(), size) };
    if r != 0 {
        return Err(VmError::Release {
            size,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
