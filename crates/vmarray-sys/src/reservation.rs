//! RAII ownership of a reserved address range.

use std::fmt;
use std::ptr::NonNull;

use crate::error::VmError;
use crate::page::{page_size, round_up_to_page_size};

/// An owned range of reserved virtual address space.
///
/// The range starts with no access rights. Sub-ranges become readable and
/// writable through [`commit`](Reservation::commit); the whole range is
/// released when the `Reservation` is dropped. The base address never
/// changes, so pointers into committed memory stay valid for the
/// reservation's lifetime, including across moves of the `Reservation`
/// value itself.
pub struct Reservation {
    ptr: NonNull<u8>,
    len: usize,
    page_size: usize,
}

// SAFETY: the reservation is a plain address range; access rights are
// managed by the OS and `commit` only ever adds access, so sharing the
// handle across threads cannot invalidate memory another thread uses.
unsafe impl Send for Reservation {}
// SAFETY: see above; no method mutates state stored in `Self`.
unsafe impl Sync for Reservation {}

impl Reservation {
    /// Reserve at least `len` bytes, rounded up to the OS page size.
    pub fn new(len: usize) -> Result<Self, VmError> {
        if len == 0 {
            return Err(VmError::ZeroSize);
        }
        let page_size = page_size();
        let len = len
            .checked_add(page_size - 1)
            .map(|_| round_up_to_page_size(len, page_size))
            .ok_or(VmError::OutOfRange {
                offset: 0,
                size: len,
                reserved: usize::MAX,
            })?;
        let ptr = crate::reserve(len)?;
        tracing::debug!(bytes = len, addr = ?ptr, "reserved address range");
        Ok(Self {
            ptr,
            len,
            page_size,
        })
    }

    /// Commit `len` bytes starting at `offset`, rounding `len` up to whole
    /// pages.
    ///
    /// `offset` must be page-aligned and the rounded range must lie inside
    /// the reservation. Committing an already committed range is a no-op.
    pub fn commit(&self, offset: usize, len: usize) -> Result<(), VmError> {
        if offset & (self.page_size - 1) != 0 {
            return Err(VmError::Misaligned {
                offset,
                page_size: self.page_size,
            });
        }
        let size = round_up_to_page_size(len, self.page_size);
        if offset > self.len || size > self.len - offset {
            return Err(VmError::OutOfRange {
                offset,
                size,
                reserved: self.len,
            });
        }
        if size == 0 {
            return Ok(());
        }
        // SAFETY: `offset <= self.len`, so the pointer stays inside (or one
        // past the end of) the reservation.
        let addr = unsafe { self.ptr.add(offset) };
        // SAFETY: the range was checked to lie inside this live reservation
        // and `addr` is page-aligned because the base and `offset` are.
        unsafe { crate::commit(addr, size) }.map_err(|err| match err {
            VmError::Commit { source, .. } => VmError::Commit {
                offset,
                size,
                source,
            },
            other => other,
        })?;
        Ok(())
    }

    /// Base address of the range.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the range in bytes (a page-size multiple).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-byte reservations are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The OS page size this reservation was created with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` are exactly what `reserve` returned, and the
        // reservation is being dropped so nothing can reach it afterwards.
        if let Err(err) = unsafe { crate::release(self.ptr, self.len) } {
            tracing::error!(bytes = self.len, addr = ?self.ptr, %err, "failed to release reservation");
            panic!("failed to release {}-byte reservation at {:?}: {err}", self.len, self.ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_rounds_up_to_page_size() {
        let r = Reservation::new(1).unwrap();
        assert_eq!(r.len(), page_size());
        assert!(!r.is_empty());
    }

    #[test]
    fn zero_size_reservation_is_rejected() {
        assert!(matches!(Reservation::new(0), Err(VmError::ZeroSize)));
    }

    #[test]
    fn committed_memory_is_zeroed_and_writable() {
        let page = page_size();
        let r = Reservation::new(4 * page).unwrap();
        r.commit(0, page).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts_mut(r.as_ptr(), page) };
        assert!(bytes.iter().all(|&b| b == 0));
        bytes[0] = 0xAB;
        bytes[page - 1] = 0xCD;
        assert_eq!(bytes[0], 0xAB);
        assert_eq!(bytes[page - 1], 0xCD);
    }

    #[test]
    fn commit_is_idempotent() {
        let page = page_size();
        let r = Reservation::new(2 * page).unwrap();
        r.commit(0, page).unwrap();
        unsafe { r.as_ptr().write(7) };
        r.commit(0, page).unwrap();
        assert_eq!(unsafe { r.as_ptr().read() }, 7);
    }

    #[test]
    fn commit_later_page_leaves_earlier_data_in_place() {
        let page = page_size();
        let r = Reservation::new(3 * page).unwrap();
        r.commit(0, page).unwrap();
        unsafe { r.as_ptr().write(42) };
        r.commit(page, 2 * page).unwrap();
        unsafe { r.as_ptr().add(2 * page).write(9) };
        assert_eq!(unsafe { r.as_ptr().read() }, 42);
    }

    #[test]
    fn commit_rejects_misaligned_offset() {
        let page = page_size();
        let r = Reservation::new(2 * page).unwrap();
        assert!(matches!(
            r.commit(1, page),
            Err(VmError::Misaligned { offset: 1, .. })
        ));
    }

    #[test]
    fn commit_rejects_range_past_end() {
        let page = page_size();
        let r = Reservation::new(2 * page).unwrap();
        assert!(matches!(
            r.commit(page, 2 * page),
            Err(VmError::OutOfRange { .. })
        ));
        assert!(matches!(
            r.commit(3 * page, 0),
            Err(VmError::OutOfRange { .. })
        ));
    }

    #[test]
    fn reservation_survives_move() {
        let page = page_size();
        let r = Reservation::new(page).unwrap();
        r.commit(0, page).unwrap();
        let base = r.as_ptr();
        unsafe { base.write(3) };
        let moved = Box::new(r);
        assert_eq!(moved.as_ptr(), base);
        assert_eq!(unsafe { moved.as_ptr().read() }, 3);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn large_reservation_does_not_need_physical_memory() {
        // 8 GiB of address space; only a single page is ever committed.
        let r = Reservation::new(8 << 30).unwrap();
        r.commit(0, 1).unwrap();
        assert_eq!(r.len(), 8 << 30);
    }
}
