//! Raw slot cells and the committed slot buffer.
//!
//! [`SlotCell`] is the only type in the crate that reinterprets slot bytes:
//! an occupied cell holds a `T`, a free cell holds the `u32` index of the
//! next free cell. Which one is live is recorded in the occupancy control
//! register, never in the cell itself.

#![allow(unsafe_code)]

use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use vmarray_sys::{Reservation, VmError};

/// One storage cell: either a live `T` or a free-list link.
///
/// `repr(C)` puts both fields at offset 0, and the union is at least as
/// large and as aligned as a `u32`.
#[repr(C)]
pub(crate) union SlotCell<T> {
    value: ManuallyDrop<T>,
    next: ManuallyDrop<AtomicU32>,
}

impl<T> SlotCell<T> {
    /// Bytes occupied by one cell in the slot buffer.
    pub(crate) const SIZE: usize = mem::size_of::<Self>();
}

/// The reserved slot buffer plus its committed extent.
pub(crate) struct SlotStorage<T> {
    reservation: Reservation,
    /// Bytes committed from the start of the reservation.
    committed_bytes: AtomicUsize,
    /// Number of whole cells inside `committed_bytes`, capped at `max_slots`.
    /// Published after the control register covers them.
    committed_slots: AtomicU32,
    max_slots: u32,
    _marker: PhantomData<T>,
}

impl<T> SlotStorage<T> {
    /// Reserve address space for `max_slots` cells. Nothing is committed.
    pub(crate) fn reserve(max_slots: u32, bytes: usize) -> Result<Self, VmError> {
        Ok(Self {
            reservation: Reservation::new(bytes)?,
            committed_bytes: AtomicUsize::new(0),
            committed_slots: AtomicU32::new(0),
            max_slots,
            _marker: PhantomData,
        })
    }

    /// Pointer to cell `index`.
    ///
    /// Dereferencing is only valid below [`committed_slots`](Self::committed_slots).
    pub(crate) fn cell(&self, index: u32) -> *mut SlotCell<T> {
        debug_assert!(index < self.max_slots, "slot {index} beyond reservation");
        self.reservation
            .as_ptr()
            .cast::<SlotCell<T>>()
            .wrapping_add(index as usize)
    }

    /// Pointer to the value stored in cell `index`.
    pub(crate) fn value_ptr(&self, index: u32) -> *mut T {
        self.cell(index).cast::<T>()
    }

    /// The free-list link stored in cell `index`.
    ///
    /// # Safety
    ///
    /// `index` must be below `committed_slots()` and the cell must not hold
    /// a live value that anyone else is reading or writing.
    pub(crate) unsafe fn next_link(&self, index: u32) -> &AtomicU32 {
        // SAFETY: the cell is committed (so readable and writable), aligned
        // for `u32`, and starts with the `next` field because of `repr(C)`.
        unsafe { &*self.cell(index).cast::<AtomicU32>() }
    }

    /// Cells that are committed and safe to dereference.
    pub(crate) fn committed_slots(&self) -> u32 {
        self.committed_slots.load(Ordering::Acquire)
    }

    /// Bytes committed so far.
    pub(crate) fn committed_bytes(&self) -> usize {
        self.committed_bytes.load(Ordering::Acquire)
    }

    /// Total reserved bytes.
    pub(crate) fn reserved_bytes(&self) -> usize {
        self.reservation.len()
    }

    /// Number of slots that `bytes` of committed memory holds.
    pub(crate) fn slots_in(&self, bytes: usize) -> u32 {
        let slots = bytes / SlotCell::<T>::SIZE;
        slots.min(self.max_slots as usize) as u32
    }

    /// Commit the buffer up to `target` bytes without publishing the new
    /// slot count. Callers serialize through the Growth Manager lock.
    pub(crate) fn commit_to(&self, target: usize) -> Result<(), VmError> {
        let committed = self.committed_bytes.load(Ordering::Relaxed);
        if target <= committed {
            return Ok(());
        }
        self.reservation.commit(committed, target - committed)?;
        self.committed_bytes.store(target, Ordering::Release);
        Ok(())
    }

    /// Publish every slot inside the committed bytes to readers.
    pub(crate) fn publish_committed(&self) {
        let slots = self.slots_in(self.committed_bytes.load(Ordering::Relaxed));
        self.committed_slots.store(slots, Ordering::Release);
    }
}
