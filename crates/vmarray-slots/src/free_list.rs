//! Intrusive lock-free free list of recycled slot indices.
//!
//! A Treiber stack whose links live inside the free cells themselves: the
//! head is a single `AtomicU32`, and each free cell stores the index of the
//! next free cell in its first four bytes.
//!
//! # ABA hazard
//!
//! There is no tag or hazard pointer on the head. If thread A reads head
//! `h` and its link `n`, then other threads pop `h`, pop `n`, and push `h`
//! back before A's compare-exchange, A succeeds and installs `n` as the
//! head even though `n` is now occupied. The window requires a full
//! pop/pop/push cycle between two loads, and an index is only pushed again
//! after its owner removes it, so the exposure is small; it is an accepted
//! risk of this design, not a proven-safe property.
//!
//! # Stale link reads
//!
//! A popper that loses the race can load the link of a cell that the
//! winner is already filling with a `T` through a plain, non-atomic write.
//! Under the Rust memory model that is a data race, and therefore undefined
//! behavior, not merely a stale read. In practice the loaded value is
//! discarded because the popper's compare-exchange fails and it retries,
//! but nothing in the language guarantees that outcome.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use crate::cell::SlotStorage;

/// Sentinel head value for an empty list.
pub(crate) const EMPTY: u32 = u32::MAX;

/// Lock-free stack of free slot indices.
pub(crate) struct FreeList {
    head: AtomicU32,
}

impl FreeList {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicU32::new(EMPTY),
        }
    }

    /// Whether the list currently looks empty. May be stale immediately.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == EMPTY
    }

    /// Push `index` onto the list.
    ///
    /// The link write is published by the release compare-exchange, so a
    /// popper that acquires the new head also sees the link.
    ///
    /// # Safety
    ///
    /// `index` must be a committed slot below the high-water mark whose
    /// value has already been moved out, whose occupancy bit is clear, and
    /// which is not already on the list.
    pub(crate) unsafe fn push<T>(&self, storage: &SlotStorage<T>, index: u32) {
        debug_assert_ne!(index, EMPTY);
        // SAFETY: the caller owns the now-free cell.
        let link = unsafe { storage.next_link(index) };
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            link.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange_weak(head, index, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }

    /// Pop the most recently freed index, or `None` if the list is empty.
    ///
    /// Retries internally while other threads win the compare-exchange.
    ///
    /// # Safety
    ///
    /// Every index on the list must be a committed slot of `storage`.
    pub(crate) unsafe fn try_pop<T>(&self, storage: &SlotStorage<T>) -> Option<u32> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if head == EMPTY {
                return None;
            }
            // SAFETY: `head` was on the list, so its cell is committed. If
            // another thread popped it meanwhile and is writing a value,
            // this load races with that write (see "Stale link reads").
            // The compare-exchange below then fails and `next` is dropped.
            let next = unsafe { storage.next_link(head) }.load(Ordering::Relaxed);
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => return Some(head),
                Err(actual) => head = actual,
            }
        }
    }
}
