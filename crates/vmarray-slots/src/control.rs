//! Occupancy control register.
//!
//! One bit per slot, packed into `AtomicU64` words that live in their own
//! reserved range. Bit `i % 64` of word `i / 64` is set iff slot `i` holds
//! a fully constructed value.
//!
//! Ordering contract:
//! - [`set`](ControlRegister::set) is a release RMW issued after the value
//!   is written, so a reader that observes the bit with
//!   [`is_set`](ControlRegister::is_set) (acquire) sees the whole value.
//! - [`clear`](ControlRegister::clear) is issued before the value is moved
//!   out. A reader that already observed the bit set can still race with
//!   the removal; preventing that is the remover's job.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use vmarray_sys::{Reservation, VmError};

/// Bits per control word.
pub(crate) const BITS_PER_WORD: u32 = u64::BITS;

/// Growable occupancy bitmap on reserved virtual memory.
pub(crate) struct ControlRegister {
    reservation: Reservation,
    committed_bytes: AtomicUsize,
}

impl ControlRegister {
    /// Reserve enough words for `max_slots` bits. Nothing is committed.
    pub(crate) fn reserve(max_slots: u32) -> Result<Self, VmError> {
        Ok(Self {
            reservation: Reservation::new(Self::bytes_for(max_slots))?,
            committed_bytes: AtomicUsize::new(0),
        })
    }

    /// Words needed to hold `slots` bits.
    pub(crate) fn words_needed(slots: u32) -> usize {
        slots.div_ceil(BITS_PER_WORD) as usize
    }

    /// Bytes needed to hold `slots` bits.
    pub(crate) fn bytes_for(slots: u32) -> usize {
        Self::words_needed(slots) * std::mem::size_of::<AtomicU64>()
    }

    /// Commit enough pages to cover `slots` bits plus one page of headroom,
    /// capped at the reservation.
    ///
    /// Callers serialize through the Growth Manager lock.
    pub(crate) fn commit_for(&self, slots: u32) -> Result<(), VmError> {
        let page_size = self.reservation.page_size();
        let wanted = vmarray_sys::round_up_to_page_size(Self::bytes_for(slots), page_size)
            .saturating_add(page_size)
            .min(self.reservation.len());
        let committed = self.committed_bytes.load(Ordering::Relaxed);
        if wanted <= committed {
            return Ok(());
        }
        self.reservation.commit(committed, wanted - committed)?;
        self.committed_bytes.store(wanted, Ordering::Release);
        Ok(())
    }

    /// Number of bits backed by committed memory.
    pub(crate) fn committed_bits(&self) -> usize {
        self.committed_bytes.load(Ordering::Acquire) / std::mem::size_of::<AtomicU64>()
            * BITS_PER_WORD as usize
    }

    /// Bytes committed so far.
    pub(crate) fn committed_bytes(&self) -> usize {
        self.committed_bytes.load(Ordering::Acquire)
    }

    fn split(index: u32) -> (usize, u64) {
        (
            (index / BITS_PER_WORD) as usize,
            1u64 << (index % BITS_PER_WORD),
        )
    }

    /// # Safety
    ///
    /// The word holding `index` must be committed.
    unsafe fn word(&self, word: usize) -> &AtomicU64 {
        debug_assert!(word * 8 < self.committed_bytes.load(Ordering::Relaxed));
        // SAFETY: committed memory is zero-initialised, readable, writable
        // and page-aligned, so every 8-byte word is a valid `AtomicU64`.
        unsafe { &*self.reservation.as_ptr().cast::<AtomicU64>().add(word) }
    }

    /// Whether slot `index` holds a live value.
    ///
    /// # Safety
    ///
    /// `index` must be below [`committed_bits`](Self::committed_bits).
    pub(crate) unsafe fn is_set(&self, index: u32) -> bool {
        let (word, mask) = Self::split(index);
        // SAFETY: forwarded from the caller.
        unsafe { self.word(word) }.load(Ordering::Acquire) & mask != 0
    }

    /// Mark slot `index` occupied. Returns the previous state of the bit.
    ///
    /// # Safety
    ///
    /// `index` must be below [`committed_bits`](Self::committed_bits).
    pub(crate) unsafe fn set(&self, index: u32) -> bool {
        let (word, mask) = Self::split(index);
        // SAFETY: forwarded from the caller.
        unsafe { self.word(word) }.fetch_or(mask, Ordering::Release) & mask != 0
    }

    /// Mark slot `index` free. Returns the previous state of the bit.
    ///
    /// # Safety
    ///
    /// `index` must be below [`committed_bits`](Self::committed_bits).
    pub(crate) unsafe fn clear(&self, index: u32) -> bool {
        let (word, mask) = Self::split(index);
        // SAFETY: forwarded from the caller.
        unsafe { self.word(word) }.fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_needed_rounds_up() {
        assert_eq!(ControlRegister::words_needed(0), 0);
        assert_eq!(ControlRegister::words_needed(1), 1);
        assert_eq!(ControlRegister::words_needed(64), 1);
        assert_eq!(ControlRegister::words_needed(65), 2);
        assert_eq!(ControlRegister::bytes_for(129), 24);
    }

    #[test]
    fn commit_keeps_a_page_of_headroom() {
        let page = vmarray_sys::page_size();
        let bits_per_page = page * 8;
        let max = (bits_per_page * 4) as u32;
        let reg = ControlRegister::reserve(max).unwrap();
        reg.commit_for(1).unwrap();
        assert_eq!(reg.committed_bytes(), 2 * page);
        reg.commit_for((bits_per_page * 2) as u32).unwrap();
        assert_eq!(reg.committed_bytes(), 3 * page);
    }

    #[test]
    fn commit_is_capped_at_reservation() {
        let reg = ControlRegister::reserve(10).unwrap();
        reg.commit_for(10).unwrap();
        assert_eq!(reg.committed_bytes(), vmarray_sys::page_size());
        assert!(reg.committed_bits() >= 10);
    }

    #[test]
    fn set_and_clear_track_bits_independently() {
        let reg = ControlRegister::reserve(256).unwrap();
        reg.commit_for(256).unwrap();
        unsafe {
            assert!(!reg.set(3));
            assert!(!reg.set(64));
            assert!(!reg.set(255));
            assert!(reg.set(3));
            assert!(reg.is_set(3));
            assert!(reg.is_set(64));
            assert!(!reg.is_set(4));
            assert!(!reg.is_set(63));
            assert!(reg.clear(64));
            assert!(!reg.clear(64));
            assert!(!reg.is_set(64));
            assert!(reg.is_set(255));
        }
    }
}
