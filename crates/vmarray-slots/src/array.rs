//! The slot array engine.
//!
//! [`SlotArray`] ties the pieces together:
//!
//! ```text
//! SlotArray<T, MAX>
//! ├── SlotStorage<T>     reserved for MAX cells, committed lazily
//! ├── ControlRegister    one occupancy bit per cell, own reservation
//! ├── FreeList           lock-free stack threaded through free cells
//! ├── GrowthManager      the only lock; commits pages on demand
//! ├── high_water         first never-allocated index
//! └── len                live element count
//! ```
//!
//! Slot lifecycle: unreserved → free (committed by growth) → occupied
//! (`emplace`) → free (`remove`) → occupied → … → dropped with the array.

#![allow(unsafe_code)]

use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::cell::{SlotCell, SlotStorage};
use crate::config::SlotArrayConfig;
use crate::control::ControlRegister;
use crate::error::SlotArrayError;
use crate::free_list::FreeList;
use crate::growth::GrowthManager;
use crate::iter::{Iter, IterIndexed, IterMut};

/// A concurrent container that hands out stable `u32` indices.
///
/// Values are constructed directly into a virtual memory range reserved
/// for `MAX` elements up front. Physical pages are committed as the
/// high-water mark advances, so a live value never moves: its index and
/// address stay valid until it is removed.
///
/// `emplace` and `remove` take `&self` and may run concurrently from any
/// number of threads. The common path uses only atomic operations; a
/// mutex is taken only when the high-water mark crosses into uncommitted
/// memory. Freed indices are reused (most recently freed first) before the
/// high-water mark grows.
///
/// `T` must be at least four bytes, since free cells store the next free
/// index in place of the value. This is checked at compile time:
///
/// ```compile_fail
/// let array = vmarray_slots::SlotArray::<u16, 16>::new();
/// ```
///
/// # Example
///
/// ```
/// use vmarray_slots::SlotArray;
///
/// let array = SlotArray::<u32, 1024>::new();
/// assert_eq!(array.emplace(7), 0);
/// assert_eq!(array.emplace(9), 1);
/// // SAFETY: slot 0 is occupied and nobody else is using it.
/// assert_eq!(unsafe { array.remove(0) }, 7);
/// assert_eq!(array.emplace(11), 0);
/// assert_eq!(array.len(), 2);
/// assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![11, 9]);
/// ```
pub struct SlotArray<T, const MAX: u32> {
    storage: SlotStorage<T>,
    control: ControlRegister,
    free_list: FreeList,
    high_water: AtomicU32,
    len: AtomicU32,
    growth: GrowthManager,
    page_size: usize,
}

// SAFETY: the array owns its values; sending it sends every `T`.
unsafe impl<T: Send, const MAX: u32> Send for SlotArray<T, MAX> {}
// SAFETY: `&SlotArray` hands out `&T` (needs `Sync`) and lets any thread
// insert or remove values (needs `Send`). All bookkeeping is atomic or
// behind the growth mutex.
unsafe impl<T: Send + Sync, const MAX: u32> Sync for SlotArray<T, MAX> {}

impl<T, const MAX: u32> SlotArray<T, MAX> {
    const LAYOUT_OK: () = {
        assert!(
            mem::size_of::<T>() >= mem::size_of::<u32>(),
            "slot type must be at least 4 bytes so a free-list link fits in place"
        );
        assert!(MAX > 0, "maximum element count must be non-zero");
        assert!(
            MAX < crate::free_list::EMPTY,
            "maximum element count must leave u32::MAX free as a sentinel"
        );
    };

    /// Reserve an array for `MAX` elements with the default config.
    ///
    /// # Panics
    ///
    /// Panics if the address space cannot be reserved or the first page
    /// cannot be committed.
    pub fn new() -> Self {
        Self::with_config(SlotArrayConfig::default())
    }

    /// Reserve an array for `MAX` elements.
    ///
    /// # Panics
    ///
    /// Panics on an invalid config or a virtual memory failure. Use
    /// [`try_with_config`](Self::try_with_config) to handle those.
    pub fn with_config(config: SlotArrayConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(array) => array,
            Err(err) => panic!(
                "failed to create slot array for {MAX} slots of {} bytes: {err}",
                SlotCell::<T>::SIZE
            ),
        }
    }

    /// Reserve an array for `MAX` elements, reporting failures.
    pub fn try_with_config(config: SlotArrayConfig) -> Result<Self, SlotArrayError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_OK;
        config.validate()?;

        let slot_bytes = (MAX as usize).checked_mul(SlotCell::<T>::SIZE).ok_or(
            SlotArrayError::CapacityOverflow {
                max_elements: MAX,
                slot_size: SlotCell::<T>::SIZE,
            },
        )?;
        let page_size = vmarray_sys::page_size();
        let storage = SlotStorage::reserve(MAX, slot_bytes)?;
        let control = ControlRegister::reserve(MAX)?;
        let growth = GrowthManager::new(config.growth, page_size);
        growth.commit_initial(config.initial_pages, &storage, &control)?;

        tracing::debug!(
            max_elements = MAX,
            slot_size = SlotCell::<T>::SIZE,
            reserved_bytes = storage.reserved_bytes(),
            committed_slots = storage.committed_slots(),
            "created slot array"
        );

        Ok(Self {
            storage,
            control,
            free_list: FreeList::new(),
            high_water: AtomicU32::new(0),
            len: AtomicU32::new(0),
            growth,
            page_size,
        })
    }

    /// Insert `value` and return its index.
    ///
    /// Reuses the most recently freed index if there is one, otherwise
    /// takes the next index past the high-water mark.
    ///
    /// # Panics
    ///
    /// Panics if all `MAX` indices are in use, or if committing more
    /// memory fails. Neither is recoverable.
    pub fn emplace(&self, value: T) -> u32 {
        self.emplace_with(|_| value)
    }

    /// Construct a value in place from its own index and insert it.
    ///
    /// If `init` panics the index goes back on the free list and the
    /// array is left unchanged.
    ///
    /// # Panics
    ///
    /// Same conditions as [`emplace`](Self::emplace).
    pub fn emplace_with<F>(&self, init: F) -> u32
    where
        F: FnOnce(u32) -> T,
    {
        let index = self.acquire_index();
        let guard = ReturnOnUnwind { array: self, index };
        let value = init(index);
        mem::forget(guard);

        // SAFETY: `acquire_index` returned a committed, unoccupied cell that
        // no other thread can obtain until it is freed again.
        unsafe {
            self.storage.value_ptr(index).write(value);
            let was_set = self.control.set(index);
            debug_assert!(!was_set, "slot {index} was already occupied");
        }
        self.len.fetch_add(1, Ordering::Release);
        index
    }

    /// Remove the value at `index` and return it.
    ///
    /// The occupancy bit is cleared before the value is moved out, and the
    /// index is pushed onto the free list afterwards.
    ///
    /// # Safety
    ///
    /// - `index` must currently hold a value.
    /// - No other thread may remove the same index concurrently.
    /// - No reference to the value (from [`get`](Self::get),
    ///   [`Index`], or an iterator) may be alive, on any thread. The array
    ///   does not protect against use-after-remove; callers that read
    ///   while others remove must coordinate ownership themselves.
    pub unsafe fn remove(&self, index: u32) -> T {
        debug_assert!(
            self.is_occupied(index),
            "remove of unoccupied slot {index}"
        );
        // SAFETY: the caller guarantees `index` is occupied, hence
        // committed and below the high-water mark.
        unsafe {
            self.control.clear(index);
            let value = ptr::read(self.storage.value_ptr(index));
            self.free_list.push(&self.storage, index);
            self.len.fetch_sub(1, Ordering::Release);
            value
        }
    }

    /// Remove the value at `index` if it is occupied.
    ///
    /// Exclusive access makes the checks in this method sufficient.
    pub fn take(&mut self, index: u32) -> Option<T> {
        if !self.is_occupied(index) {
            return None;
        }
        // SAFETY: occupied was just checked, and `&mut self` rules out
        // outstanding references and concurrent removers.
        Some(unsafe { self.remove(index) })
    }

    /// Whether `index` currently holds a fully constructed value.
    pub fn is_occupied(&self, index: u32) -> bool {
        if index >= self.scan_end() {
            return false;
        }
        // SAFETY: below the committed slot count, which the control
        // register always covers.
        unsafe { self.control.is_set(index) }
    }

    /// Shared reference to the value at `index`, if occupied.
    pub fn get(&self, index: u32) -> Option<&T> {
        if self.is_occupied(index) {
            // SAFETY: occupied, and the acquire load in `is_occupied`
            // synchronizes with the release in `emplace`.
            Some(unsafe { self.get_unchecked(index) })
        } else {
            None
        }
    }

    /// Mutable reference to the value at `index`, if occupied.
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        if self.is_occupied(index) {
            // SAFETY: occupied, and `&mut self` makes the borrow unique.
            Some(unsafe { self.get_unchecked_mut(index) })
        } else {
            None
        }
    }

    /// Shared reference to the value at `index` without checking occupancy.
    ///
    /// # Safety
    ///
    /// `index` must hold a value whose insertion happens-before this call,
    /// and it must not be removed while the reference is alive.
    pub unsafe fn get_unchecked(&self, index: u32) -> &T {
        // SAFETY: forwarded from the caller.
        unsafe { &*self.storage.value_ptr(index) }
    }

    /// Mutable reference to the value at `index` through a shared borrow.
    ///
    /// This is the path for a thread that logically owns a slot it
    /// inserted while other threads use the rest of the array.
    ///
    /// # Safety
    ///
    /// Same as [`get_unchecked`](Self::get_unchecked), and no other
    /// reference to this value may exist while the returned one is alive.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_unchecked_mut(&self, index: u32) -> &mut T {
        // SAFETY: forwarded from the caller.
        unsafe { &mut *self.storage.value_ptr(index) }
    }

    /// Number of occupied slots.
    ///
    /// Under concurrent use this is a snapshot that may already be stale.
    pub fn len(&self) -> u32 {
        self.len.load(Ordering::Acquire)
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements (`MAX`).
    pub const fn capacity(&self) -> u32 {
        MAX
    }

    /// The first index that has never been handed out.
    pub fn high_water_mark(&self) -> u32 {
        self.high_water.load(Ordering::Acquire)
    }

    /// Number of slots backed by committed memory.
    pub fn committed_slots(&self) -> u32 {
        self.storage.committed_slots()
    }

    /// Bytes committed across the slot buffer and the control register.
    pub fn committed_bytes(&self) -> usize {
        self.storage.committed_bytes() + self.control.committed_bytes()
    }

    /// Slots per OS page. Zero when one slot spans more than a page.
    pub fn elements_per_page(&self) -> u32 {
        (self.page_size / SlotCell::<T>::SIZE) as u32
    }

    /// Iterate over occupied values in ascending index order.
    pub fn iter(&self) -> Iter<'_, T, MAX> {
        Iter::new(self)
    }

    /// Iterate over `(index, &value)` pairs in ascending index order.
    pub fn iter_indexed(&self) -> IterIndexed<'_, T, MAX> {
        IterIndexed::new(self)
    }

    /// Iterate mutably over `(index, &mut value)` pairs.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, MAX> {
        let end = self.scan_end();
        IterMut::new(self, end)
    }

    /// Exclusive upper bound for index scans: the high-water mark, but never
    /// past what is committed.
    pub(crate) fn scan_end(&self) -> u32 {
        self.high_water_mark().min(self.storage.committed_slots())
    }

    pub(crate) fn control(&self) -> &ControlRegister {
        &self.control
    }

    pub(crate) fn value_ptr(&self, index: u32) -> *mut T {
        self.storage.value_ptr(index)
    }

    /// Pop a free index or mint a new one, committing memory if needed.
    fn acquire_index(&self) -> u32 {
        // SAFETY: only committed indices below the high-water mark are
        // ever pushed.
        if let Some(index) = unsafe { self.free_list.try_pop(&self.storage) } {
            return index;
        }

        let index = match self.high_water.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |hw| (hw < MAX).then_some(hw + 1),
        ) {
            Ok(index) => index,
            Err(_) => panic!(
                "slot array capacity exhausted: all {MAX} slots of {} bytes are in use",
                SlotCell::<T>::SIZE
            ),
        };

        if let Err(err) = self
            .growth
            .ensure_capacity_for(index, &self.storage, &self.control)
        {
            tracing::error!(
                index,
                committed_bytes = self.storage.committed_bytes(),
                reserved_bytes = self.storage.reserved_bytes(),
                %err,
                "slot array growth failed"
            );
            panic!(
                "slot array growth failed for index {index} \
                 (committed {} of {} reserved bytes): {err}",
                self.storage.committed_bytes(),
                self.storage.reserved_bytes()
            );
        }
        index
    }
}

/// Puts an acquired index back on the free list if construction unwinds.
struct ReturnOnUnwind<'a, T, const MAX: u32> {
    array: &'a SlotArray<T, MAX>,
    index: u32,
}

impl<T, const MAX: u32> Drop for ReturnOnUnwind<'_, T, MAX> {
    fn drop(&mut self) {
        // SAFETY: the index was acquired but never filled, so its cell is
        // committed, unoccupied and owned by this guard.
        unsafe { self.array.free_list.push(&self.array.storage, self.index) };
    }
}

impl<T, const MAX: u32> Drop for SlotArray<T, MAX> {
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            for index in 0..self.scan_end() {
                // SAFETY: below the committed count; `&mut self` means no
                // one else can observe the slot.
                unsafe {
                    if self.control.is_set(index) {
                        ptr::drop_in_place(self.storage.value_ptr(index));
                    }
                }
            }
        }
        // The reservations release their ranges when the fields drop.
    }
}

impl<T, const MAX: u32> Default for SlotArray<T, MAX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const MAX: u32> Index<u32> for SlotArray<T, MAX> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` is not occupied.
    fn index(&self, index: u32) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "slot {index} is not occupied (high-water mark {})",
                self.high_water_mark()
            ),
        }
    }
}

impl<T, const MAX: u32> IndexMut<u32> for SlotArray<T, MAX> {
    fn index_mut(&mut self, index: u32) -> &mut T {
        let high_water = self.high_water_mark();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("slot {index} is not occupied (high-water mark {high_water})"),
        }
    }
}

impl<T, const MAX: u32> fmt::Debug for SlotArray<T, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArray")
            .field("len", &self.len())
            .field("high_water_mark", &self.high_water_mark())
            .field("committed_slots", &self.committed_slots())
            .field("capacity", &MAX)
            .finish()
    }
}

impl<'a, T, const MAX: u32> IntoIterator for &'a SlotArray<T, MAX> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, MAX>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const MAX: u32> IntoIterator for &'a mut SlotArray<T, MAX> {
    type Item = (u32, &'a mut T);
    type IntoIter = IterMut<'a, T, MAX>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Compile-time assertion: SlotArray must be Send + Sync for shareable payloads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SlotArray<(u64, u64), 1024>>();
};
