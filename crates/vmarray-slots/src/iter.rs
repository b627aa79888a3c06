//! Iterators over occupied slots.
//!
//! The shared iterators are lazy and re-read the scan bound on every step,
//! so values inserted below the bound while iterating may or may not be
//! visited. Each step checks the occupancy bit with acquire ordering, so a
//! visited value is always fully constructed. A traversal is not resumable
//! with defined results under concurrent removal; start a new one instead.

#![allow(unsafe_code)]

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::array::SlotArray;

/// Iterator over `(index, &value)` for every occupied slot, ascending.
pub struct IterIndexed<'a, T, const MAX: u32> {
    array: &'a SlotArray<T, MAX>,
    next: u32,
}

impl<'a, T, const MAX: u32> IterIndexed<'a, T, MAX> {
    pub(crate) fn new(array: &'a SlotArray<T, MAX>) -> Self {
        Self { array, next: 0 }
    }
}

impl<'a, T, const MAX: u32> Iterator for IterIndexed<'a, T, MAX> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.next >= self.array.scan_end() {
                // Pin at the end so the iterator stays fused.
                self.next = MAX;
                return None;
            }
            let index = self.next;
            self.next += 1;
            // SAFETY: `index` is below the committed slot count, which the
            // control register covers; a set bit means the value is fully
            // constructed and visible to us.
            unsafe {
                if self.array.control().is_set(index) {
                    return Some((index, &*self.array.value_ptr(index)));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.scan_end().saturating_sub(self.next);
        (0, Some(remaining as usize))
    }
}

impl<T, const MAX: u32> FusedIterator for IterIndexed<'_, T, MAX> {}

/// Iterator over `&value` for every occupied slot, ascending.
pub struct Iter<'a, T, const MAX: u32> {
    inner: IterIndexed<'a, T, MAX>,
}

impl<'a, T, const MAX: u32> Iter<'a, T, MAX> {
    pub(crate) fn new(array: &'a SlotArray<T, MAX>) -> Self {
        Self {
            inner: IterIndexed::new(array),
        }
    }
}

impl<'a, T, const MAX: u32> Iterator for Iter<'a, T, MAX> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const MAX: u32> FusedIterator for Iter<'_, T, MAX> {}

/// Iterator over `(index, &mut value)` for every occupied slot, ascending.
///
/// Holds the array exclusively, so the scan bound is fixed at creation.
pub struct IterMut<'a, T, const MAX: u32> {
    array: *const SlotArray<T, MAX>,
    next: u32,
    end: u32,
    _borrow: PhantomData<&'a mut SlotArray<T, MAX>>,
}

impl<'a, T, const MAX: u32> IterMut<'a, T, MAX> {
    pub(crate) fn new(array: &'a mut SlotArray<T, MAX>, end: u32) -> Self {
        Self {
            array,
            next: 0,
            end,
            _borrow: PhantomData,
        }
    }
}

impl<'a, T, const MAX: u32> Iterator for IterMut<'a, T, MAX> {
    type Item = (u32, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: the pointer comes from a `&'a mut SlotArray` that this
        // iterator holds for `'a`.
        let array = unsafe { &*self.array };
        while self.next < self.end {
            let index = self.next;
            self.next += 1;
            // SAFETY: below the committed count; each index is yielded at
            // most once, so the returned `&mut` borrows never overlap.
            unsafe {
                if array.control().is_set(index) {
                    return Some((index, &mut *array.value_ptr(index)));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.end - self.next) as usize))
    }
}

impl<T, const MAX: u32> FusedIterator for IterMut<'_, T, MAX> {}

// SAFETY: `IterMut` behaves like `&mut SlotArray`, which is `Send` when
// `T: Send` and the array is shared nowhere else.
unsafe impl<T: Send, const MAX: u32> Send for IterMut<'_, T, MAX> {}
// SAFETY: a shared `&IterMut` exposes nothing.
unsafe impl<T: Sync, const MAX: u32> Sync for IterMut<'_, T, MAX> {}

#[cfg(test)]
mod tests {
    use crate::SlotArray;

    #[test]
    fn iter_skips_holes_in_order() {
        let array = SlotArray::<u64, 128>::new();
        for v in 0..10 {
            array.emplace(v);
        }
        for i in [0, 3, 4, 9] {
            unsafe { array.remove(i) };
        }
        let visited: Vec<u64> = array.iter().copied().collect();
        assert_eq!(visited, vec![1, 2, 5, 6, 7, 8]);
    }

    #[test]
    fn iterator_is_restartable() {
        let array = SlotArray::<u64, 128>::new();
        array.emplace(1);
        array.emplace(2);
        let first: Vec<_> = array.iter().collect();
        let second: Vec<_> = array.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn iterator_is_fused() {
        let array = SlotArray::<u64, 128>::new();
        array.emplace(1);
        let mut it = array.iter();
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next(), None);
        array.emplace(2);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn lazy_iteration_sees_values_appended_ahead() {
        let array = SlotArray::<u64, 128>::new();
        array.emplace(1);
        let mut it = array.iter_indexed();
        assert_eq!(it.next(), Some((0, &1)));
        array.emplace(2);
        assert_eq!(it.next(), Some((1, &2)));
    }

    #[test]
    fn size_hint_is_bounded_by_high_water_mark() {
        let array = SlotArray::<u64, 128>::new();
        for v in 0..5 {
            array.emplace(v);
        }
        assert_eq!(array.iter().size_hint(), (0, Some(5)));
    }
}
