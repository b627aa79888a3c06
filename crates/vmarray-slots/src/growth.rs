//! Growth Manager: commits slot and control-register pages on demand.
//!
//! The fast path is a single acquire load of the published slot capacity.
//! Only when an index lands past it does a thread take the growth mutex,
//! re-check, and commit more pages. Control-register pages are committed
//! before the new slot capacity is published, so any index a reader can
//! see as committed also has a committed occupancy bit.

use std::sync::{Mutex, PoisonError};

use vmarray_sys::{round_up_to_page_size, VmError};

use crate::cell::{SlotCell, SlotStorage};
use crate::config::GrowthPolicy;
use crate::control::ControlRegister;

/// Serializes commits to the slot buffer and control register.
pub(crate) struct GrowthManager {
    lock: Mutex<()>,
    policy: GrowthPolicy,
    page_size: usize,
}

impl GrowthManager {
    pub(crate) fn new(policy: GrowthPolicy, page_size: usize) -> Self {
        Self {
            lock: Mutex::new(()),
            policy,
            page_size,
        }
    }

    /// Commit the first `pages` pages of slot storage.
    pub(crate) fn commit_initial<T>(
        &self,
        pages: u32,
        storage: &SlotStorage<T>,
        control: &ControlRegister,
    ) -> Result<(), VmError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let target = (pages as usize)
            .saturating_mul(self.page_size)
            .min(storage.reserved_bytes());
        self.commit_locked(target, storage, control)?;
        tracing::trace!(
            pages,
            slots = storage.committed_slots(),
            "committed initial slot pages"
        );
        Ok(())
    }

    /// Make sure slot `index` is committed, growing if necessary.
    pub(crate) fn ensure_capacity_for<T>(
        &self,
        index: u32,
        storage: &SlotStorage<T>,
        control: &ControlRegister,
    ) -> Result<(), VmError> {
        if index < storage.committed_slots() {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have grown past `index` while we waited.
        if index < storage.committed_slots() {
            return Ok(());
        }

        let committed = storage.committed_bytes();
        let needed = (index as usize + 1) * SlotCell::<T>::SIZE;
        let target = self.target_bytes(committed, needed, storage.reserved_bytes());
        self.commit_locked(target, storage, control)?;
        tracing::debug!(
            index,
            from_bytes = committed,
            to_bytes = target,
            slots = storage.committed_slots(),
            "committed slot pages"
        );
        Ok(())
    }

    /// Bytes the slot buffer should have committed to cover `needed`.
    fn target_bytes(&self, committed: usize, needed: usize, reserved: usize) -> usize {
        let minimal = round_up_to_page_size(needed, self.page_size);
        let target = match self.policy {
            GrowthPolicy::Linear { pages } => {
                let step = pages as usize * self.page_size;
                let missing = minimal.saturating_sub(committed);
                committed + missing.div_ceil(step) * step
            }
            GrowthPolicy::Doubling => minimal.max(committed.saturating_mul(2)),
        };
        target.min(reserved)
    }

    fn commit_locked<T>(
        &self,
        target: usize,
        storage: &SlotStorage<T>,
        control: &ControlRegister,
    ) -> Result<(), VmError> {
        control.commit_for(storage.slots_in(target))?;
        storage.commit_to(target)?;
        storage.publish_committed();
        debug_assert!(
            control.committed_bits() >= storage.committed_slots() as usize,
            "control register must cover every published slot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn linear_single_page_covers_exactly_the_needed_page() {
        let g = GrowthManager::new(GrowthPolicy::Linear { pages: 1 }, PAGE);
        assert_eq!(g.target_bytes(PAGE, PAGE + 1, 16 * PAGE), 2 * PAGE);
        assert_eq!(g.target_bytes(PAGE, 3 * PAGE, 16 * PAGE), 3 * PAGE);
    }

    #[test]
    fn linear_steps_are_whole_multiples() {
        let g = GrowthManager::new(GrowthPolicy::Linear { pages: 4 }, PAGE);
        assert_eq!(g.target_bytes(PAGE, PAGE + 1, 64 * PAGE), 5 * PAGE);
        assert_eq!(g.target_bytes(PAGE, 6 * PAGE, 64 * PAGE), 9 * PAGE);
    }

    #[test]
    fn doubling_at_least_doubles() {
        let g = GrowthManager::new(GrowthPolicy::Doubling, PAGE);
        assert_eq!(g.target_bytes(2 * PAGE, 2 * PAGE + 1, 64 * PAGE), 4 * PAGE);
        assert_eq!(g.target_bytes(2 * PAGE, 9 * PAGE, 64 * PAGE), 9 * PAGE);
    }

    #[test]
    fn target_is_capped_at_reservation() {
        let g = GrowthManager::new(GrowthPolicy::Doubling, PAGE);
        assert_eq!(g.target_bytes(8 * PAGE, 8 * PAGE + 1, 10 * PAGE), 10 * PAGE);
        let g = GrowthManager::new(GrowthPolicy::Linear { pages: 8 }, PAGE);
        assert_eq!(g.target_bytes(8 * PAGE, 8 * PAGE + 1, 10 * PAGE), 10 * PAGE);
    }

    #[test]
    fn ensure_capacity_commits_control_before_slots() {
        let page = vmarray_sys::page_size();
        let slots_per_page = (page / 8) as u32;
        let max = slots_per_page * 8;
        let storage = SlotStorage::<u64>::reserve(max, max as usize * 8).unwrap();
        let control = ControlRegister::reserve(max).unwrap();
        let g = GrowthManager::new(GrowthPolicy::default(), page);

        g.commit_initial(1, &storage, &control).unwrap();
        assert_eq!(storage.committed_slots(), slots_per_page);

        g.ensure_capacity_for(slots_per_page, &storage, &control)
            .unwrap();
        assert_eq!(storage.committed_slots(), 2 * slots_per_page);
        assert!(control.committed_bits() >= storage.committed_slots() as usize);

        // Already covered: no further growth.
        g.ensure_capacity_for(slots_per_page + 1, &storage, &control)
            .unwrap();
        assert_eq!(storage.committed_bytes(), 2 * page);
    }

    #[test]
    fn control_covers_published_slots_through_doubling() {
        let page = vmarray_sys::page_size();
        let slots_per_page = (page / 8) as u32;
        let max = slots_per_page * 64;
        let storage = SlotStorage::<u64>::reserve(max, max as usize * 8).unwrap();
        let control = ControlRegister::reserve(max).unwrap();
        let g = GrowthManager::new(GrowthPolicy::Doubling, page);

        g.commit_initial(1, &storage, &control).unwrap();
        let mut index = 0;
        while storage.committed_slots() < max {
            index = storage.committed_slots();
            g.ensure_capacity_for(index, &storage, &control).unwrap();
            assert!(storage.committed_slots() > index);
            assert!(control.committed_bits() >= storage.committed_slots() as usize);
        }
        assert_eq!(index, 32 * slots_per_page);
    }
}
