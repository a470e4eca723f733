//! Single-slot guard for long-running operations

use std::sync::atomic::{AtomicBool, Ordering};

/// At most one holder at a time. A second `try_acquire` while the slot is
/// held returns `None` instead of queueing.
#[derive(Debug, Default)]
pub struct TaskSlot {
    busy: AtomicBool,
}

impl TaskSlot {
    pub fn try_acquire(&self) -> Option<SlotGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop
#[derive(Debug)]
pub struct SlotGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected() {
        let slot = TaskSlot::default();
        let guard = slot.try_acquire();
        assert!(guard.is_some());
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }
}
