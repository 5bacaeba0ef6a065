use crate::{shm::ShmSafe, StoreError};

use super::Semaphore;

/// The three semaphores guarding a bounded buffer.
///
/// Producers take `empty_slots` then `mutex`, and post `filled_slots` after
/// unlocking. Consumers mirror this with the roles swapped. Taking `mutex`
/// before the counting semaphore can deadlock.
#[repr(C)]
#[derive(Debug)]
pub struct SlotSemaphores {
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    mutex: Semaphore,
}

/// Raw semaphore values, see [`SlotSemaphores::counts`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SemaphoreCounts {
    pub empty_slots: i32,
    pub filled_slots: i32,
    pub mutex: i32,
}

impl SlotSemaphores {
    /// # Safety
    ///
    /// Same contract as [`Semaphore::init_at`].
    pub unsafe fn init_at(target: *mut Self, capacity: u32) -> Result<(), StoreError> {
        unsafe {
            Semaphore::init_all(&[
                (&raw mut (*target).empty_slots, capacity, "empty_slots"),
                (&raw mut (*target).filled_slots, 0, "filled_slots"),
                (&raw mut (*target).mutex, 1, "mutex"),
            ])
        }
    }

    pub fn acquire_empty_slot(&self) {
        self.empty_slots.wait();
    }

    pub fn acquire_filled_slot(&self) {
        self.filled_slots.wait();
    }

    pub fn lock(&self) {
        self.mutex.wait();
    }

    pub fn unlock(&self) {
        self.mutex.post();
    }

    pub fn release_empty_slot(&self) {
        self.empty_slots.post();
    }

    pub fn release_filled_slot(&self) {
        self.filled_slots.post();
    }

    pub fn counts(&self) -> SemaphoreCounts {
        SemaphoreCounts {
            empty_slots: self.empty_slots.value(),
            filled_slots: self.filled_slots.value(),
            mutex: self.mutex.value(),
        }
    }
}

unsafe impl ShmSafe for SlotSemaphores {}
