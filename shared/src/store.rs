use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

use crate::{
    shm::{SharedRegion, ShmSafe},
    sync::SlotSemaphores,
    Item, RingBuffer, StoreError,
};

/// Contents of the shared region: the semaphore triple followed by the ring.
///
/// The id counter and the close flag trail the ring so the leading layout
/// stays `empty_slots, filled_slots, mutex, ring`.
#[repr(C)]
pub struct Store<const N: usize> {
    semaphores: SlotSemaphores,
    ring: UnsafeCell<RingBuffer<N>>,
    next_id: AtomicU32,
    closed: AtomicBool,
}

/// Snapshot of the store's counters taken under the mutex.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StoreCounts {
    pub empty_slots: i32,
    pub filled_slots: i32,
    pub count: usize,
}

impl<const N: usize> Store<N> {
    /// Maps a region and initializes a store inside it.
    pub fn allocate() -> Result<SharedRegion<Self>, StoreError> {
        SharedRegion::allocate(|ptr| unsafe { Self::init_at(ptr) })
    }

    /// # Safety
    ///
    /// `target` must point to writable shared memory that no other context
    /// uses yet and that will not move.
    pub unsafe fn init_at(target: *mut Self) -> Result<(), StoreError> {
        unsafe {
            SlotSemaphores::init_at(&raw mut (*target).semaphores, N as u32)?;
            (&raw mut (*target).ring).write(UnsafeCell::new(RingBuffer::new()));
            (&raw mut (*target).next_id).write(AtomicU32::new(1));
            (&raw mut (*target).closed).write(AtomicBool::new(false));
        }
        Ok(())
    }

    /// Copies `item` into the buffer, blocking while it is full.
    ///
    /// Fails only after [`Store::close`]; the item is not inserted then.
    pub fn insert(&self, item: Item) -> Result<(), StoreError> {
        self.semaphores.acquire_empty_slot();

        let mut ring = self.lock();
        if self.is_closed() {
            drop(ring);
            // pass the wakeup on to the next waiting producer
            self.semaphores.release_empty_slot();
            return Err(StoreError::Closed);
        }
        ring.insert(item);
        drop(ring);

        self.semaphores.release_filled_slot();
        tracing::trace!(id = item.id(), "inserted item");
        Ok(())
    }

    /// Takes the oldest item, blocking while the buffer is empty.
    ///
    /// Once the store is closed, buffered items are still handed out and
    /// [`StoreError::Closed`] is returned after the last one.
    pub fn remove(&self) -> Result<Item, StoreError> {
        self.semaphores.acquire_filled_slot();

        let mut ring = self.lock();
        if ring.is_empty() && self.is_closed() {
            drop(ring);
            // pass the wakeup on to the next waiting consumer
            self.semaphores.release_filled_slot();
            return Err(StoreError::Closed);
        }
        let item = ring.remove();
        drop(ring);

        self.semaphores.release_empty_slot();
        tracing::trace!(id = item.id(), "removed item");
        Ok(item)
    }

    /// Takes the mutex and hands out the ring until the guard drops.
    ///
    /// Mutating the ring this way bypasses the slot semaphores; `insert` and
    /// `remove` are the only sequences that keep the counters consistent.
    pub fn lock(&self) -> RingGuard<'_, N> {
        self.semaphores.lock();
        RingGuard { store: self }
    }

    pub fn semaphores(&self) -> &SlotSemaphores {
        &self.semaphores
    }

    /// Builds an item with the next id of the region-wide counter.
    pub fn create_item(&self, name: &str, price: u32) -> Item {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Item::new(id, name, price)
    }

    /// Wakes every blocked context and makes further inserts fail.
    ///
    /// The flag flips under the mutex, so an insert either lands before the
    /// close (and is drained by consumers) or observes it and fails.
    pub fn close(&self) {
        let ring = self.lock();
        let already_closed = self.closed.swap(true, Ordering::SeqCst);
        drop(ring);
        if already_closed {
            return;
        }
        tracing::debug!("closing store");
        // One post per side; each woken waiter passes it on.
        self.semaphores.release_filled_slot();
        self.semaphores.release_empty_slot();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Only consistent while no other context is between a counting
    /// semaphore operation and the matching mutex section.
    pub fn counts(&self) -> StoreCounts {
        let ring = self.lock();
        let sems = self.semaphores.counts();
        StoreCounts {
            empty_slots: sems.empty_slots,
            filled_slots: sems.filled_slots,
            count: ring.len(),
        }
    }
}

unsafe impl<const N: usize> Sync for Store<N> {}

unsafe impl<const N: usize> ShmSafe for Store<N> {}

pub struct RingGuard<'a, const N: usize> {
    store: &'a Store<N>,
}

impl<const N: usize> Deref for RingGuard<'_, N> {
    type Target = RingBuffer<N>;
    fn deref(&self) -> &RingBuffer<N> {
        unsafe { &*self.store.ring.get() }
    }
}

impl<const N: usize> DerefMut for RingGuard<'_, N> {
    fn deref_mut(&mut self) -> &mut RingBuffer<N> {
        unsafe { &mut *self.store.ring.get() }
    }
}

impl<const N: usize> Drop for RingGuard<'_, N> {
    fn drop(&mut self) {
        self.store.semaphores.unlock();
    }
}

mod layout {
    use std::mem::offset_of;

    use libc::sem_t;

    use super::Store;
    use crate::{sync::SlotSemaphores, STORE_CAPACITY};

    type Demo = Store<STORE_CAPACITY>;
    const SEM: usize = size_of::<sem_t>();

    const _: () = assert!(offset_of!(Demo, semaphores) == 0);
    const _: () = assert!(size_of::<SlotSemaphores>() == SEM * 3);
    const _: () = assert!(offset_of!(Demo, ring) == SEM * 3);
}
