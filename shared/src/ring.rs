use crate::{shm::ShmSafe, Item};

/// Fixed capacity FIFO of [`Item`]s.
///
/// The ring does no synchronization of its own. Inside a [`crate::Store`] it
/// is only reachable through the guard returned by [`crate::Store::lock`].
#[repr(C)]
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    front: u32,
    rear: u32,
    count: u32,
    slots: [Item; N],
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0 && N <= u32::MAX as usize, "ring capacity out of range") };
        Self {
            front: 0,
            rear: 0,
            count: 0,
            slots: [Item::EMPTY; N],
        }
    }

    /// Appends `item` at the rear.
    ///
    /// # Panics
    ///
    /// If the ring is full. Callers hold an empty slot permit, so this only
    /// fires when the semaphore protocol was bypassed.
    pub fn insert(&mut self, item: Item) {
        assert!(!self.is_full(), "insert into a full ring buffer");

        self.slots[self.rear as usize] = item;
        self.rear = Self::advance(self.rear);
        self.count += 1;
    }

    /// Takes the item at the front.
    ///
    /// # Panics
    ///
    /// If the ring is empty.
    pub fn remove(&mut self) -> Item {
        assert!(!self.is_empty(), "remove from an empty ring buffer");

        let item = self.slots[self.front as usize];
        self.front = Self::advance(self.front);
        self.count -= 1;
        item
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count as usize == N
    }

    pub fn front(&self) -> usize {
        self.front as usize
    }

    pub fn rear(&self) -> usize {
        self.rear as usize
    }

    fn advance(index: u32) -> u32 {
        ((index as usize + 1) % N) as u32
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const N: usize> ShmSafe for RingBuffer<N> {}

const _: () = {
    use std::mem::offset_of;

    type Demo = RingBuffer<{ crate::STORE_CAPACITY }>;
    assert!(offset_of!(Demo, front) == 0);
    assert!(offset_of!(Demo, rear) == 4);
    assert!(offset_of!(Demo, count) == 8);
    assert!(offset_of!(Demo, slots) == 12);
};

#[cfg(test)]
mod test {
    use super::RingBuffer;
    use crate::Item;

    fn item(id: u32) -> Item {
        Item::new(id, "widget", id * 10)
    }

    #[test]
    fn fifo() {
        let mut ring = RingBuffer::<8>::new();
        for id in 1..=5 {
            ring.insert(item(id));
        }
        assert_eq!(ring.len(), 5);
        for id in 1..=5 {
            assert_eq!(ring.remove().id(), id);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn wraps_around() {
        let mut ring = RingBuffer::<3>::new();
        let mut next = 1;
        let mut expected = 1;

        for _ in 0..10 {
            while !ring.is_full() {
                ring.insert(item(next));
                next += 1;
            }
            assert_eq!(ring.len(), 3);
            assert!(ring.front() < 3 && ring.rear() < 3);

            for _ in 0..2 {
                assert_eq!(ring.remove().id(), expected);
                expected += 1;
            }
        }
    }

    #[test]
    fn indices_follow_operations() {
        let mut ring = RingBuffer::<2>::new();
        ring.insert(item(1));
        assert_eq!((ring.front(), ring.rear(), ring.len()), (0, 1, 1));
        ring.insert(item(2));
        assert_eq!((ring.front(), ring.rear(), ring.len()), (0, 0, 2));
        ring.remove();
        assert_eq!((ring.front(), ring.rear(), ring.len()), (1, 0, 1));
    }

    #[test]
    fn capacity_one() {
        let mut ring = RingBuffer::<1>::new();
        for id in 1..=4 {
            ring.insert(item(id));
            assert!(ring.is_full());
            assert_eq!(ring.remove(), item(id));
        }
    }

    #[test]
    #[should_panic(expected = "full ring buffer")]
    fn insert_when_full_panics() {
        let mut ring = RingBuffer::<1>::new();
        ring.insert(item(1));
        ring.insert(item(2));
    }

    #[test]
    #[should_panic(expected = "empty ring buffer")]
    fn remove_when_empty_panics() {
        let mut ring = RingBuffer::<4>::new();
        ring.remove();
    }
}
