use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use shared::{Item, Store, StoreCounts, StoreError, STORE_CAPACITY};

const NAMES: [&str; 4] = ["apple", "banana", "cherry", "durian"];

// Every field is derived from the id so a torn record is detectable.
fn expected(id: u32) -> (&'static str, u32) {
    (NAMES[id as usize % NAMES.len()], id.wrapping_mul(7))
}

fn produce<const N: usize>(store: &Store<N>, items: usize) {
    for _ in 0..items {
        let id = store.create_item("", 0).id();
        let (name, price) = expected(id);
        store.insert(Item::new(id, name, price)).unwrap();
    }
}

fn consume<const N: usize>(store: &Store<N>) -> Vec<u32> {
    let mut ids = Vec::new();
    loop {
        match store.remove() {
            Ok(item) => {
                let (name, price) = expected(item.id());
                assert_eq!(item.name(), name, "corrupted item {item:?}");
                assert_eq!(item.price(), price, "corrupted item {item:?}");
                ids.push(item.id());
            }
            Err(StoreError::Closed) => return ids,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

fn run<const N: usize>(producers: usize, consumers: usize, per_producer: usize) -> Vec<Vec<u32>> {
    let region = Store::<N>::allocate().unwrap();
    let store = region.get();

    let received = thread::scope(|s| {
        let consumers: Vec<_> = (0..consumers).map(|_| s.spawn(|| consume(store))).collect();
        let producers: Vec<_> = (0..producers)
            .map(|_| s.spawn(|| produce(store, per_producer)))
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        store.close();

        consumers
            .into_iter()
            .map(|c| c.join().unwrap())
            .collect::<Vec<_>>()
    });

    let all: Vec<u32> = received.iter().flatten().copied().collect();
    assert_eq!(all.len(), producers * per_producer);
    let unique: HashSet<u32> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len(), "item delivered twice");

    received
}

#[test]
fn one_producer_four_consumers() {
    let received = run::<STORE_CAPACITY>(1, 4, 10_000);

    // ids are handed out in insertion order, so each consumer sees them ascending
    for ids in &received {
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn single_consumer_sees_exact_order() {
    let received = run::<STORE_CAPACITY>(1, 1, 2_000);
    let expected: Vec<u32> = (1..=2_000).collect();
    assert_eq!(received[0], expected);
}

#[test]
fn no_deadlock_across_shapes() {
    for (producers, consumers) in [(1, 1), (1, 3), (3, 1), (4, 4)] {
        run::<1>(producers, consumers, 500);
        run::<2>(producers, consumers, 500);
        run::<3>(producers, consumers, 500);
        run::<STORE_CAPACITY>(producers, consumers, 500);
    }
}

#[test]
fn counts_balance_when_quiescent() {
    let region = Store::<STORE_CAPACITY>::allocate().unwrap();
    let store = region.get();
    let removed = AtomicUsize::new(0);

    thread::scope(|s| {
        s.spawn(|| produce(store, 300));
        s.spawn(|| {
            for _ in 0..295 {
                store.remove().unwrap();
                removed.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    assert_eq!(removed.load(Ordering::Relaxed), 295);
    assert_eq!(
        store.counts(),
        StoreCounts {
            empty_slots: (STORE_CAPACITY - 5) as i32,
            filled_slots: 5,
            count: 5,
        }
    );
}
