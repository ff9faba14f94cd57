use foundation_sync::{BoundedQueue, CountDownLatch};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
#[ntest::timeout(20000)]
fn test_many_producers_many_consumers_exactly_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 2_000;

    let queue = BoundedQueue::new(8);
    let max_seen = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            let max_seen = Arc::clone(&max_seen);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.put((producer, i));
                    max_seen.fetch_max(queue.len(), Ordering::Relaxed);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                (0..PRODUCERS * PER_PRODUCER / CONSUMERS)
                    .map(|_| queue.take())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut seen = HashSet::new();
    for consumer in consumers {
        let items = consumer.join().unwrap();

        // Items from one producer reach any single consumer in put order.
        let mut last = vec![None; PRODUCERS];
        for &(producer, i) in &items {
            assert!(last[producer].is_none_or(|prev| prev < i));
            last[producer] = Some(i);
        }

        for item in items {
            assert!(seen.insert(item), "delivered twice: {item:?}");
        }
    }

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(max_seen.load(Ordering::Relaxed) <= queue.capacity());
    assert!(queue.is_empty());
}

#[test]
#[ntest::timeout(10000)]
fn test_latch_as_start_gate_and_completion_signal() {
    const WORKERS: usize = 8;

    let start = CountDownLatch::new(1);
    let finished = CountDownLatch::new(WORKERS);
    let ready = Arc::new(AtomicUsize::new(0));

    for _ in 0..WORKERS {
        let (start, finished, ready) = (start.clone(), finished.clone(), Arc::clone(&ready));
        thread::spawn(move || {
            ready.fetch_add(1, Ordering::SeqCst);
            start.wait();
            finished.count_down();
        });
    }

    while ready.load(Ordering::SeqCst) < WORKERS {
        thread::yield_now();
    }
    assert_eq!(finished.count(), WORKERS);

    start.count_down();
    finished.wait();

    // Extra count downs on an open latch change nothing.
    for _ in 0..3 {
        finished.count_down();
    }
    assert_eq!(finished.count(), 0);
    finished.wait();
}
