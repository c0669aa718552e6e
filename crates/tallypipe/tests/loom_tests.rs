//! Loom-based concurrency tests for tallypipe.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! With the `loom` feature the crate's `Semaphore`, `BoundedChannel` and
//! `CompletionTracker` are built on loom's primitives, so these models
//! explore every interleaving of the real implementations.

#![cfg(feature = "loom")]

use loom::sync::Arc;
use loom::thread;
use tallypipe::{BoundedChannel, CompletionTracker, Semaphore};

/// A released permit is observed by exactly one of two blocked acquirers.
#[test]
fn loom_semaphore_handoff() {
    loom::model(|| {
        let sem = Arc::new(Semaphore::new(1));
        let other = Arc::clone(&sem);

        let t = thread::spawn(move || {
            other.acquire();
            other.release();
        });

        sem.acquire();
        sem.release();
        t.join().unwrap();

        assert_eq!(sem.available(), 1);
    });
}

/// Capacity-1 channel: producer blocks on the second put until the consumer
/// takes, and items arrive in FIFO order.
#[test]
fn loom_channel_capacity_one_fifo() {
    loom::model(|| {
        let ch = Arc::new(BoundedChannel::new(1).unwrap());
        let producer_ch = Arc::clone(&ch);

        let producer = thread::spawn(move || {
            producer_ch.put(1);
            producer_ch.put(2);
        });

        assert_eq!(ch.take(), 1);
        assert_eq!(ch.take(), 2);
        producer.join().unwrap();

        assert!(ch.len() <= 1);
        assert!(ch.is_empty());
    });
}

/// Two producers, one consumer: every item is delivered exactly once.
#[test]
fn loom_channel_two_producers_exactly_once() {
    loom::model(|| {
        let ch = Arc::new(BoundedChannel::new(1).unwrap());

        let handles: Vec<_> = [10, 20]
            .into_iter()
            .map(|v| {
                let ch = Arc::clone(&ch);
                thread::spawn(move || ch.put(v))
            })
            .collect();

        let mut got = vec![ch.take(), ch.take()];
        for h in handles {
            h.join().unwrap();
        }
        got.sort_unstable();
        assert_eq!(got, vec![10, 20]);
        assert_eq!(ch.metrics().high_water, 1);
    });
}

/// Shutdown handshake in miniature: two producers increment the tracker,
/// the last one enqueues a sentinel per consumer, and both consumers stop.
#[test]
fn loom_last_producer_sends_sentinels() {
    const CONSUMERS: usize = 2;

    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        let ch: Arc<BoundedChannel<Option<u8>>> = Arc::new(BoundedChannel::new(2).unwrap());
        let tracker = Arc::new(CompletionTracker::new(2));

        let producers: Vec<_> = (0..2u8)
            .map(|id| {
                let ch = Arc::clone(&ch);
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    ch.put(Some(id));
                    let done = tracker.increment();
                    if tracker.is_last(done) {
                        for _ in 0..CONSUMERS {
                            ch.put(None);
                        }
                        true
                    } else {
                        false
                    }
                })
            })
            .collect();

        let consumer_ch = Arc::clone(&ch);
        let consumer = thread::spawn(move || {
            let mut data = 0;
            while consumer_ch.take().is_some() {
                data += 1;
            }
            data
        });

        let mut data = 0;
        while ch.take().is_some() {
            data += 1;
        }

        let lasts = producers
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|last| *last)
            .count();
        data += consumer.join().unwrap();

        assert_eq!(lasts, 1);
        assert_eq!(data, 2);
        assert_eq!(tracker.completed(), 2);
        assert!(ch.is_empty());
    });
}
