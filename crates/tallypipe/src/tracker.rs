use crate::invariants::debug_assert_tracker_in_range;
use crate::sync::{AtomicUsize, Ordering};
use crossbeam_utils::CachePadded;

/// Counts finished producers so the last one can trigger shutdown.
///
/// Every producer calls [`increment`](Self::increment) exactly once. The
/// fetch-and-add is linearizable, so exactly one caller observes the value
/// equal to the producer count, without a separate barrier.
#[derive(Debug)]
pub struct CompletionTracker {
    completed: CachePadded<AtomicUsize>,
    expected: usize,
}

impl CompletionTracker {
    pub fn new(expected: usize) -> Self {
        Self {
            completed: CachePadded::new(AtomicUsize::new(0)),
            expected,
        }
    }

    /// Records one finished producer and returns the post-increment count.
    #[inline]
    pub fn increment(&self) -> usize {
        let value = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        debug_assert_tracker_in_range!(value, self.expected);
        value
    }

    /// Returns `true` if `value` (from `increment`) marks the last producer.
    #[inline]
    pub fn is_last(&self, value: usize) -> bool {
        value == self.expected
    }

    /// Snapshot of how many producers have finished.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_producer_is_last() {
        let tracker = CompletionTracker::new(1);
        let v = tracker.increment();
        assert_eq!(v, 1);
        assert!(tracker.is_last(v));
    }

    #[test]
    fn test_exactly_one_last_among_many() {
        const PRODUCERS: usize = 16;
        let tracker = Arc::new(CompletionTracker::new(PRODUCERS));

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || tracker.increment())
            })
            .collect();

        let mut values: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        values.sort_unstable();

        assert_eq!(values, (1..=PRODUCERS).collect::<Vec<_>>());
        assert_eq!(values.iter().filter(|v| tracker.is_last(**v)).count(), 1);
        assert_eq!(tracker.completed(), PRODUCERS);
    }
}
