use crate::error::ConfigError;
use crate::invariants::debug_assert_bounded_len;
use crate::metrics::ChannelMetrics;
use crate::semaphore::Semaphore;
use crate::sync::{lock, Mutex};
use crossbeam_utils::CachePadded;
use std::collections::VecDeque;

// =============================================================================
// SLOT ACCOUNTING
// =============================================================================
//
// Capacity limiting and mutual exclusion are separate concerns:
//
// - `free_slots` starts at `capacity`; producers acquire one before inserting.
// - `filled` starts at 0; consumers acquire one before removing.
// - `queue` is only ever locked for the push/pop itself.
//
// **put**:  acquire(free_slots) → lock(queue) → push_back → unlock → release(filled)
// **take**: acquire(filled)     → lock(queue) → pop_front → unlock → release(free_slots)
//
// A thread never blocks on a semaphore while holding the queue lock, so a
// full or empty channel cannot wedge the other side out of the queue.
// `free_slots + filled + (puts/takes between acquire and release) == capacity`
// holds at every point.
//
// =============================================================================

/// Fixed-capacity FIFO with blocking `put`/`take`, shared by any number of
/// producers and consumers.
pub struct BoundedChannel<T> {
    queue: Mutex<Queue<T>>,
    free_slots: CachePadded<Semaphore>,
    filled: CachePadded<Semaphore>,
    capacity: usize,
}

struct Queue<T> {
    items: VecDeque<T>,
    puts: u64,
    takes: u64,
    high_water: usize,
}

impl<T> BoundedChannel<T> {
    /// Creates a channel with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Self {
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity),
                puts: 0,
                takes: 0,
                high_water: 0,
            }),
            free_slots: CachePadded::new(Semaphore::new(capacity)),
            filled: CachePadded::new(Semaphore::new(0)),
            capacity,
        })
    }

    /// Enqueues `item` at the tail, blocking while the channel is full.
    pub fn put(&self, item: T) {
        self.free_slots.acquire();
        self.push(item);
        self.filled.release();
    }

    /// Enqueues `item` if a slot is free right now, otherwise hands it back.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        if !self.free_slots.try_acquire() {
            return Err(item);
        }
        self.push(item);
        self.filled.release();
        Ok(())
    }

    /// Dequeues the head item, blocking while the channel is empty.
    pub fn take(&self) -> T {
        self.filled.acquire();
        let item = self.pop();
        self.free_slots.release();
        item
    }

    /// Dequeues the head item if one is queued right now.
    pub fn try_take(&self) -> Option<T> {
        if !self.filled.try_acquire() {
            return None;
        }
        let item = self.pop();
        self.free_slots.release();
        Some(item)
    }

    fn push(&self, item: T) {
        let mut queue = lock(&self.queue);
        queue.items.push_back(item);
        queue.puts += 1;
        let len = queue.items.len();
        debug_assert_bounded_len!(len, self.capacity);
        queue.high_water = queue.high_water.max(len);
    }

    fn pop(&self) -> T {
        let mut queue = lock(&self.queue);
        let Some(item) = queue.items.pop_front() else {
            unreachable!("filled permit acquired with an empty queue");
        };
        queue.takes += 1;
        item
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of queued items.
    pub fn len(&self) -> usize {
        lock(&self.queue).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the handoff counters.
    pub fn metrics(&self) -> ChannelMetrics {
        let queue = lock(&self.queue);
        ChannelMetrics {
            puts: queue.puts,
            takes: queue.takes,
            high_water: queue.high_water,
            capacity: self.capacity,
        }
    }
}
