//! Debug assertion macros for pipeline invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

// =============================================================================
// Bounded Channel: Length Within Capacity
// =============================================================================

/// Assert that the queue never holds more items than it has slots.
///
/// **Invariant**: `0 ≤ len ≤ capacity`
///
/// Used in: `BoundedChannel::put()` after pushing under the queue lock
macro_rules! debug_assert_bounded_len {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "bounded channel violated: len {} exceeds capacity {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Completion Tracker: No Over-Counting
// =============================================================================

/// Assert that the tracker was not incremented more times than there are
/// producers.
///
/// **Invariant**: `completed ≤ expected`
///
/// Used in: `CompletionTracker::increment()`
macro_rules! debug_assert_tracker_in_range {
    ($value:expr, $expected:expr) => {
        debug_assert!(
            $value <= $expected,
            "completion tracker violated: value {} exceeds producer count {}",
            $value,
            $expected
        )
    };
}

// =============================================================================
// Shutdown Protocol: One Sentinel Per Consumer
// =============================================================================

/// Assert that exactly one sentinel was delivered to each consumer.
///
/// **Invariant**: `sentinels_taken == consumers`
///
/// Used in: `pipeline::run()` after all consumers join
macro_rules! debug_assert_sentinels_delivered {
    ($taken:expr, $consumers:expr) => {
        debug_assert!(
            $taken == $consumers,
            "shutdown protocol violated: {} sentinels taken by {} consumers",
            $taken,
            $consumers
        )
    };
}

// =============================================================================
// Aggregate Table: Non-Increasing Ranking
// =============================================================================

/// Assert that a ranked view is sorted by total, descending.
///
/// **Invariant**: `ranked[i].1 ≥ ranked[i + 1].1`
///
/// Used in: `AggregateTable` whenever the sorted view is rebuilt
macro_rules! debug_assert_ranked_descending {
    ($ranked:expr) => {
        debug_assert!(
            $ranked.windows(2).all(|w| w[0].1 >= w[1].1),
            "ranking violated: view is not sorted by total descending"
        )
    };
}

pub(crate) use debug_assert_bounded_len;
pub(crate) use debug_assert_ranked_descending;
pub(crate) use debug_assert_sentinels_delivered;
pub(crate) use debug_assert_tracker_in_range;
