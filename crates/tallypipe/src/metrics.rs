use serde::Serialize;

/// Handoff counters for a [`BoundedChannel`](crate::BoundedChannel).
///
/// All fields are sampled under the queue lock, so `high_water` is the
/// largest queue length any `put` actually observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMetrics {
    pub puts: u64,
    pub takes: u64,
    pub high_water: usize,
    pub capacity: usize,
}

impl ChannelMetrics {
    /// Items enqueued but not yet dequeued.
    pub fn in_flight(&self) -> u64 {
        self.puts.saturating_sub(self.takes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_saturates() {
        let metrics = ChannelMetrics {
            puts: 3,
            takes: 5,
            ..ChannelMetrics::default()
        };
        assert_eq!(metrics.in_flight(), 0);
    }
}
