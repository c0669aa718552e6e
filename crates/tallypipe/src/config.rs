use crate::aggregate::RankPolicy;
use crate::error::ConfigError;
use serde::Serialize;

/// What a producer does with a line that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Count and log the line, then keep reading.
    #[default]
    Skip,
    /// Stop reading input and fail the run once it has drained.
    Abort,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Number of producer threads (N ≥ 1)
    pub producers: usize,
    /// Number of consumer threads (M ≥ 1)
    pub consumers: usize,
    /// Bounded channel slots (≥ 1)
    pub capacity: usize,
    /// When the aggregate's ranked view is rebuilt
    pub rank_policy: RankPolicy,
    /// Handling of malformed input lines
    pub parse_policy: ParsePolicy,
}

impl PipelineConfig {
    /// Creates a configuration with the given dimensions and default policies.
    pub const fn new(producers: usize, consumers: usize, capacity: usize) -> Self {
        Self {
            producers,
            consumers,
            capacity,
            rank_policy: RankPolicy::Lazy,
            parse_policy: ParsePolicy::Skip,
        }
    }

    /// One producer, one consumer, one slot: every handoff is serialized.
    pub const fn serialized() -> Self {
        Self::new(1, 1, 1)
    }

    /// Four producers, four consumers, fifty slots.
    pub const fn wide() -> Self {
        Self::new(4, 4, 50)
    }

    pub fn with_producers(mut self, producers: usize) -> Self {
        self.producers = producers;
        self
    }

    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_rank_policy(mut self, policy: RankPolicy) -> Self {
        self.rank_policy = policy;
        self
    }

    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    /// Rejects zero-sized dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers == 0 {
            return Err(ConfigError::ZeroProducers);
        }
        if self.consumers == 0 {
            return Err(ConfigError::ZeroConsumers);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(3, 2, 10)
    }
}
