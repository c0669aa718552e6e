//! TallyPipe - Bounded-Buffer Producer/Consumer Aggregation
//!
//! N producer threads claim lines from a shared [`LineSource`], parse them
//! into [`Record`]s and put them into a fixed-capacity [`BoundedChannel`].
//! M consumer threads take records and fold them into a shared
//! [`AggregateTable`] of per-key totals. When the input runs out, the last
//! producer to finish (detected with a single [`CompletionTracker`] counter)
//! enqueues one shutdown sentinel per consumer.
//!
//! # Key Features
//!
//! - Paired counting semaphores (free slots, filled slots) plus a queue mutex
//! - No lock is ever held while blocked on a semaphore
//! - Exactly-once sentinel delivery without a barrier
//! - Eager or lazy ranking of the aggregate
//! - All shared state is owned by one `run` call; runs never interact
//!
//! # Example
//!
//! ```
//! use tallypipe::{run, PipelineConfig, SharedLines};
//!
//! let source = SharedLines::from_vec(vec![
//!     "t1,1,5".to_string(),
//!     "t2,2,9".to_string(),
//!     "t3,1,3".to_string(),
//!     "t4,3,1".to_string(),
//! ]);
//!
//! let report = run(&source, &PipelineConfig::new(2, 2, 2)).unwrap();
//! assert_eq!(report.top(2), &[(2, 9), (1, 8)]);
//! assert_eq!(report.sentinels, 2);
//! ```

mod aggregate;
mod channel;
mod config;
mod error;
mod invariants;
mod metrics;
mod pipeline;
mod record;
mod semaphore;
mod sequential;
mod source;
mod sync;
mod tracker;

pub use aggregate::{AggregateTable, RankPolicy};
pub use channel::BoundedChannel;
pub use config::{ParsePolicy, PipelineConfig};
pub use error::{ConfigError, ParseError, PipelineError, SourceError, WorkerRole};
pub use metrics::ChannelMetrics;
pub use pipeline::{
    run, run_lines, run_observed, run_with, ConsumerStats, PipelineReport, ProducerStats,
};
pub use record::{Item, Record};
pub use semaphore::Semaphore;
pub use sequential::{aggregate_sequential, aggregate_source};
pub use source::{LineSource, ReaderSource, SharedLines};
pub use tracker::CompletionTracker;
