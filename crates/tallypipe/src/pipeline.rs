//! Producer and consumer tasks wired around one bounded channel.
//!
//! # Shutdown protocol
//!
//! Producers claim lines until the source is exhausted, then each
//! increments the [`CompletionTracker`] exactly once. Only the producer that
//! observes the final count enqueues the sentinels, one per consumer. Since
//! every other producer has already stopped putting by then, no data item
//! can follow a sentinel, and each consumer stops at the first sentinel it
//! takes, so all M consumers terminate having taken exactly one.
//!
//! The handshake runs from a drop guard, so a producer that panics (for
//! example inside a caller-supplied parse function) still counts itself
//! finished and the consumers still drain and exit.

use crate::aggregate::AggregateTable;
use crate::channel::BoundedChannel;
use crate::config::{ParsePolicy, PipelineConfig};
use crate::error::{ParseError, PipelineError, SourceError, WorkerRole};
use crate::invariants::debug_assert_sentinels_delivered;
use crate::metrics::ChannelMetrics;
use crate::record::{Item, Record};
use crate::source::{LineSource, SharedLines};
use crate::sync::{lock, AtomicBool, Mutex, Ordering};
use crate::tracker::CompletionTracker;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

type ParseFn<'a> = dyn Fn(&str) -> Result<Record, ParseError> + Sync + 'a;
type ObserveFn<'a> = dyn Fn(usize, &Record) + Sync + 'a;

/// Per-producer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProducerStats {
    pub id: usize,
    /// Records parsed and put into the channel.
    pub records: u64,
    /// Claimed lines that failed to parse.
    pub skipped: u64,
    /// Whether this producer finished last and enqueued the sentinels.
    pub last: bool,
}

/// Per-consumer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub id: usize,
    /// Records folded into the aggregate table.
    pub folded: u64,
    /// Sentinels taken; exactly 1 after a clean run.
    pub sentinels: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// `(key, total)` descending by total.
    pub ranked: Vec<(i64, i64)>,
    pub records: u64,
    pub skipped: u64,
    pub sentinels: usize,
    pub producers: Vec<ProducerStats>,
    pub consumers: Vec<ConsumerStats>,
    pub channel: ChannelMetrics,
    pub config: PipelineConfig,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// The `n` highest totals.
    pub fn top(&self, n: usize) -> &[(i64, i64)] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Total for `key`, if it appeared in the input.
    pub fn total(&self, key: i64) -> Option<i64> {
        self.ranked.iter().find(|(k, _)| *k == key).map(|(_, t)| *t)
    }

    /// Id of the producer that enqueued the sentinels.
    pub fn last_producer(&self) -> Option<usize> {
        self.producers.iter().find(|p| p.last).map(|p| p.id)
    }
}

/// Shared state for one run; lives on the stack of [`run_with`].
struct Pipeline<'a> {
    source: &'a dyn LineSource,
    parse: &'a ParseFn<'a>,
    observe: &'a ObserveFn<'a>,
    channel: BoundedChannel<Item>,
    tracker: CompletionTracker,
    table: AggregateTable,
    consumers: usize,
    parse_policy: ParsePolicy,
    halted: AtomicBool,
    fault: Mutex<Option<PipelineError>>,
}

/// Runs the shutdown handshake exactly once, on `complete` or on unwind.
struct Handshake<'p, 'a> {
    pipeline: &'p Pipeline<'a>,
    producer: usize,
    done: bool,
}

impl Handshake<'_, '_> {
    fn complete(mut self) -> bool {
        self.done = true;
        self.pipeline.finish_producer(self.producer)
    }
}

impl Drop for Handshake<'_, '_> {
    fn drop(&mut self) {
        if !self.done {
            warn!(producer = self.producer, "producer unwinding, completing shutdown handshake");
            self.pipeline.finish_producer(self.producer);
        }
    }
}

impl Pipeline<'_> {
    fn produce(&self, id: usize) -> ProducerStats {
        let handshake = Handshake {
            pipeline: self,
            producer: id,
            done: false,
        };
        let mut stats = ProducerStats {
            id,
            records: 0,
            skipped: 0,
            last: false,
        };

        while !self.halted.load(Ordering::Acquire) {
            let (line, parsed) = match self.source.next_line() {
                Ok(Some(line)) => {
                    let parsed = (self.parse)(&line);
                    (line, parsed)
                }
                Ok(None) => break,
                Err(SourceError::InvalidUtf8 { lossy, .. }) => (lossy, Err(ParseError::InvalidUtf8)),
                Err(err) => {
                    warn!(producer = id, error = %err, "input unreadable, halting");
                    self.record_fault(err.into());
                    break;
                }
            };

            match parsed {
                Ok(record) => {
                    trace!(producer = id, key = record.key, count = record.count, "put");
                    self.channel.put(Item::Data(record));
                    stats.records += 1;
                }
                Err(err) => {
                    stats.skipped += 1;
                    match self.parse_policy {
                        ParsePolicy::Skip => {
                            debug!(producer = id, line = %line, error = %err, "skipping malformed line");
                        }
                        ParsePolicy::Abort => {
                            warn!(producer = id, line = %line, error = %err, "malformed line, halting input");
                            self.record_fault(PipelineError::Parse { line, source: err });
                            break;
                        }
                    }
                }
            }
        }

        stats.last = handshake.complete();
        stats
    }

    /// Counts this producer finished; the last one enqueues the sentinels.
    fn finish_producer(&self, id: usize) -> bool {
        let done = self.tracker.increment();
        if !self.tracker.is_last(done) {
            debug!(producer = id, done, "producer finished");
            return false;
        }

        debug!(
            producer = id,
            sentinels = self.consumers,
            "last producer finished, enqueuing sentinels"
        );
        for _ in 0..self.consumers {
            self.channel.put(Item::Shutdown);
        }
        true
    }

    /// Keeps the first fault and stops every producer from claiming more.
    fn record_fault(&self, err: PipelineError) {
        let mut fault = lock(&self.fault);
        if fault.is_none() {
            *fault = Some(err);
        }
        self.halted.store(true, Ordering::Release);
    }

    fn consume(&self, id: usize) -> ConsumerStats {
        let mut stats = ConsumerStats {
            id,
            folded: 0,
            sentinels: 0,
        };

        loop {
            match self.channel.take() {
                Item::Shutdown => {
                    stats.sentinels += 1;
                    break;
                }
                Item::Data(record) => {
                    self.table.add_and_rank(record.key, record.count);
                    (self.observe)(id, &record);
                    stats.folded += 1;
                }
            }
        }

        debug!(consumer = id, folded = stats.folded, "consumer received shutdown");
        stats
    }
}

/// Runs the pipeline over `source`, parsing lines with [`Record::parse`].
///
/// Blocks until every producer and consumer has joined.
pub fn run<S: LineSource>(
    source: &S,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineError> {
    run_with(source, config, Record::parse)
}

/// Runs the pipeline over `source` with a caller-supplied line parser.
pub fn run_with<S, P>(
    source: &S,
    config: &PipelineConfig,
    parse: P,
) -> Result<PipelineReport, PipelineError>
where
    S: LineSource,
    P: Fn(&str) -> Result<Record, ParseError> + Sync,
{
    run_observed(source, config, parse, |_, _| {})
}

/// Runs the pipeline, calling `observe(consumer_id, &record)` on the
/// consumer thread after each record is folded.
///
/// Useful for progress reporting. `observe` runs outside every pipeline
/// lock, but a slow observer holds back its consumer and so backs up the
/// channel.
///
/// The configuration is validated before any thread is spawned. All shared
/// state (channel, tracker, table) is created here and dropped on return,
/// so independent runs never interact.
pub fn run_observed<S, P, O>(
    source: &S,
    config: &PipelineConfig,
    parse: P,
    observe: O,
) -> Result<PipelineReport, PipelineError>
where
    S: LineSource,
    P: Fn(&str) -> Result<Record, ParseError> + Sync,
    O: Fn(usize, &Record) + Sync,
{
    config.validate()?;

    let started = Instant::now();
    info!(
        producers = config.producers,
        consumers = config.consumers,
        capacity = config.capacity,
        rank_policy = %config.rank_policy,
        "pipeline starting"
    );

    let pipeline = Pipeline {
        source,
        parse: &parse,
        observe: &observe,
        channel: BoundedChannel::new(config.capacity)?,
        tracker: CompletionTracker::new(config.producers),
        table: AggregateTable::new(config.rank_policy),
        consumers: config.consumers,
        parse_policy: config.parse_policy,
        halted: AtomicBool::new(false),
        fault: Mutex::new(None),
    };

    let (producer_results, consumer_results) = thread::scope(|s| {
        let shared = &pipeline;
        let producers: Vec<_> = (0..config.producers)
            .map(|id| s.spawn(move || shared.produce(id)))
            .collect();
        let consumers: Vec<_> = (0..config.consumers)
            .map(|id| s.spawn(move || shared.consume(id)))
            .collect();

        let producers: Vec<_> = producers.into_iter().map(|h| h.join()).collect();
        let consumers: Vec<_> = consumers.into_iter().map(|h| h.join()).collect();
        (producers, consumers)
    });

    let producers = producer_results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| PipelineError::WorkerPanicked {
            role: WorkerRole::Producer,
        })?;
    let consumers = consumer_results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| PipelineError::WorkerPanicked {
            role: WorkerRole::Consumer,
        })?;

    let Pipeline {
        channel,
        table,
        fault,
        ..
    } = pipeline;

    let sentinels: usize = consumers.iter().map(|c| c.sentinels).sum();
    debug_assert_sentinels_delivered!(sentinels, config.consumers);

    if let Some(err) = fault
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
    {
        return Err(err);
    }

    let report = PipelineReport {
        ranked: table.into_ranked(),
        records: producers.iter().map(|p| p.records).sum(),
        skipped: producers.iter().map(|p| p.skipped).sum(),
        sentinels,
        producers,
        consumers,
        channel: channel.metrics(),
        config: *config,
        elapsed: started.elapsed(),
    };

    info!(
        records = report.records,
        skipped = report.skipped,
        keys = report.ranked.len(),
        high_water = report.channel.high_water,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "pipeline finished"
    );

    Ok(report)
}

/// Runs `lines` through a pipeline of the given shape and returns the
/// ranked `(key, total)` list. Malformed lines are skipped.
pub fn run_lines<I, L>(
    lines: I,
    producers: usize,
    consumers: usize,
    capacity: usize,
) -> Result<Vec<(i64, i64)>, PipelineError>
where
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    let source = SharedLines::from_vec(lines.into_iter().map(Into::into).collect());
    let config = PipelineConfig::new(producers, consumers, capacity);
    run(&source, &config).map(|report| report.ranked)
}
