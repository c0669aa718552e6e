//! Error types for pipeline configuration, record parsing and runs.

use std::io;
use thiserror::Error;

/// Invalid pipeline dimensions, rejected before any thread starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// At least one producer is required.
    #[error("producer count must be at least 1")]
    ZeroProducers,

    /// At least one consumer is required.
    #[error("consumer count must be at least 1")]
    ZeroConsumers,

    /// The bounded channel needs at least one slot.
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,
}

/// A malformed `timestamp,key,count` line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line did not split into exactly three fields.
    #[error("expected 3 comma-separated fields, found {found}")]
    FieldCount {
        /// Number of fields actually present.
        found: usize,
    },

    /// The timestamp field was empty.
    #[error("timestamp field is empty")]
    EmptyTimestamp,

    /// The key or count field is not an integer.
    #[error("{field} field is not an integer: {value:?}")]
    InvalidInteger {
        /// Which field failed (`"key"` or `"count"`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The raw line read from a byte source was not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// A failed claim from a [`LineSource`](crate::LineSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// One line held invalid UTF-8. The source stays usable; later lines
    /// are still served.
    #[error("line {line} is not valid UTF-8")]
    InvalidUtf8 {
        /// 1-based position of the line in the input.
        line: usize,
        /// The line with invalid sequences replaced by U+FFFD.
        lossy: String,
    },

    /// The underlying reader failed. The source reports exhaustion from
    /// then on.
    #[error("read failed after {claimed} lines")]
    Io {
        /// Lines served before the failure.
        claimed: usize,
        #[source]
        source: io::Error,
    },
}

/// Which kind of worker thread panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    Producer,
    Consumer,
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Errors returned by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The configuration was rejected before the run started.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A line failed to parse while running with `ParsePolicy::Abort`.
    #[error("malformed input line {line:?}: {source}")]
    Parse {
        /// The raw line as claimed from the source.
        line: String,
        /// Why it was rejected.
        #[source]
        source: ParseError,
    },

    /// The input could not be read to the end.
    #[error("input read failed after {claimed} lines: {message}")]
    Read {
        /// Lines served before the failure.
        claimed: usize,
        kind: io::ErrorKind,
        message: String,
    },

    /// A worker thread panicked; the run's aggregate is unreliable.
    #[error("{role} thread panicked")]
    WorkerPanicked {
        /// The kind of worker that panicked.
        role: WorkerRole,
    },
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidUtf8 { lossy, .. } => Self::Parse {
                line: lossy,
                source: ParseError::InvalidUtf8,
            },
            SourceError::Io { claimed, source } => Self::Read {
                claimed,
                kind: source.kind(),
                message: source.to_string(),
            },
        }
    }
}

impl PipelineError {
    /// Returns `true` if the pipeline itself failed (bad configuration or a
    /// crashed worker) rather than its input.
    ///
    /// Input faults (`Parse`, `Read`) still drain every thread cleanly, but
    /// no error variant carries the partial totals.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::WorkerPanicked { .. })
    }

    /// Returns `true` if this error was raised before any thread started.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
