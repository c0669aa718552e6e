//! Single-threaded reference fold.
//!
//! Produces the same totals as the pipeline with no threads, no channel and
//! no locks. Used as the oracle in tests and by `tally-report --sequential`.
//! Ties are ranked by ascending key.

use crate::config::ParsePolicy;
use crate::error::{ParseError, PipelineError, SourceError};
use crate::record::Record;
use crate::source::LineSource;
use std::collections::BTreeMap;

#[derive(Default)]
struct Fold {
    totals: BTreeMap<i64, i64>,
}

impl Fold {
    fn add(
        &mut self,
        line: String,
        parsed: Result<Record, ParseError>,
        parse_policy: ParsePolicy,
    ) -> Result<(), PipelineError> {
        match parsed {
            Ok(record) => {
                let total = self.totals.entry(record.key).or_insert(0);
                *total = total.saturating_add(record.count);
                Ok(())
            }
            Err(source) if parse_policy == ParsePolicy::Abort => {
                Err(PipelineError::Parse { line, source })
            }
            Err(_) => Ok(()),
        }
    }

    fn into_ranked(self) -> Vec<(i64, i64)> {
        let mut ranked: Vec<(i64, i64)> = self.totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Folds `lines` on the calling thread and returns `(key, total)` sorted by
/// total, descending.
pub fn aggregate_sequential<I, L>(
    lines: I,
    parse_policy: ParsePolicy,
) -> Result<Vec<(i64, i64)>, PipelineError>
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    let mut fold = Fold::default();
    for line in lines {
        let line = line.as_ref();
        fold.add(line.to_string(), Record::parse(line), parse_policy)?;
    }
    Ok(fold.into_ranked())
}

/// Drains `source` on the calling thread, treating undecodable lines and
/// read errors exactly as a pipeline run does.
pub fn aggregate_source<S: LineSource + ?Sized>(
    source: &S,
    parse_policy: ParsePolicy,
) -> Result<Vec<(i64, i64)>, PipelineError> {
    let mut fold = Fold::default();
    loop {
        match source.next_line() {
            Ok(Some(line)) => {
                let parsed = Record::parse(&line);
                fold.add(line, parsed, parse_policy)?;
            }
            Ok(None) => break,
            Err(SourceError::InvalidUtf8 { lossy, .. }) => {
                fold.add(lossy, Err(ParseError::InvalidUtf8), parse_policy)?;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(fold.into_ranked())
}
