//! # Top-N Congestion Report
//!
//! Reads `timestamp,site,cars` lines from a file (or stdin), aggregates cars
//! per site through the bounded producer/consumer pipeline and prints the
//! busiest sites.
//!
//! ## Running
//!
//! ```bash
//! # Defaults: 3 producers, 2 consumers, 10 slots, top 4
//! cargo run -p tallypipe --features cli --bin tally-report --release -- traffic.csv
//!
//! # Wider pipeline, eager ranking, JSON output
//! cargo run -p tallypipe --features cli --bin tally-report --release -- traffic.csv \
//!     -p 4 -c 4 -b 50 --policy eager --json
//!
//! # Fail on the first malformed line
//! cargo run -p tallypipe --features cli --bin tally-report --release -- traffic.csv --strict
//!
//! # Single-threaded reference fold, for comparison
//! cargo run -p tallypipe --features cli --bin tally-report --release -- traffic.csv --sequential
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;
use tallypipe::{
    aggregate_source, run, ParsePolicy, PipelineConfig, PipelineReport, RankPolicy, ReaderSource,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Aggregate per-site traffic counts and report the busiest sites.
#[derive(Parser, Debug)]
#[command(name = "tally-report")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file of `timestamp,site,cars` lines (reads stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Number of producer threads
    #[arg(short = 'p', long, default_value = "3")]
    producers: usize,

    /// Number of consumer threads
    #[arg(short = 'c', long, default_value = "2")]
    consumers: usize,

    /// Bounded buffer capacity
    #[arg(short = 'b', long, default_value = "10")]
    capacity: usize,

    /// Number of sites to report
    #[arg(short = 'n', long, default_value = "4")]
    top: usize,

    /// Ranking policy: eager (sort on every fold) or lazy (sort once)
    #[arg(long, default_value = "lazy")]
    policy: RankPolicy,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Use the single-threaded reference fold instead of the pipeline
    #[arg(long)]
    sequential: bool,
}

fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn BufRead + Send>> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("could not open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// JSON output; `report` is only present for pipeline runs.
#[derive(Serialize)]
struct Output<'a> {
    mode: &'static str,
    ranked: &'a [(i64, i64)],
    report: Option<&'a PipelineReport>,
}

fn print_top(top: &[(i64, i64)], requested: usize) {
    println!("Top {requested} most congested sites:");
    for (site, cars) in top {
        println!("Site ID: {site}, Cars Passed: {cars}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tallypipe=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let parse_policy = if args.strict {
        ParsePolicy::Abort
    } else {
        ParsePolicy::Skip
    };
    let source = ReaderSource::new(open_input(args.input.as_ref())?);

    if args.sequential {
        let started = Instant::now();
        let mut ranked =
            aggregate_source(&source, parse_policy).context("sequential fold failed")?;
        info!(
            lines = source.claimed(),
            keys = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sequential fold finished"
        );
        ranked.truncate(args.top);

        if args.json {
            let output = Output {
                mode: "sequential",
                ranked: &ranked,
                report: None,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_top(&ranked, args.top);
        }
        return Ok(());
    }

    let config = PipelineConfig::new(args.producers, args.consumers, args.capacity)
        .with_rank_policy(args.policy)
        .with_parse_policy(parse_policy);
    let mut report = run(&source, &config).context("pipeline run failed")?;
    report.ranked.truncate(args.top);

    if args.json {
        let output = Output {
            mode: "pipeline",
            ranked: &report.ranked,
            report: Some(&report),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_top(&report.ranked, args.top);
        if report.skipped > 0 {
            eprintln!("({} malformed lines skipped)", report.skipped);
        }
    }

    Ok(())
}
