//! # Synthetic Traffic Generator
//!
//! Writes `timestamp,site,cars` lines suitable for `tally-report`, one
//! reading per site every `--interval` minutes.
//!
//! ## Running
//!
//! ```bash
//! # 12 sites, 24 hours of 5-minute readings, to stdout
//! cargo run -p tallypipe --features cli --bin tally-generate -- --sites 12 --hours 24
//!
//! # Reproducible file with 1% malformed lines
//! cargo run -p tallypipe --features cli --bin tally-generate -- -o traffic.csv --seed 7 --malformed 0.01
//! ```

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate synthetic per-site traffic readings.
#[derive(Parser, Debug)]
#[command(name = "tally-generate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of sites (keys 1..=sites)
    #[arg(short = 's', long, default_value = "10")]
    sites: i64,

    /// Hours of readings to generate
    #[arg(long, default_value = "12")]
    hours: u32,

    /// Minutes between readings
    #[arg(short = 'i', long, default_value = "5")]
    interval: u32,

    /// Maximum cars per reading
    #[arg(long, default_value = "60")]
    max_cars: i64,

    /// Fraction of lines to corrupt (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    malformed: f64,

    /// Random seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    ensure!(args.sites >= 1, "--sites must be at least 1");
    ensure!(args.interval >= 1, "--interval must be at least 1");
    ensure!(args.max_cars >= 0, "--max-cars must not be negative");
    ensure!(
        (0.0..=1.0).contains(&args.malformed),
        "--malformed must be between 0.0 and 1.0"
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("could not create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut written = 0u64;
    let mut corrupted = 0u64;
    for minute in (0..args.hours * 60).step_by(args.interval as usize) {
        let timestamp = format!("{:02}:{:02}:00", minute / 60 % 24, minute % 60);
        for site in 1..=args.sites {
            let cars = rng.gen_range(0..=args.max_cars);
            if rng.gen_bool(args.malformed) {
                writeln!(out, "{timestamp},site-{site},{cars}")?;
                corrupted += 1;
            } else {
                writeln!(out, "{timestamp},{site},{cars}")?;
            }
            written += 1;
        }
    }
    out.flush()?;

    info!(lines = written, corrupted, "generation finished");
    Ok(())
}
