//! Batch lookup: coordinate file in, eligibility CSV out.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tractlookup::config::Config;
use tractlookup::input::read_coordinates_file;
use tractlookup::output::write_csv;
use tractlookup::{LookupService, State};

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Find census tracts and incentive-zone eligibility for coordinates")]
struct Args {
    /// CSV or XLSX file with latitude and longitude columns
    #[arg(short, long)]
    input: PathBuf,

    /// States to check (name, abbreviation or FIPS code; repeat or comma separate)
    #[arg(short, long, required = true)]
    states: Vec<String>,

    /// Output CSV file, or "-" for stdout
    #[arg(short, long, default_value = "eligibility_results.csv")]
    output: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep downloaded tract and zone files in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Tract eligibility flags CSV
    #[arg(long)]
    eligibility: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(cache_dir) = args.cache_dir {
        config.dataset.cache_dir = Some(cache_dir);
    }
    if let Some(eligibility) = args.eligibility {
        config.eligibility.path = eligibility;
    }

    let states = State::parse_list(&args.states)?;
    let batch = read_coordinates_file(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(
        "Read {} coordinates from {} ({} invalid rows dropped)",
        batch.coordinates.len(),
        args.input.display(),
        batch.dropped
    );

    let service = LookupService::new(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!(
        "Looking up {} coordinates",
        batch.coordinates.len()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let report = service.lookup(&states, &batch.coordinates).await;
    spinner.finish_and_clear();
    let report = report.context("Lookup failed")?;

    for warning in &report.warnings {
        warn!("{}", warning);
    }

    if args.output == "-" {
        let stdout = io::stdout();
        write_csv(&report, stdout.lock())?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("Failed to create {}", args.output))?;
        let mut writer = BufWriter::new(file);
        write_csv(&report, &mut writer)?;
        writer.flush()?;
        info!("Wrote {} rows to {}", report.records.len(), args.output);
    }

    Ok(())
}
