use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use adsift::accumulator::Accumulator;
use adsift::acquire::{self, CommandAdapter};
use adsift::cli::{Cli, Commands};
use adsift::config::{self, AppConfig, OutputFormat};
use adsift::{dedup, export, logger, outlier, reconcile, reference};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    if let Commands::Init = cli.command {
        let path = Path::new(&cli.config);
        if path.exists() {
            println!("Configuration already exists at {}", path.display());
        } else {
            config::create_default_config(path)?;
            println!("Created default configuration at {}", path.display());
        }
        return Ok(());
    }

    let config = AppConfig::load(Path::new(&cli.config))?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Acquire {
            chunk_size,
            no_ledger,
        } => run_acquire(&config, chunk_size, no_ledger),
        Commands::Reconcile { format } => run_reconcile(&config, format.as_deref()),
        Commands::Show => run_show(&config),
    }
}

/// Scrape job-ad hits for the reference list and merge them into the
/// accumulator, one chunk at a time. Strictly sequential - the job site
/// penalizes concurrent automated access.
fn run_acquire(config: &AppConfig, chunk_size: Option<usize>, no_ledger: bool) -> Result<()> {
    let companies = reference::load_reference(&config.data.reference_path)
        .with_context(|| {
            format!(
                "Failed to ingest reference list from {}",
                config.data.reference_path.display()
            )
        })?;
    let names: Vec<String> = companies.into_iter().map(|c| c.name).collect();
    if names.is_empty() {
        bail!("Reference list is empty, nothing to acquire");
    }

    let chunk_size = chunk_size.unwrap_or(config.acquisition.chunk_size);
    let use_ledger = config.acquisition.use_ledger && !no_ledger;

    let mut adapter = CommandAdapter::new(
        config.acquisition.adapter_command.clone(),
        config.acquisition.adapter_args.clone(),
    );

    let summary = acquire::acquire(
        &names,
        &mut adapter,
        &config.data.accumulator_path,
        chunk_size,
        use_ledger,
    )?;

    println!(
        "Acquisition finished: {} of {} chunks merged ({} skipped, {} failed), {} hits",
        summary.merged, summary.total_chunks, summary.skipped, summary.failed, summary.total_hits
    );
    if summary.failed > 0 {
        println!("Re-run `adsift acquire` to retry the failed chunks.");
    }
    Ok(())
}

/// Join the outlier-filtered reference list against the deduplicated
/// accumulator and export the scored result.
fn run_reconcile(config: &AppConfig, format_override: Option<&str>) -> Result<()> {
    let customers = reference::load_reference(&config.data.customers_path)
        .with_context(|| {
            format!(
                "Failed to ingest current customers from {}",
                config.data.customers_path.display()
            )
        })?;
    let candidates = reference::load_reference(&config.data.reference_path)
        .with_context(|| {
            format!(
                "Failed to ingest reference list from {}",
                config.data.reference_path.display()
            )
        })?;

    let accumulator = Accumulator::load(&config.data.accumulator_path)?;
    if accumulator.is_empty() {
        println!(
            "Accumulator at {} is empty. Run `adsift acquire` first.",
            config.data.accumulator_path.display()
        );
        return Ok(());
    }

    let candidates = outlier::filter_outliers(candidates, &customers);
    let groups = dedup::group(accumulator.rows());

    let customer_keys: HashSet<String> = customers.iter().map(|c| c.key.clone()).collect();
    let (matched, unmatched) = reconcile::reconcile(&candidates, &groups, &customer_keys);

    let format = match format_override {
        None => config.output.format,
        Some("csv") => OutputFormat::Csv,
        Some("json") => OutputFormat::Json,
        Some(other) => bail!("Unknown output format '{}' (expected 'csv' or 'json')", other),
    };
    match format {
        OutputFormat::Csv => export::export_csv(&matched, &unmatched, &config.output.directory)?,
        OutputFormat::Json => export::export_json(&matched, &unmatched, &config.output.directory)?,
    }

    export::print_summary(&matched, &unmatched);
    Ok(())
}

fn run_show(config: &AppConfig) -> Result<()> {
    let accumulator = Accumulator::load(&config.data.accumulator_path)?;
    if accumulator.is_empty() {
        println!(
            "Accumulator at {} is empty.",
            config.data.accumulator_path.display()
        );
        return Ok(());
    }

    println!("{} rows in {}:", accumulator.len(), accumulator.path().display());
    for row in accumulator.rows() {
        println!("  {:<50} {}", row.company, row.count);
    }
    Ok(())
}
