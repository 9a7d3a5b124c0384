use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use log::info;

use scenario_rollup::config::{ConfigOverlay, PoolConfig};
use scenario_rollup::utils::init_logging;
use scenario_rollup::{JsonCredentialStore, LocalObjectStore, Pipeline, PipelineConfig, Publisher};

/// Process model outputs into published scenario summaries
#[derive(Parser, Debug)]
#[command(name = "scenario-rollup", version)]
struct Cli {
    /// Input directory to read model output from
    #[arg(short, long)]
    input: PathBuf,

    /// Base output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Add county-level tables to the outputs
    #[arg(long)]
    add_counties: bool,

    /// Skip all data loading and just republish existing CSVs
    #[arg(long)]
    start_from_csvs: bool,

    /// Optional JSON file overriding scenarios, region, file prefix and publish settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the credential store
    #[arg(long, default_value = "credentials")]
    credentials_dir: PathBuf,

    /// Root of the object store that files are published to
    #[arg(long, default_value = "object-store")]
    object_store: PathBuf,

    /// Observed hospital census CSV to publish alongside the scenarios
    #[arg(long)]
    actuals: Option<PathBuf>,

    /// Upper bound on worker threads
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = PipelineConfig::new(&cli.input, &cli.output);
    config.include_counties = cli.add_counties;
    config.start_from_csvs = cli.start_from_csvs;
    config.pools = PoolConfig {
        max_threads: cli.threads,
    };
    let config = match &cli.config {
        Some(path) => config
            .with_overlay(ConfigOverlay::from_path(path)?)
            .with_context(|| format!("invalid configuration in {}", path.display()))?,
        None => {
            config.validate()?;
            config
        }
    };

    info!(
        "Processing {} scenario(s) from {}",
        config.scenarios.len(),
        config.input_dir.display()
    );

    let publisher = Publisher::connect(
        Box::new(LocalObjectStore::new(&cli.object_store)),
        &JsonCredentialStore::new(&cli.credentials_dir),
        &config.publish,
        config.date_slug(),
    )
    .context("failed to set up publishing")?;

    let mut pipeline = Pipeline::new(&config);
    if let Some(path) = &cli.actuals {
        pipeline = pipeline.with_actuals(path);
    }
    let report = pipeline.run(&publisher)?;

    for (name, reason) in &report.skipped {
        info!("Skipped '{name}': {reason}");
    }
    info!(
        "Published {} object(s) for {} scenario(s)",
        report.published.len(),
        report.loaded.len()
    );
    Ok(())
}
