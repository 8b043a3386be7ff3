mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_engine::{Catalog, SnapshotHarvester};
use clap::Parser;

use platform::config;
use platform::logging::{self, LogDestination};
use platform::verbs::{self, Verb};

/// Answers one selective-harvesting request against a repository fixture.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// RON file with catalog settings. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// RON file describing the repository's containers and items.
    #[arg(short, long)]
    repository: PathBuf,
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    verb: Verb,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let settings = config::load_settings(cli.config.as_deref())?;
    let repository = config::load_repository(&cli.repository)?;
    let catalog = Catalog::new(settings, Arc::new(repository), Arc::new(SnapshotHarvester))
        .context("failed to build catalog")?;

    let answer = verbs::run(&catalog, &cli.verb)?;
    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}
