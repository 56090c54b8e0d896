use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pantry_seed::util::env as env_util;
use pantry_seed::{plan_jobs, run_seed, Dataset, Overrides, SeedConfig};

#[derive(Parser, Debug)]
#[command(
    name = "pantry-seed",
    version,
    about = "Seed the food pantry reference tables from JSON exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Seed `items` from product.json
    Items(SingleArgs),
    /// Seed `categories` from category.json
    Categories(SingleArgs),
    /// Seed `versions` from version.json
    Versions(SingleArgs),
    /// Seed categories, items and versions over one session
    All(CommonArgs),
}

#[derive(Args, Debug)]
struct SingleArgs {
    /// Export file to read (defaults to the dataset's file under --data-dir)
    #[arg(long)]
    file: Option<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory holding product.json / category.json / version.json
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// Optional override for the database URL (mysql://... or sqlite:...)
    #[arg(long)]
    db_url: Option<String>,
    /// Connection attempts before giving up (default: env or 30)
    #[arg(long)]
    attempts: Option<u32>,
    /// Seconds to wait between connection attempts (default: env or 2)
    #[arg(long)]
    retry_delay_secs: Option<u64>,
    /// Load and normalize only; don't touch the database
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn build_config(datasets: &[Dataset], file: Option<PathBuf>, common: CommonArgs) -> Result<SeedConfig> {
    let jobs = plan_jobs(datasets, &common.data_dir, file)?;
    Ok(SeedConfig::from_env(jobs, common.dry_run).with_overrides(Overrides {
        db_url: common.db_url,
        attempts: common.attempts,
        retry_delay_secs: common.retry_delay_secs,
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_util::init_env();
    if let Err(err) = pantry_seed::tracing::init_tracing(pantry_seed::tracing::DEFAULT_FILTER) {
        eprintln!("{err}");
    }

    let cli = Cli::parse();
    let config = match cli.command {
        Commands::Items(a) => build_config(&[Dataset::Items], a.file, a.common),
        Commands::Categories(a) => build_config(&[Dataset::Categories], a.file, a.common),
        Commands::Versions(a) => build_config(&[Dataset::Versions], a.file, a.common),
        Commands::All(common) => build_config(&Dataset::ALL, None, common),
    };

    let result = match config {
        Ok(cfg) => run_seed(cfg).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
