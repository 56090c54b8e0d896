use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::config::{DbSettings, RetryPolicy};
use crate::database_ops::{upsert_entities, Dataset, Db};
use crate::loader::{load_export, Export};
use crate::normalization::{normalize_entity, Record};

/// One dataset and the export file it is seeded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedJob {
    pub dataset: Dataset,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub jobs: Vec<SeedJob>,
    pub settings: DbSettings,
    pub retry: RetryPolicy,
    /// Load and normalize only; never connect.
    pub dry_run: bool,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub db_url: Option<String>,
    pub attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
}

impl SeedConfig {
    /// Settings and retry policy from the environment.
    pub fn from_env(jobs: Vec<SeedJob>, dry_run: bool) -> Self {
        Self {
            jobs,
            settings: DbSettings::from_env(),
            retry: RetryPolicy::from_env(),
            dry_run,
        }
    }

    /// Apply flag values on top of whatever the environment resolved.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.db_url {
            self.settings.url_override = Some(url);
        }
        self.retry = RetryPolicy::new(
            overrides.attempts.unwrap_or(self.retry.max_attempts),
            overrides
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(self.retry.delay),
        );
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOutcome {
    pub dataset: Dataset,
    pub processed: usize,
}

/// Resolve export paths. `file` overrides the default name and is only
/// meaningful for a single dataset.
pub fn plan_jobs(datasets: &[Dataset], data_dir: &Path, file: Option<PathBuf>) -> Result<Vec<SeedJob>> {
    if file.is_some() && datasets.len() != 1 {
        bail!("--file can only be used when seeding a single dataset");
    }
    Ok(datasets
        .iter()
        .map(|&dataset| SeedJob {
            dataset,
            path: file
                .clone()
                .unwrap_or_else(|| data_dir.join(dataset.default_file())),
        })
        .collect())
}

/// Normalize every entity the way the upserter would, without touching a database.
pub fn normalize_export(dataset: Dataset, export: &Export) -> Vec<Record> {
    let floats = dataset.schema().whole_floats;
    export
        .data
        .iter()
        .map(|entity| normalize_entity(entity, floats))
        .collect()
}

/// Ensure the dataset's table and upsert every entity of the export.
pub async fn seed_dataset(db: &mut Db, dataset: Dataset, export: &Export) -> Result<usize> {
    let schema = dataset.schema();
    db.ensure_table(schema).await?;
    upsert_entities(db, schema, &export.data).await
}

pub async fn run(cfg: SeedConfig) -> Result<Vec<SeedOutcome>> {
    // Inputs first: a broken file shouldn't wait out the connection retries.
    let mut loaded: Vec<(Dataset, Export)> = Vec::with_capacity(cfg.jobs.len());
    for job in &cfg.jobs {
        let export = load_export(&job.path)?;
        info!(
            dataset = ?job.dataset,
            path = %job.path.display(),
            entities = export.data.len(),
            "export loaded"
        );
        loaded.push((job.dataset, export));
    }

    if cfg.dry_run {
        let mut outcomes = Vec::with_capacity(loaded.len());
        for (dataset, export) in &loaded {
            let records = normalize_export(*dataset, export);
            for record in &records {
                debug!(dataset = ?dataset, record = ?record, "normalized record");
            }
            println!("{} [dry run: nothing written]", dataset.summary(records.len()));
            outcomes.push(SeedOutcome {
                dataset: *dataset,
                processed: records.len(),
            });
        }
        return Ok(outcomes);
    }

    cfg.settings.log_snapshot();
    let mut db = Db::connect_with_retry(&cfg.settings, cfg.retry).await?;

    let mut outcomes = Vec::with_capacity(loaded.len());
    let mut failure = None;
    for (dataset, export) in &loaded {
        match seed_dataset(&mut db, *dataset, export).await {
            Ok(processed) => {
                println!("{}", dataset.summary(processed));
                outcomes.push(SeedOutcome {
                    dataset: *dataset,
                    processed,
                });
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    if let Err(err) = db.close().await {
        warn!(error = %err, "failed to close database session cleanly");
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(outcomes),
    }
}
