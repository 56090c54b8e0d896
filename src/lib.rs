pub mod cli;
pub mod config;
pub mod database_ops;
pub mod loader;
pub mod normalization;
pub mod tracing;

pub mod util {
    pub mod env;
}

pub use cli::seed::{plan_jobs, run as run_seed, Overrides, SeedConfig, SeedJob, SeedOutcome};
pub use config::{DbSettings, RetryPolicy};
pub use database_ops::Dataset;
