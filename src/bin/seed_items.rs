//! Seeds `items` from the default export in the working directory, configured
//! purely through the environment.
use pantry_seed::{plan_jobs, run_seed, Dataset, SeedConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    pantry_seed::util::env::init_env();
    if let Err(err) = pantry_seed::tracing::init_tracing(pantry_seed::tracing::DEFAULT_FILTER) {
        eprintln!("{err}");
    }

    let result = async {
        let jobs = plan_jobs(&[Dataset::Items], std::path::Path::new("."), None)?;
        let cfg = SeedConfig::from_env(jobs, false);
        run_seed(cfg).await
    }
    .await;

    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
