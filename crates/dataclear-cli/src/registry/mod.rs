//! Per-invocation artifacts under `<run_dir>/<timestamp>__run_<uuid>/`:
//! `config.json`, `logs.ndjson`, `plan.json` and `outcome.json`.

mod logging;
mod run;

pub use logging::init_run_logging;
pub use run::{
    RunContext, RunOptions, RunOutcome, RunPaths, RunStatus, start_run, write_outcome, write_plan,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not write run artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode run artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not install log subscriber: {0}")]
    Logging(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
