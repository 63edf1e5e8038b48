//! Transactional execution of deletion plans.
//!
//! The runner drives any [`Executor`]; [`PostgresExecutor`] is the sqlx-backed
//! implementation used by the CLI.

pub mod errors;
pub mod executor;
pub mod postgres;
pub mod runner;

pub use errors::{ExecError, ExecutionError, ExecutionPhase};
pub use executor::Executor;
pub use postgres::PostgresExecutor;
pub use runner::{RunSummary, run};
