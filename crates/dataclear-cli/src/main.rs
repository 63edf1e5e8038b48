mod config;
mod registry;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use config::{CliOverrides, ConfigError, Settings, load_config, resolve_settings};
use dataclear_core::{
    Error as CoreError, FkGraph, build_fk_graph_report, redact_connection_string,
    validate_snapshot,
};
use dataclear_exec::{ExecutionError, PostgresExecutor, run};
use dataclear_introspect::{IntrospectOptions, introspect_postgres_with_options};
use dataclear_plan::{
    ConflictError, DeletionPlan, PLAN_VERSION, PlanError, ProtectedSet, ValidationReport, plan,
    validate_plan,
};
use registry::{
    RunContext, RunOptions, RunOutcome, RunPaths, RunStatus, init_run_logging, start_run,
    write_outcome, write_plan,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("refusing to plan: {0}; {}", .0.hint())]
    Conflict(#[from] ConflictError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("saved plan rejected: {}", summarize_report(.0))]
    InvalidPlan(ValidationReport),
    #[error("{0}")]
    Execution(#[from] ExecutionError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(
    name = "dataclear",
    version,
    about = "Clear database tables in foreign-key order"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and print a deletion plan without touching any data.
    Plan(TargetArgs),
    /// Build (or load) a plan, confirm, then delete every row it covers.
    Clear(ClearArgs),
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Database connection string (flag form).
    #[arg(long, value_name = "CONNECTION_STRING", conflicts_with = "conn_pos")]
    conn: Option<String>,
    /// Database connection string (positional form).
    #[arg(value_name = "CONNECTION_STRING")]
    conn_pos: Option<String>,
    /// Table to keep; bare names match in every schema. Repeatable.
    #[arg(long, value_name = "TABLE")]
    keep: Vec<String>,
    /// Schema name(s) to include.
    #[arg(long, value_name = "SCHEMA")]
    schema: Vec<String>,
    /// Include system schemas such as pg_catalog.
    #[arg(long, default_value_t = false)]
    include_system_schemas: bool,
    /// Config file (defaults to ./dataclear.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Optional output path for plan.json.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClearArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Skip the confirmation prompt.
    #[arg(long, default_value_t = false)]
    yes: bool,
    /// Execute a previously saved plan.json instead of planning afresh.
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,
}

/// Everything shared by `plan` and `clear` once the schema has been read.
struct Session {
    paths: RunPaths,
    pool: PgPool,
    graph: FkGraph,
    protected: ProtectedSet,
    out: Option<PathBuf>,
    timer: Instant,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => run_plan(args).await,
        Command::Clear(args) => run_clear(args).await,
    }
}

async fn run_plan(args: TargetArgs) -> Result<(), CliError> {
    let session = open_session("plan", args, None, false).await?;
    let plan = build_plan(&session)?;

    write_plan(&session.paths, &plan, session.out.as_deref())?;
    tracing::info!(event = "plan_written", path = %session.paths.plan_path.display());
    print!("{}", plan.render());

    finish(&session, &plan, RunStatus::Planned, None)
}

async fn run_clear(args: ClearArgs) -> Result<(), CliError> {
    let ClearArgs {
        target,
        yes,
        plan: plan_file,
    } = args;
    let session = open_session("clear", target, plan_file.clone(), yes).await?;

    let plan = match plan_file {
        Some(path) => load_saved_plan(&session, &path)?,
        None => build_plan(&session)?,
    };

    write_plan(&session.paths, &plan, session.out.as_deref())?;
    print!("{}", plan.render());

    if plan.is_empty() {
        println!("Nothing to clear.");
        return finish(&session, &plan, RunStatus::NothingToClear, None);
    }

    if !yes && !confirm(&plan)? {
        println!("Aborted; nothing was deleted.");
        tracing::info!(event = "confirmation_declined");
        return finish(&session, &plan, RunStatus::Aborted, None);
    }

    let mut executor = PostgresExecutor::new(session.pool.clone());
    match run(&plan, &mut executor).await {
        Ok(summary) => {
            println!(
                "Cleared {} table(s) in {} step(s).",
                summary.tables, summary.steps
            );
            finish(&session, &plan, RunStatus::Committed, None)
        }
        Err(err) => {
            finish(&session, &plan, RunStatus::RolledBack, Some(&err))?;
            Err(err.into())
        }
    }
}

async fn open_session(
    command: &str,
    args: TargetArgs,
    plan_file: Option<PathBuf>,
    assume_yes: bool,
) -> Result<Session, CliError> {
    let TargetArgs {
        conn,
        conn_pos,
        keep,
        schema,
        include_system_schemas,
        config,
        run_dir,
        out,
    } = args;

    let file = load_config(config.as_deref())?;
    let settings = resolve_settings(
        CliOverrides {
            conn,
            conn_pos,
            keep,
            schemas: schema,
            include_system_schemas,
            run_dir,
        },
        file,
        std::env::var("DATABASE_URL").ok(),
    )?;

    let engine = detect_engine(&settings.connection)?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: command.to_string(),
        engine: engine.to_string(),
        plan_version: PLAN_VERSION.to_string(),
        run_dir: settings.run_dir.clone(),
        options: RunOptions {
            keep: settings.keep.clone(),
            schemas: settings.schemas.clone(),
            include_system_schemas: settings.include_system_schemas,
            plan_file,
            assume_yes,
        },
        connection: redact_connection_string(&settings.connection),
    };

    let paths = start_run(&run_ctx)?;
    init_run_logging(&paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, command = %command);
    tracing::info!(event = "engine_detected", engine = %engine);

    let timer = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&settings.connection)
        .await?;

    let graph = introspect_graph(&pool, &settings).await?;
    let protected = ProtectedSet::new(&settings.keep);

    Ok(Session {
        paths,
        pool,
        graph,
        protected,
        out,
        timer,
    })
}

async fn introspect_graph(pool: &PgPool, settings: &Settings) -> Result<FkGraph, CliError> {
    tracing::info!(event = "introspection_started");

    let options = IntrospectOptions {
        include_system_schemas: settings.include_system_schemas,
        schemas: if settings.schemas.is_empty() {
            None
        } else {
            Some(settings.schemas.clone())
        },
    };
    let snapshot = introspect_postgres_with_options(pool, options).await?;
    validate_snapshot(&snapshot)?;

    tracing::info!(
        event = "introspection_finished",
        tables = snapshot.tables.len(),
        foreign_keys = snapshot.foreign_keys.len()
    );

    let graph = FkGraph::from_snapshot(&snapshot);
    let report = build_fk_graph_report(&graph);
    tracing::info!(
        event = "graph_analyzed",
        nodes = report.summary.nodes,
        edges = report.summary.edges,
        self_references = report.summary.self_references,
        cycles = report.cycles.len()
    );
    for cycle in &report.cycles {
        tracing::info!(event = "cycle_found", tables = ?cycle);
    }

    Ok(graph)
}

fn build_plan(session: &Session) -> Result<DeletionPlan, CliError> {
    match plan(&session.graph, &session.protected) {
        Ok(plan) => Ok(plan),
        Err(conflict) => {
            record_failure(session, RunStatus::Conflict, conflict.to_string())?;
            Err(conflict.into())
        }
    }
}

fn load_saved_plan(session: &Session, path: &Path) -> Result<DeletionPlan, CliError> {
    let content = std::fs::read_to_string(path)?;
    let plan_json: serde_json::Value = serde_json::from_str(&content).map_err(PlanError::from)?;

    match validate_plan(&plan_json, &session.graph, &session.protected) {
        Ok(validated) => {
            for issue in &validated.warnings {
                tracing::warn!(event = "plan_warning", code = %issue.code, message = %issue.message);
            }
            tracing::info!(event = "plan_loaded", path = %path.display());
            Ok(validated.plan)
        }
        Err(report) => {
            for issue in &report.errors {
                tracing::error!(
                    event = "plan_rejected",
                    code = %issue.code,
                    path = %issue.path,
                    message = %issue.message
                );
            }
            record_failure(session, RunStatus::InvalidPlan, summarize_report(&report))?;
            Err(CliError::InvalidPlan(report))
        }
    }
}

fn record_failure(session: &Session, status: RunStatus, error: String) -> Result<(), CliError> {
    let duration_ms = session.timer.elapsed().as_millis();
    write_outcome(
        &session.paths,
        &RunOutcome {
            status,
            steps: 0,
            tables: 0,
            failed_step: None,
            error: Some(error),
            duration_ms,
        },
    )?;
    tracing::info!(event = "run_finished", status = ?status, duration_ms = duration_ms);
    Ok(())
}

fn finish(
    session: &Session,
    plan: &DeletionPlan,
    status: RunStatus,
    failure: Option<&ExecutionError>,
) -> Result<(), CliError> {
    let duration_ms = session.timer.elapsed().as_millis();
    write_outcome(
        &session.paths,
        &RunOutcome {
            status,
            steps: plan.steps.len(),
            tables: plan.table_count(),
            failed_step: failure.and_then(|err| err.failed_step).map(|idx| idx + 1),
            error: failure.map(ToString::to_string),
            duration_ms,
        },
    )?;
    tracing::info!(event = "run_finished", status = ?status, duration_ms = duration_ms);
    Ok(())
}

fn confirm(plan: &DeletionPlan) -> Result<bool, CliError> {
    let mut stderr = io::stderr();
    write!(
        stderr,
        "Type 'yes' to delete every row of {} table(s): ",
        plan.table_count()
    )?;
    stderr.flush()?;
    Ok(read_confirmation(io::stdin().lock())?)
}

fn read_confirmation<R: BufRead>(mut reader: R) -> io::Result<bool> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim() == "yes")
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}

fn summarize_report(report: &ValidationReport) -> String {
    report
        .errors
        .iter()
        .map(|issue| format!("{} at {}: {}", issue.code, issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}
