//! Core contracts and helpers for dataclear.
//!
//! This crate defines the schema snapshot consumed by the planner, the
//! foreign-key graph with its cycle and ordering algorithms, and utilities
//! shared across adapters and the CLI.

pub mod error;
pub mod graph;
pub mod order;
pub mod redaction;
pub mod scc;
pub mod schema;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use graph::{FkGraph, FkGraphReport, FkGraphSummary, build_fk_graph_report};
pub use order::{TopoOrder, plan_acyclic};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use scc::{Component, find_components};
pub use schema::{
    DeleteAction, ForeignKeyEdge, SchemaSnapshot, quote_table_name, split_table_name, table_key,
};
pub use validation::validate_snapshot;

/// Current contract version for snapshot and plan artifacts.
pub const SNAPSHOT_VERSION: &str = "0.1";
