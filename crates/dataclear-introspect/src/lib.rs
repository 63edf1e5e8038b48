//! Database introspection adapters.
//!
//! Adapters list the clearable tables of a database and the foreign keys
//! between them; everything else about the schema is irrelevant to planning.

pub mod adapter;
pub mod options;
pub mod postgres;

pub use adapter::Adapter;
pub use options::IntrospectOptions;
pub use postgres::{PostgresAdapter, introspect_postgres, introspect_postgres_with_options};

pub use dataclear_core::SchemaSnapshot;
