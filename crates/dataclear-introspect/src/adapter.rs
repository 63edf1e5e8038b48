use async_trait::async_trait;

use dataclear_core::{Result, SchemaSnapshot};

use crate::options::IntrospectOptions;

/// Trait implemented by database adapters that can list tables and foreign keys.
#[async_trait]
pub trait Adapter {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Introspect the database and return a snapshot of tables and foreign keys.
    async fn introspect(&self, opts: &IntrospectOptions) -> Result<SchemaSnapshot>;
}
