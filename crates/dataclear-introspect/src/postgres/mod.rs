use sqlx::PgPool;

use dataclear_core::{Result, SNAPSHOT_VERSION, SchemaSnapshot};

use crate::adapter::Adapter;
use crate::options::IntrospectOptions;

mod mapper;
mod queries;

/// Adapter for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn introspect(&self, opts: &IntrospectOptions) -> Result<SchemaSnapshot> {
        introspect(&self.pool, opts).await
    }
}

/// Introspect Postgres with default options.
pub async fn introspect_postgres(pool: &PgPool) -> Result<SchemaSnapshot> {
    introspect_postgres_with_options(pool, IntrospectOptions::default()).await
}

/// Introspect Postgres with caller-provided options.
pub async fn introspect_postgres_with_options(
    pool: &PgPool,
    opts: IntrospectOptions,
) -> Result<SchemaSnapshot> {
    introspect(pool, &opts).await
}

/// List tables of every selected schema and the foreign keys touching them.
///
/// Foreign keys between a selected schema and one that was filtered out are
/// reported in both directions. Keys out of the selection are dropped from
/// the graph, while keys into it still carry their delete action.
pub async fn introspect(pool: &PgPool, opts: &IntrospectOptions) -> Result<SchemaSnapshot> {
    let database = queries::fetch_database_name(pool).await?;
    let schemas = mapper::filter_schemas(queries::list_schemas(pool).await?, opts);

    let mut tables = Vec::new();

    for schema_name in &schemas {
        let raw_tables = queries::list_tables_in_schema(pool, schema_name).await?;
        tables.extend(mapper::map_tables(schema_name, raw_tables));
    }
    let foreign_keys =
        mapper::map_foreign_keys(&schemas, queries::list_foreign_keys(pool).await?);

    tracing::debug!(
        event = "introspection_summary",
        schemas = schemas.len(),
        tables = tables.len(),
        foreign_keys = foreign_keys.len()
    );

    Ok(SchemaSnapshot {
        schema_version: SNAPSHOT_VERSION.to_string(),
        engine: "postgres".to_string(),
        database: Some(database),
        tables,
        foreign_keys,
    })
}
