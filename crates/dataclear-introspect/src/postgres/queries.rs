use sqlx::PgPool;

use dataclear_core::Result;

fn db_error(err: sqlx::Error) -> dataclear_core::Error {
    dataclear_core::Error::Db(err.to_string())
}

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()::text")
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

pub async fn list_schemas(pool: &PgPool) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select nspname::text
        from pg_namespace
        order by nspname
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub struct RawTable {
    pub name: String,
    pub is_partition: bool,
}

/// Ordinary and partitioned tables of a schema, ordered by name.
pub async fn list_tables_in_schema(pool: &PgPool, schema: &str) -> Result<Vec<RawTable>> {
    let rows = sqlx::query_as::<_, (String, bool)>(
        r#"
        select
          c.relname::text,
          c.relispartition
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r','p')
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    Ok(rows
        .into_iter()
        .map(|(name, is_partition)| RawTable { name, is_partition })
        .collect())
}

pub struct RawForeignKey {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    /// `pg_constraint.confdeltype`.
    pub on_delete: String,
}

/// Every foreign key of the database, ordered by referencing table and
/// constraint name.
///
/// Both ends are reported on their partition root, so a key declared directly
/// on a partition shows up on the table that gets cleared. Constraints cloned
/// onto partitions (`conparentid <> 0`) are skipped; the parent constraint
/// already describes the dependency.
pub async fn list_foreign_keys(pool: &PgPool) -> Result<Vec<RawForeignKey>> {
    let rows = sqlx::query_as::<_, (String, String, String, String, String, String)>(
        r#"
        select
          con.conname::text,
          src_nsp.nspname::text,
          src_rel.relname::text,
          ref_nsp.nspname::text,
          ref_rel.relname::text,
          con.confdeltype::text
        from pg_constraint con
        join pg_class src_rel
          on src_rel.oid = coalesce(pg_partition_root(con.conrelid)::oid, con.conrelid)
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel
          on ref_rel.oid = coalesce(pg_partition_root(con.confrelid)::oid, con.confrelid)
        join pg_namespace ref_nsp on ref_nsp.oid = ref_rel.relnamespace
        where con.contype = 'f'
          and con.conparentid = 0
        order by src_nsp.nspname, src_rel.relname, con.conname
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    Ok(rows
        .into_iter()
        .map(
            |(name, schema, table, referenced_schema, referenced_table, on_delete)| RawForeignKey {
                name,
                schema,
                table,
                referenced_schema,
                referenced_table,
                on_delete,
            },
        )
        .collect())
}
