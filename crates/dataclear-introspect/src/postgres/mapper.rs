use dataclear_core::{DeleteAction, ForeignKeyEdge, table_key};

use crate::options::IntrospectOptions;

use super::queries::{RawForeignKey, RawTable};

pub fn filter_schemas(raw: Vec<String>, opts: &IntrospectOptions) -> Vec<String> {
    raw.into_iter()
        .filter(|schema| {
            let is_system = is_system_schema(schema);
            match &opts.schemas {
                Some(list) => list.iter().any(|item| item == schema),
                None => opts.include_system_schemas || !is_system,
            }
        })
        .collect()
}

fn is_system_schema(schema: &str) -> bool {
    schema.starts_with("pg_") || schema == "information_schema"
}

/// Map raw tables to schema-qualified keys. Partitions are cleared through
/// their parent table and are left out.
pub fn map_tables(schema: &str, raw: Vec<RawTable>) -> Vec<String> {
    raw.into_iter()
        .filter(|table| !table.is_partition)
        .map(|table| table_key(schema, &table.name))
        .collect()
}

/// Keep the foreign keys that touch a selected schema at either end.
///
/// Keys declared in other schemas matter when they point into a selected
/// one: their delete action runs when the referenced rows are cleared.
pub fn map_foreign_keys(schemas: &[String], raw: Vec<RawForeignKey>) -> Vec<ForeignKeyEdge> {
    raw.into_iter()
        .filter(|fk| schemas.contains(&fk.schema) || schemas.contains(&fk.referenced_schema))
        .map(|fk| {
            let on_delete = DeleteAction::from_pg_code(&fk.on_delete).unwrap_or_else(|| {
                tracing::warn!(
                    event = "unknown_delete_action",
                    constraint = %fk.name,
                    code = %fk.on_delete
                );
                DeleteAction::NoAction
            });
            ForeignKeyEdge::new(
                table_key(&fk.schema, &fk.table),
                table_key(&fk.referenced_schema, &fk.referenced_table),
            )
            .named(fk.name)
            .on_delete(on_delete)
        })
        .collect()
}
