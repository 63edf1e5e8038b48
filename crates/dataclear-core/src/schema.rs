use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot of the clearable tables and the foreign keys between them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaSnapshot {
    /// Contract version for this snapshot format.
    pub schema_version: String,
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    pub database: Option<String>,
    /// Schema-qualified table keys (`schema.table`) in introspection order.
    pub tables: Vec<String>,
    /// Foreign-key pairs, child to parent, in introspection order.
    pub foreign_keys: Vec<ForeignKeyEdge>,
}

/// A single foreign key: rows of `from` reference rows of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyEdge {
    /// Constraint name when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referencing (child) table key.
    pub from: String,
    /// Referenced (parent) table key.
    pub to: String,
    /// What the database does to `from` rows when a referenced `to` row is deleted.
    #[serde(default)]
    pub on_delete: DeleteAction,
}

impl ForeignKeyEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: None,
            from: from.into(),
            to: to.into(),
            on_delete: DeleteAction::NoAction,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_delete(mut self, action: DeleteAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Referential action of a foreign key on delete of the referenced row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl DeleteAction {
    /// Decode `pg_constraint.confdeltype`.
    pub fn from_pg_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::NoAction),
            "r" => Some(Self::Restrict),
            "c" => Some(Self::Cascade),
            "n" => Some(Self::SetNull),
            "d" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// True when deleting a referenced row changes the referencing table
    /// instead of failing.
    pub fn rewrites_referencing_rows(self) -> bool {
        matches!(self, Self::Cascade | Self::SetNull | Self::SetDefault)
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Build the canonical `schema.table` key.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{schema}.{table}")
}

/// Split a `schema.table` key on its first dot.
pub fn split_table_name(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() => Ok((schema, table)),
        _ => Err(Error::InvalidTableName(key.to_string())),
    }
}

/// Render a table key as a quoted SQL identifier, preserving case.
pub fn quote_table_name(key: &str) -> Result<String> {
    let (schema, table) = split_table_name(key)?;
    Ok(format!("{}.{}", quote_ident(schema), quote_ident(table)))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
