use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::{SchemaSnapshot, split_table_name};

/// Validate internal consistency of a schema snapshot.
///
/// Table keys must be schema-qualified and unique, and both ends of every
/// foreign key must be schema-qualified.
///
/// Either end of a foreign key may lie outside the snapshot. Keys declared
/// by tables of other schemas still matter when they point into it.
pub fn validate_snapshot(snapshot: &SchemaSnapshot) -> Result<()> {
    let mut seen = BTreeSet::new();
    for table in &snapshot.tables {
        split_table_name(table)?;
        if !seen.insert(table.as_str()) {
            return Err(Error::InvalidSchema(format!("duplicate table name: {table}")));
        }
    }

    for fk in &snapshot.foreign_keys {
        split_table_name(&fk.from)?;
        split_table_name(&fk.to)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKeyEdge;

    fn snapshot(tables: &[&str], fks: Vec<ForeignKeyEdge>) -> SchemaSnapshot {
        SchemaSnapshot {
            schema_version: crate::SNAPSHOT_VERSION.to_string(),
            engine: "postgres".to_string(),
            database: None,
            tables: tables.iter().map(|table| table.to_string()).collect(),
            foreign_keys: fks,
        }
    }

    #[test]
    fn accepts_cross_schema_targets() {
        let snap = snapshot(
            &["app.orders"],
            vec![ForeignKeyEdge::new("app.orders", "billing.accounts")],
        );
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn rejects_duplicates_and_unqualified_names() {
        assert!(validate_snapshot(&snapshot(&["app.a", "app.a"], Vec::new())).is_err());
        assert!(validate_snapshot(&snapshot(&["a"], Vec::new())).is_err());
    }

    #[test]
    fn accepts_referencing_tables_outside_the_snapshot() {
        let snap = snapshot(
            &["app.users"],
            vec![ForeignKeyEdge::new("audit.log", "app.users")],
        );
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn rejects_unqualified_foreign_key_ends() {
        let snap = snapshot(&["app.a"], vec![ForeignKeyEdge::new("b", "app.a")]);
        let err = validate_snapshot(&snap).unwrap_err();
        assert!(matches!(err, Error::InvalidTableName(ref key) if key == "b"));
    }
}
