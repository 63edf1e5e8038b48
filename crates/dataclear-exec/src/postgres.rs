use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use dataclear_core::{quote_table_name, split_table_name};

use crate::errors::ExecError;
use crate::executor::Executor;

/// Executor that clears PostgreSQL tables inside a single transaction.
///
/// Rows are removed with `DELETE` rather than `TRUNCATE`: `TRUNCATE` refuses
/// any table still referenced by a foreign key, even from an emptied table.
/// `CASCADE` is never used. Foreign-key delete actions still fire on other
/// tables; plans whose actions reach a kept table are refused by the planner.
pub struct PostgresExecutor {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>, ExecError> {
        self.tx
            .as_mut()
            .ok_or_else(|| ExecError::State("no open transaction".to_string()))
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ExecError> {
        let tx = self.transaction()?;
        sqlx::query(sql).execute(&mut **tx).await?;
        Ok(())
    }

    /// Restart every sequence owned by `table` (serial and identity columns).
    async fn restart_sequences(&mut self, table: &str) -> Result<(), ExecError> {
        let (schema, name) = split_table_name(table)?;
        let tx = self.transaction()?;

        let sequences = sqlx::query_scalar::<_, String>(
            r#"
            select format('%I.%I', seq_nsp.nspname, seq.relname)
            from pg_depend dep
            join pg_class seq on seq.oid = dep.objid
            join pg_namespace seq_nsp on seq_nsp.oid = seq.relnamespace
            join pg_class tbl on tbl.oid = dep.refobjid
            join pg_namespace tbl_nsp on tbl_nsp.oid = tbl.relnamespace
            where dep.classid = 'pg_class'::regclass
              and dep.refclassid = 'pg_class'::regclass
              and dep.deptype in ('a', 'i')
              and seq.relkind = 'S'
              and tbl_nsp.nspname = $1
              and tbl.relname = $2
            order by 1
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&mut **tx)
        .await?;

        for sequence in sequences {
            tracing::debug!(event = "sequence_restarted", table = %table, sequence = %sequence);
            self.execute(&format!("alter sequence {sequence} restart"))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn begin(&mut self) -> Result<(), ExecError> {
        if self.tx.is_some() {
            return Err(ExecError::State("transaction already open".to_string()));
        }
        let tx = self.pool.begin().await?;
        self.tx = Some(tx);
        // Deferrable constraints are checked once, at commit.
        self.execute("set constraints all deferred").await
    }

    async fn commit(&mut self) -> Result<(), ExecError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| ExecError::State("no open transaction".to_string()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), ExecError> {
        // A failed commit has already ended the transaction server-side.
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn delete_all_rows(&mut self, table: &str) -> Result<(), ExecError> {
        let sql = format!("delete from {}", quote_table_name(table)?);
        self.execute(&sql).await?;
        self.restart_sequences(table).await
    }

    async fn delete_all_rows_group(&mut self, tables: &[String]) -> Result<(), ExecError> {
        let sql = group_delete_statement(tables)?;
        self.execute(&sql).await?;
        for table in tables {
            self.restart_sequences(table).await?;
        }
        Ok(())
    }
}

/// One statement deleting from every member through data-modifying CTEs.
///
/// Non-deferred foreign keys are checked at the end of the statement, after
/// all members are empty, so references among the members cannot fail.
fn group_delete_statement(tables: &[String]) -> Result<String, ExecError> {
    let quoted = tables
        .iter()
        .map(|table| quote_table_name(table))
        .collect::<Result<Vec<_>, _>>()?;

    let Some((last, rest)) = quoted.split_last() else {
        return Err(ExecError::Other("group step has no tables".to_string()));
    };

    if rest.is_empty() {
        return Ok(format!("delete from {last}"));
    }

    let ctes: Vec<String> = rest
        .iter()
        .enumerate()
        .map(|(idx, table)| format!("clear_{idx} as (delete from {table})"))
        .collect();
    Ok(format!("with {} delete from {last}", ctes.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_member_group_is_a_plain_delete() {
        let sql = group_delete_statement(&["app.tree".to_string()]).unwrap();
        assert_eq!(sql, r#"delete from "app"."tree""#);
    }

    #[test]
    fn group_statement_deletes_every_member_at_once() {
        let sql = group_delete_statement(&[
            "app.carts".to_string(),
            "app.cart_lines".to_string(),
            "App.Promos".to_string(),
        ])
        .unwrap();
        assert_eq!(
            sql,
            r#"with clear_0 as (delete from "app"."carts"), clear_1 as (delete from "app"."cart_lines") delete from "App"."Promos""#
        );
    }

    #[test]
    fn rejects_empty_and_unqualified_groups() {
        assert!(group_delete_statement(&[]).is_err());
        assert!(group_delete_statement(&["carts".to_string()]).is_err());
    }
}
