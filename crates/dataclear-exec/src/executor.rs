use async_trait::async_trait;

use crate::errors::ExecError;

/// Store operations a deletion plan needs.
///
/// Every clearing call happens between `begin` and `commit`/`rollback`.
/// Implementations must reset identity/sequence counters of cleared tables so
/// the result looks like a table that never had rows.
#[async_trait]
pub trait Executor: Send {
    async fn begin(&mut self) -> Result<(), ExecError>;

    async fn commit(&mut self) -> Result<(), ExecError>;

    async fn rollback(&mut self) -> Result<(), ExecError>;

    /// Remove every row of `table`.
    async fn delete_all_rows(&mut self, table: &str) -> Result<(), ExecError>;

    /// Remove every row of a group of mutually referencing tables at once.
    ///
    /// Referential checks among the members must not fail mid-operation;
    /// tables outside the group must never be touched.
    async fn delete_all_rows_group(&mut self, tables: &[String]) -> Result<(), ExecError>;
}
