use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Catalog query failed; adapters flatten driver errors into text.
    #[error("database error: {0}")]
    Db(String),
    /// A snapshot that cannot be planned, such as one listing a table twice.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A table key that is not `schema.table`.
    #[error("invalid table name '{0}': expected schema.table")]
    InvalidTableName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
