pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Cannot serialize structured column {column}: {source}")]
    ColumnEncodeError {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
