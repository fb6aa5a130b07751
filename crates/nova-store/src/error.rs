use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection string could be resolved, or persistence was never
    /// configured for this process.
    #[error("{0}")]
    Configuration(String),

    /// The connection string names a database this build has no driver for.
    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Initial pool construction ran out of attempts.
    #[error("Could not initialize database connection pool after {attempts} attempts")]
    PersistenceUnavailable {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// The pool was shut down while a session was being acquired.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A blocking database task panicked or was cancelled.
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Stable short code for logs. Configuration problems and an unreachable
    /// database never share a code.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Configuration(_) | StoreError::UnsupportedScheme(_) => {
                "configuration_error"
            }
            StoreError::PersistenceUnavailable { .. } => "persistence_unavailable",
            StoreError::PoolClosed => "pool_closed",
            StoreError::Sqlite(_) => "database_error",
            StoreError::NotFound => "not_found",
            StoreError::Migration(_) => "migration_error",
            StoreError::Task(_) => "task_failed",
            StoreError::Io(_) => "io_error",
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == "configuration_error"
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
