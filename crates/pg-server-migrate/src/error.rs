//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration errors (missing flags, invalid YAML, bad values).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when a server connection cannot be established.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for database errors outside of per-object processing.
pub const EXIT_DATABASE_ERROR: u8 = 3;
/// Exit code when the source catalog cannot be enumerated.
pub const EXIT_CATALOG_ERROR: u8 = 4;
/// Exit code for dump/restore tool failures surfaced to the top level.
pub const EXIT_DUMP_RESTORE_ERROR: u8 = 5;
/// Exit code for a run that aborted before finishing its phases.
pub const EXIT_ABORTED: u8 = 6;
/// Exit code for filesystem errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query or statement error reported by either server
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Could not connect to the source or destination server
    #[error("Failed to connect to {server} server: {message}")]
    Connect { server: String, message: String },

    /// Source catalog could not be read
    #[error("Catalog query failed: {0}")]
    Catalog(String),

    /// pg_dump failed for a database
    #[error("Dump failed for database {database}: {message}")]
    Dump { database: String, message: String },

    /// pg_restore failed for a database
    #[error("Restore failed for database {database}: {message}")]
    Restore { database: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A migration phase stopped before processing its objects
    #[error("Migration aborted: {0}")]
    Aborted(String),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Connect error for the named server ("source" or "destination")
    pub fn connect(server: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Connect {
            server: server.into(),
            message: message.to_string(),
        }
    }

    /// Create a Dump error
    pub fn dump(database: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Dump {
            database: database.into(),
            message: message.into(),
        }
    }

    /// Create a Restore error
    pub fn restore(database: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Restore {
            database: database.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Pool { .. } | MigrateError::Connect { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Database(_) => EXIT_DATABASE_ERROR,
            MigrateError::Catalog(_) => EXIT_CATALOG_ERROR,
            MigrateError::Dump { .. } | MigrateError::Restore { .. } => EXIT_DUMP_RESTORE_ERROR,
            MigrateError::Aborted(_) => EXIT_ABORTED,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
