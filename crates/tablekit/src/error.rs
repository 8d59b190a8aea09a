//! Error types for tablekit

use thiserror::Error;

/// Result type alias for tablekit operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// The target database does not exist on the server
    #[error("Database not found: {name}")]
    DatabaseNotFound { name: String },

    /// Creating a missing database failed
    #[error("Failed to create database '{name}': {message}")]
    DatabaseCreation { name: String, message: String },

    /// A bound value does not fit the declared column type
    #[error("Value type error on {table}.{column}: expected {expected}, got {found}")]
    ValueType {
        table: String,
        column: String,
        expected: String,
        found: String,
    },

    /// Table is not present in the schema cache
    #[error("No such table: {table}")]
    UnknownTable { table: String },

    /// Column is not present on the referenced table
    #[error("No such column: {table}.{column}")]
    UnknownColumn { table: String, column: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// NOT NULL constraint violation
    #[error("Not null violation: {0}")]
    NotNullViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Builder input rejected before reaching the database
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Stable short code for this error kind.
    ///
    /// The first four codes are the historical user-facing taxonomy
    /// (`DB001`..`DB004`) and must not be renumbered.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseNotFound { .. } => "DB001",
            Self::DatabaseCreation { .. } => "DB002",
            Self::ValueType { .. } => "DB003",
            Self::UnknownTable { .. } => "DB004",
            Self::UnknownColumn { .. } => "DB005",
            Self::Connection(_) => "DB100",
            Self::Query(_) => "DB101",
            Self::NotFound(_) => "DB102",
            Self::UniqueViolation(_) => "DB110",
            Self::ForeignKeyViolation(_) => "DB111",
            Self::CheckViolation(_) => "DB112",
            Self::NotNullViolation(_) => "DB113",
            Self::Decode { .. } => "DB120",
            Self::Validation(_) => "DB200",
            Self::Config(_) => "DB201",
            Self::Other(_) => "DB999",
        }
    }

    /// Check if this error was raised before anything was sent to the server
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::ValueType { .. }
                | Self::UnknownTable { .. }
                | Self::UnknownColumn { .. }
                | Self::Validation(_)
                | Self::Config(_)
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                "23502" => {
                    let column = db_err.column().unwrap_or("unknown");
                    return Self::NotNullViolation(format!("{column}: {message}"));
                }
                _ => {}
            }
        }
        Self::Query(err)
    }

    /// Map a connect-time error, recognising a missing database (SQLSTATE `3D000`).
    pub fn from_connect_error(err: tokio_postgres::Error, dbname: &str) -> Self {
        if let Some(db_err) = err.as_db_error() {
            if db_err.code().code() == "3D000" {
                return Self::DatabaseNotFound {
                    name: dbname.to_string(),
                };
            }
        }
        Self::Connection(err.to_string())
    }
}
