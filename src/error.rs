//! Record Error Types

use thiserror::Error;

/// Error raised by the external execution boundary, passed through untouched.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised by record operations.
///
/// Every write operation validates before it issues a statement, so none of
/// these leave a partially written row behind.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Lookup or primary-key resolution cannot proceed
    #[error("Missing key: {message}")]
    MissingKey { message: String },

    /// A write or `set` targeted a column the table does not declare
    #[error("'{column}' is not a column in the {table} table")]
    ColumnNotInSchema { table: String, column: String },

    /// Validation failure (null not allowed, wrong format, enum membership, not stringable)
    #[error("Invalid value for column '{column}': {message}")]
    InvalidColumnValue { column: String, message: String },

    /// A date/datetime value could not be parsed at coercion time
    #[error("Value '{value}' for column '{column}' could not be converted to a date")]
    DateCoercion { column: String, value: String },

    /// The record type is misconfigured (e.g. no table name)
    #[error("Schema definition error: {0}")]
    SchemaDefinition(String),

    /// A write statement was handed to the read-only bulk loader
    #[error("The bulk loader cannot run {command} statements")]
    InvalidBulkQuery { command: String },

    /// The execution boundary failed
    #[error("Executor error: {0}")]
    Executor(#[source] ExecutorError),
}

impl RecordError {
    pub(crate) fn missing_key(message: impl Into<String>) -> Self {
        RecordError::MissingKey {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(column: &str, message: impl Into<String>) -> Self {
        RecordError::InvalidColumnValue {
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// Stable identifier for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::MissingKey { .. } => "MISSING_KEY",
            RecordError::ColumnNotInSchema { .. } => "COLUMN_NOT_IN_SCHEMA",
            RecordError::InvalidColumnValue { .. } => "INVALID_COLUMN_VALUE",
            RecordError::DateCoercion { .. } => "DATE_COERCION",
            RecordError::SchemaDefinition(_) => "SCHEMA_DEFINITION",
            RecordError::InvalidBulkQuery { .. } => "INVALID_BULK_QUERY",
            RecordError::Executor(_) => "EXECUTOR",
        }
    }
}
