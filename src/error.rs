use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlMapperError {
    #[error("Metadata error: {0}")]
    MetadataError(String),

    #[error("Mapping error on {entity}.{field}: {message}")]
    MappingError {
        entity: String,
        field: String,
        message: String,
    },

    #[error("Assembly error: {0}")]
    AssemblyError(#[from] AssemblyFailure),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Command was cancelled")]
    Cancelled,

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

/// Structural problems found while assembling an object graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyFailure {
    #[error("result table {index} is missing (command returned {available})")]
    MissingTable { index: usize, available: usize },

    #[error("missing parent: no {entity} row in the parent table")]
    MissingParent { entity: String },

    #[error("field `{field}` does not exist on {entity}")]
    MissingField { entity: String, field: String },

    #[error("duplicate key {key} in {entity}.{field}")]
    DuplicateKey {
        entity: String,
        field: String,
        key: String,
    },

    #[error("dangling reference: no {entity} with {field} = {key}")]
    DanglingReference {
        entity: String,
        field: String,
        key: String,
    },
}

impl SqlMapperError {
    pub(crate) fn metadata(message: impl Into<String>) -> Self {
        SqlMapperError::MetadataError(message.into())
    }

    pub(crate) fn mapping(entity: &str, field: &str, message: impl Into<String>) -> Self {
        SqlMapperError::MappingError {
            entity: entity.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The assembly failure carried by this error, if any.
    #[must_use]
    pub fn assembly_failure(&self) -> Option<&AssemblyFailure> {
        if let SqlMapperError::AssemblyError(failure) = self {
            Some(failure)
        } else {
            None
        }
    }
}
