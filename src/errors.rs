use scola_config::ConfigError;
use scola_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Failures surfaced to callers of [`crate::SchoolLedgerManager`].
#[derive(Debug, Error)]
pub enum SchoolError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The store could not be read while computing a report.
    #[error("Aggregation unavailable: {0}")]
    Aggregation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SchoolError {
    /// Re-labels a storage failure hit while reading for a report.
    pub fn into_aggregation(self) -> Self {
        match self {
            SchoolError::Storage(message) => SchoolError::Aggregation(message),
            other => other,
        }
    }
}

impl From<CoreError> for SchoolError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => SchoolError::NotFound(err.to_string()),
            ErrorKind::Validation => SchoolError::Validation(err.to_string()),
            ErrorKind::Storage => SchoolError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn core_errors_map_onto_taxonomy() {
        let err: SchoolError = CoreError::StudentNotFound(Uuid::nil()).into();
        assert!(matches!(err, SchoolError::NotFound(_)));
        let err: SchoolError = CoreError::Validation("amount".into()).into();
        assert!(matches!(err, SchoolError::Validation(_)));
        let err: SchoolError = CoreError::Serde("eof".into()).into();
        assert!(matches!(err.into_aggregation(), SchoolError::Aggregation(_)));
    }
}
