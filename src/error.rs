// 🚨 Errors - import pipeline taxonomy
// Fatal errors abort a run and come back to the caller as `Err`. Local errors
// are recovered by the orchestrator and recorded in the `ImportReport`.

use crate::entities::EntityKind;
use thiserror::Error;

/// Result type used across the library
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Payload is not well-formed JSON (fatal)
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Well-formed, but required structure or identity fields are absent (fatal)
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A present-but-blank source identifier (local)
    #[error("missing identity for {kind}")]
    MissingIdentity { kind: EntityKind },

    /// A child record carried a decimal field that does not parse (local)
    #[error("invalid decimal in {field}: {value:?}")]
    InvalidDecimal { field: String, value: String },

    /// A record field had the wrong JSON type or was missing (local)
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: EntityKind, reason: String },

    /// The same natural key appeared twice inside one export (local)
    #[error("duplicate {kind} identifier {source_id:?}")]
    DuplicateIdentity { kind: EntityKind, source_id: String },

    /// Durable medium could not be opened, read or written (fatal)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Deadline passed or the caller cancelled the run (fatal)
    #[error("import cancelled")]
    Cancelled,

    /// Configuration file could not be read or parsed (fatal)
    #[error("configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// Fatal errors end the run with no report
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ImportError::MissingIdentity { .. }
                | ImportError::InvalidDecimal { .. }
                | ImportError::InvalidRecord { .. }
                | ImportError::DuplicateIdentity { .. }
        )
    }

    /// Stable short name, used in rendered reports and logs
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MalformedInput(_) => "MalformedInput",
            ImportError::SchemaMismatch(_) => "SchemaMismatch",
            ImportError::MissingIdentity { .. } => "MissingIdentity",
            ImportError::InvalidDecimal { .. } => "InvalidDecimal",
            ImportError::InvalidRecord { .. } => "InvalidRecord",
            ImportError::DuplicateIdentity { .. } => "DuplicateIdentity",
            ImportError::StoreUnavailable(_) => "StoreUnavailable",
            ImportError::Cancelled => "Cancelled",
            ImportError::Config(_) => "Config",
        }
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ImportError::MalformedInput("x".into()).is_fatal());
        assert!(ImportError::SchemaMismatch("x".into()).is_fatal());
        assert!(ImportError::StoreUnavailable("x".into()).is_fatal());
        assert!(ImportError::Cancelled.is_fatal());

        assert!(!ImportError::MissingIdentity {
            kind: EntityKind::Transaction
        }
        .is_fatal());
        assert!(!ImportError::InvalidRecord {
            kind: EntityKind::Transaction,
            reason: "invalid type: null, expected a string".into(),
        }
        .is_fatal());
        assert!(!ImportError::DuplicateIdentity {
            kind: EntityKind::Holding,
            source_id: "h1".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_sqlite_errors_become_store_unavailable() {
        let err: ImportError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.code(), "StoreUnavailable");
    }

    #[test]
    fn test_display_names_entity_kind() {
        let err = ImportError::MissingIdentity {
            kind: EntityKind::Account,
        };
        assert_eq!(err.to_string(), "missing identity for account");
    }
}
