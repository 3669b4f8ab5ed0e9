use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("A {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("An animal tagged '{0}' already exists")]
    DuplicateTag(String),

    #[error("{kind} {id} belongs to another owner")]
    CrossTenant { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),
}

impl EngineError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    /// True for failures caused by the caller's input rather than the store
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            StoreError::DuplicateName { kind, name } => EngineError::DuplicateName { kind, name },
            StoreError::DuplicateTag(tag) => EngineError::DuplicateTag(tag),
            StoreError::DuplicatePrice { date, category } => EngineError::DuplicateName {
                kind: "market price",
                name: format!("{} on {}", category, date),
            },
            other => EngineError::Store(other),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Store(StoreError::Sqlite(err))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_meaning() {
        let err: EngineError = StoreError::not_found("field", "f-1234567").into();
        assert!(matches!(err, EngineError::NotFound { kind: "field", .. }));

        let err: EngineError = StoreError::DuplicateTag("A1".to_string()).into();
        assert_eq!(err.to_string(), "An animal tagged 'A1' already exists");
        assert!(err.is_rejection());

        let err: EngineError = rusqlite::Error::InvalidQuery.into();
        assert!(!err.is_rejection());
    }
}
