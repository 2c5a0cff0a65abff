//! Error taxonomy shared by the catalog, the grader and the binaries.

use uuid::Uuid;

use crate::types::GradingResult;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BankError {
    /// Missing or malformed request data, correctable by the caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Submitted code could not be executed to completion
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("problem not found: {0}")]
    NotFound(Uuid),

    /// Grading finished but the submission record was not saved
    #[error("graded but not recorded: {source}")]
    Persistence {
        result: Box<GradingResult>,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BankError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Persistence { .. } => "NOT_RECORDED",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Errors the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::UnsupportedLanguage(_) | Self::Execution(_)
        )
    }
}

impl From<validator::ValidationErrors> for BankError {
    fn from(err: validator::ValidationErrors) -> Self {
        BankError::InvalidInput(err.to_string())
    }
}

pub type BankResult<T> = Result<T, BankError>;
pub type StoreResult<T> = Result<T, StoreError>;
