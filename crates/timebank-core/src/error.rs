//! Error kinds surfaced by the ledger, exchange lifecycle and storage layers

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::exchange::ExchangeStatus;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("invalid duration {requested}h: {reason}")]
    InvalidDuration { requested: i64, reason: String },

    #[error("insufficient credits for user {user_id}: needs {needed}, has {available}")]
    InsufficientCredits {
        user_id: String,
        needed: i64,
        available: i64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("cannot move exchange from {from} to {to}")]
    InvalidTransition {
        from: ExchangeStatus,
        to: ExchangeStatus,
    },

    #[error("concurrent update on {0}; retry the request")]
    ConcurrentUpdateConflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDuration { .. } => "INVALID_DURATION",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ConcurrentUpdateConflict(_) => "CONCURRENT_UPDATE_CONFLICT",
            Self::Validation(_) => "BAD_REQUEST",
            Self::Storage(_) | Self::Io(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentUpdateConflict(_))
    }
}

impl From<rusqlite::Error> for MarketError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::ConcurrentUpdateConflict(err.to_string())
            }
            _ => Self::Storage(err),
        }
    }
}
