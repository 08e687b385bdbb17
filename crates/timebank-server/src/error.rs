//! Unified error handling for the API

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use timebank_core::MarketError;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
    Market(MarketError),
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            AppError::Market(err) => {
                let status = match &err {
                    MarketError::InvalidDuration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    MarketError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
                    MarketError::NotFound { .. } => StatusCode::NOT_FOUND,
                    MarketError::InvalidTransition { .. }
                    | MarketError::ConcurrentUpdateConflict(_) => StatusCode::CONFLICT,
                    MarketError::Validation(_) => StatusCode::BAD_REQUEST,
                    MarketError::Storage(_) | MarketError::Io(_) => {
                        tracing::error!("Storage error: {:?}", err);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            err.code(),
                            "internal storage error".to_string(),
                        );
                    }
                };
                (status, err.code(), err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        (
            status,
            Json(ApiError {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        if err.is_retryable() {
            tracing::warn!(code = err.code(), "Request lost a write race: {}", err);
        }
        AppError::Market(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timebank_core::ExchangeStatus;

    fn status_and_code(err: AppError) -> (StatusCode, &'static str) {
        let (status, code, _) = err.parts();
        (status, code)
    }

    #[test]
    fn test_market_errors_map_to_status_codes() {
        assert_eq!(
            status_and_code(
                MarketError::InvalidDuration {
                    requested: 0,
                    reason: "too short".into()
                }
                .into()
            ),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_DURATION")
        );
        assert_eq!(
            status_and_code(
                MarketError::InsufficientCredits {
                    user_id: "u".into(),
                    needed: 3,
                    available: 1
                }
                .into()
            ),
            (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_CREDITS")
        );
        assert_eq!(
            status_and_code(
                MarketError::InvalidTransition {
                    from: ExchangeStatus::Completed,
                    to: ExchangeStatus::Cancelled
                }
                .into()
            ),
            (StatusCode::CONFLICT, "INVALID_TRANSITION")
        );
        assert_eq!(
            status_and_code(MarketError::ConcurrentUpdateConflict("users".into()).into()),
            (StatusCode::CONFLICT, "CONCURRENT_UPDATE_CONFLICT")
        );
        assert_eq!(
            status_and_code(MarketError::validation("nope").into()),
            (StatusCode::BAD_REQUEST, "BAD_REQUEST")
        );
        assert_eq!(
            status_and_code(AppError::Unauthorized("missing token".into())),
            (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
        );
    }
}
