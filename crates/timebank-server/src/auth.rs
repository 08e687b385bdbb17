//! Bearer token auth middleware.
//!
//! Every `/api` route except registration requires
//! `Authorization: Bearer <token>`; the token resolves to a user id that
//! handlers read through [`CurrentUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use timebank_core::storage::TokenStore;

use crate::error::AppError;
use crate::AppState;

/// User context attached to request extensions by middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Extractor for routes that need the caller's identity.
pub struct CurrentUser(pub AuthenticatedUser);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Middleware that resolves the bearer token and attaches the user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return AppError::Unauthorized("Missing bearer token".to_string()).into_response();
    };

    let resolved = state
        .with_db(move |db, _| TokenStore::new(db.conn()).resolve(&token))
        .await;

    match resolved {
        Ok(Some(user_id)) => {
            tracing::debug!(user_id = %user_id, "Authenticated request");
            request
                .extensions_mut()
                .insert(AuthenticatedUser { user_id });
            next.run(request).await
        }
        Ok(None) => AppError::Unauthorized("Invalid bearer token".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}
