//! API routes

use axum::Router;

use crate::AppState;

mod exchanges;
mod skills;
mod users;

/// Routes reachable without a bearer token
pub fn public_router() -> Router<AppState> {
    users::public_router()
}

/// Build the API router with all authenticated endpoints
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .nest("/skills", skills::router())
        .nest("/exchanges", exchanges::router())
}
