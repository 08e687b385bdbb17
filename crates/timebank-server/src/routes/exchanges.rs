//! Exchange request and lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use timebank_core::{
    Exchange, ExchangeQuery, ExchangeService, ExchangeUpdate, MarketError, NewExchange, SkillRef,
};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::{JsonBody, QueryParams};
use crate::types::{CreateExchangeRequest, ExchangeListQuery, ExchangeScope};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exchanges).post(create_exchange))
        .route("/:id", get(get_exchange).patch(update_exchange))
}

/// Request time from a provider; the caller is always the seeker
async fn create_exchange(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<Exchange>), AppError> {
    if matches!(req.seeker_id.as_deref(), Some(seeker) if seeker != user.id()) {
        return Err(MarketError::validation("seekerId must be the authenticated user").into());
    }

    let request = NewExchange {
        provider_id: req.provider_id,
        seeker_id: user.id().to_string(),
        skill: SkillRef::from_parts(req.skill_id, req.skill)?,
        duration: req.duration,
        scheduled_date: req.scheduled_date,
        message: req.message,
        mode: req.mode.unwrap_or_default(),
    };

    let exchange = state
        .with_db(move |db, config| ExchangeService::new(db, config).create(request))
        .await?;
    Ok((StatusCode::CREATED, Json(exchange)))
}

/// `scope=all` browses the whole marketplace; exchanges the caller is not
/// a party to come back without message, notes or reviews
async fn list_exchanges(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ExchangeListQuery>,
) -> Result<Json<Vec<Exchange>>, AppError> {
    let filter = ExchangeQuery {
        party: match query.scope {
            ExchangeScope::Mine => Some(user.id().to_string()),
            ExchangeScope::All => None,
        },
        status: query.status()?,
        viewer: Some(user.id().to_string()),
    };
    let exchanges = state
        .with_db(move |db, config| ExchangeService::new(db, config).list(&filter))
        .await?;
    Ok(Json(exchanges))
}

async fn get_exchange(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Exchange>, AppError> {
    let user_id = user.id().to_string();
    let exchange = state
        .with_db(move |db, config| ExchangeService::new(db, config).get_for(&id, &user_id))
        .await?;
    Ok(Json(exchange))
}

/// Change status or attach notes, rating and review
async fn update_exchange(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ExchangeUpdate>,
) -> Result<Json<Exchange>, AppError> {
    let user_id = user.id().to_string();
    let exchange = state
        .with_db(move |db, config| ExchangeService::new(db, config).update(&id, &user_id, update))
        .await?;
    Ok(Json(exchange))
}
