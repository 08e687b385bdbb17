//! User registration and profile endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use timebank_core::storage::{NewUser, ProfileUpdate, User, UserStore};
use timebank_core::{register, CreditTransaction, Ledger, Registration};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::types::{AddSkillNameRequest, ProfileResponse};
use crate::AppState;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/users", post(create_user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).patch(update_me))
        .route("/users/me/transactions", get(list_transactions))
        .route("/users/me/skills", post(add_skill_name))
        .route("/users/:id", get(get_user))
}

/// Register a user; the response carries the only copy of their token
async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let registration = state
        .with_db(move |db, config| register(db, config, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<User>, AppError> {
    let user_id = user.id().to_string();
    let me = state
        .with_db(move |db, _| UserStore::new(db.conn()).require(&user_id))
        .await?;
    Ok(Json(me))
}

/// Edit hourly rate, bio, location or availability
async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    let user_id = user.id().to_string();
    let updated = state
        .with_db(move |db, _| db.immediate(|tx| UserStore::new(tx).update_profile(&user_id, &update)))
        .await?;
    Ok(Json(updated))
}

async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state
        .with_db(move |db, _| UserStore::new(db.conn()).require(&id))
        .await?;
    Ok(Json(profile.into()))
}

/// Journal entries touching the caller, newest first
async fn list_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CreditTransaction>>, AppError> {
    let user_id = user.id().to_string();
    let history = state
        .with_db(move |db, _| Ledger::new(db.conn()).history(&user_id))
        .await?;
    Ok(Json(history))
}

async fn add_skill_name(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<AddSkillNameRequest>,
) -> Result<Json<User>, AppError> {
    let user_id = user.id().to_string();
    let updated = state
        .with_db(move |db, _| {
            db.immediate(|tx| UserStore::new(tx).add_skill_name(&user_id, &req.name))
        })
        .await?;
    Ok(Json(updated))
}
