//! Skill listing and search endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use timebank_core::storage::SkillStore;
use timebank_core::{NewSkill, Skill, SkillFilter};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::{JsonBody, QueryParams};
use crate::types::SkillListQuery;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_skills).post(create_skill))
        .route("/:id", get(get_skill))
}

/// List a skill offered by the caller
async fn create_skill(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<NewSkill>,
) -> Result<(StatusCode, Json<Skill>), AppError> {
    let provider_id = user.id().to_string();
    let skill = state
        .with_db(move |db, _| SkillStore::new(db.conn()).create(&provider_id, &req))
        .await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

/// Search listed skills, keeping listing order
async fn list_skills(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<SkillListQuery>,
) -> Result<Json<Vec<Skill>>, AppError> {
    let filter = SkillFilter::from_params(
        query.search.as_deref(),
        query.category.as_deref(),
        query.difficulty.as_deref(),
    )?;
    let skills = state
        .with_db(move |db, _| {
            let listed = SkillStore::new(db.conn()).list(query.provider_id.as_deref())?;
            Ok(filter.apply(&listed))
        })
        .await?;
    Ok(Json(skills))
}

async fn get_skill(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Skill>, AppError> {
    let skill = state
        .with_db(move |db, _| SkillStore::new(db.conn()).require(&id))
        .await?;
    Ok(Json(skill))
}
