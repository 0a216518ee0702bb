//! Minimal administration: categories, forums and forum moderators.
//! Superusers only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{AppError, OptionExt},
    models::User,
    policy,
    repositories::{
        category_repository::{self, CreateCategoryData},
        forum_repository::{self, CreateForumData},
        user_repository,
    },
    AppState,
};

fn require_superuser(user: &User) -> Result<(), AppError> {
    if !policy::is_superuser(Some(user)) {
        warn!(user_id = %user.id, "Administration denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn require_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    Ok(name.to_string())
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCategoryData>,
) -> Result<Response, AppError> {
    require_superuser(&user)?;
    let data = CreateCategoryData {
        name: require_name(&payload.name)?,
        ..payload
    };
    let category = category_repository::create_category(&state.db_pool, &data).await?;
    info!(category_id = %category.id, "Created category");
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

pub async fn create_forum_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CreateForumData>,
) -> Result<Response, AppError> {
    require_superuser(&user)?;
    let category = category_repository::get_category_by_id(&state.db_pool, category_id)
        .await?
        .or_not_found()?;
    let data = CreateForumData {
        name: require_name(&payload.name)?,
        ..payload
    };
    let forum = forum_repository::create_forum(&state.db_pool, category.id, &data).await?;
    info!(forum_id = %forum.id, category_id = %category.id, "Created forum");
    Ok((StatusCode::CREATED, Json(forum)).into_response())
}

#[derive(Deserialize, Debug)]
pub struct AddModeratorRequest {
    pub username: String,
}

pub async fn add_moderator_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(forum_id): Path<Uuid>,
    Json(payload): Json<AddModeratorRequest>,
) -> Result<StatusCode, AppError> {
    require_superuser(&user)?;
    let forum = forum_repository::get_forum_by_id(&state.db_pool, forum_id)
        .await?
        .or_not_found()?;
    let moderator = user_repository::get_user_by_username(&state.db_pool, &payload.username)
        .await?
        .or_not_found()?;
    forum_repository::add_moderator(&state.db_pool, forum.id, moderator.id).await?;
    info!(forum_id = %forum.id, user_id = %moderator.id, "Added forum moderator");
    Ok(StatusCode::NO_CONTENT)
}
