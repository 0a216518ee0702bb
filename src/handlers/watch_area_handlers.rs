use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    constants::MAX_TOPIC_NAME_LENGTH,
    error::{AppError, OptionExt},
    models::{TopicListItem, User, WatchArea},
    policy::{self, Visibility},
    repositories::{
        topic_repository,
        watch_area_repository::{self, WatchAreaData},
    },
    urls,
    utils::{Page, PageParams, PageWindow},
    AppState,
};

async fn validate_area(state: &AppState, data: WatchAreaData) -> Result<WatchAreaData, AppError> {
    let name = data.name.trim();
    if name.is_empty() || name.chars().count() > MAX_TOPIC_NAME_LENGTH {
        return Err(AppError::bad_request("Watch area name must be 1 to 255 characters"));
    }
    let fence = super::validate_fence(state, &data.fence).await?;
    Ok(WatchAreaData {
        name: name.to_string(),
        fence,
        public: data.public,
    })
}

async fn load_area(state: &AppState, area_id: Uuid) -> Result<WatchArea, AppError> {
    watch_area_repository::get_watch_area_by_id(&state.db_pool, area_id)
        .await?
        .or_not_found()
}

fn ensure_can_manage(user: &User, area: &WatchArea) -> Result<(), AppError> {
    if !policy::can_manage_watch_area(Some(user), area) {
        warn!(watch_area_id = %area.id, user_id = %user.id, "Watch area change denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn ensure_can_access(user: &User, area: &WatchArea) -> Result<(), AppError> {
    if !policy::can_access_watch_area(Some(user), area) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// The creator automatically watches the new area.
pub async fn create_watch_area_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<WatchAreaData>,
) -> Result<Response, AppError> {
    let data = validate_area(&state, payload).await?;
    let area = watch_area_repository::create_watch_area(&state.db_pool, user.id, &data).await?;
    info!(watch_area_id = %area.id, user_id = %user.id, "Created watch area");
    let location = urls::watch_area(area.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(area)).into_response())
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WatchAreaResponse {
    pub watch_area: WatchArea,
    pub is_watching: bool,
    pub can_manage: bool,
    pub topics: Page<TopicListItem>,
}

pub async fn get_watch_area_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(area_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<WatchAreaResponse>, AppError> {
    let area = load_area(&state, area_id).await?;
    ensure_can_access(&user, &area)?;

    let visibility = Visibility::for_viewer(Some(&user));
    let total = topic_repository::count_topics_in_area(&state.db_pool, area.id, &visibility).await?;
    let window = PageWindow::resolve(&params, state.config.forum_page_size, total)?;
    let items =
        topic_repository::list_topics_in_area(&state.db_pool, area.id, &visibility, &window).await?;
    let is_watching = watch_area_repository::is_watching(&state.db_pool, area.id, user.id).await?;

    Ok(Json(WatchAreaResponse {
        can_manage: policy::can_manage_watch_area(Some(&user), &area),
        is_watching,
        watch_area: area,
        topics: Page::new(items, window, total),
    }))
}

pub async fn edit_watch_area_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(area_id): Path<Uuid>,
    Json(payload): Json<WatchAreaData>,
) -> Result<Json<WatchArea>, AppError> {
    let area = load_area(&state, area_id).await?;
    ensure_can_manage(&user, &area)?;

    let data = validate_area(&state, payload).await?;
    let area = watch_area_repository::update_watch_area(&state.db_pool, area.id, &data)
        .await?
        .or_not_found()?;
    info!(watch_area_id = %area.id, user_id = %user.id, "Updated watch area");
    Ok(Json(area))
}

pub async fn delete_watch_area_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(area_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let area = load_area(&state, area_id).await?;
    ensure_can_manage(&user, &area)?;

    watch_area_repository::delete_watch_area(&state.db_pool, area.id).await?;
    info!(watch_area_id = %area.id, user_id = %user.id, "Deleted watch area");
    Ok(Redirect::to(&urls::edit_profile()))
}

pub async fn add_watch_area_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(area_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let area = load_area(&state, area_id).await?;
    ensure_can_access(&user, &area)?;
    watch_area_repository::add_watcher(&state.db_pool, area.id, user.id).await?;
    info!(watch_area_id = %area.id, user_id = %user.id, "Watching area");
    Ok(super::ajax_or_redirect(&headers, &urls::watch_area(area.id)))
}

pub async fn delete_watch_area_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(area_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let area = load_area(&state, area_id).await?;
    watch_area_repository::remove_watcher(&state.db_pool, area.id, user.id).await?;
    info!(watch_area_id = %area.id, user_id = %user.id, "Stopped watching area");
    Ok(super::ajax_or_redirect(&headers, &urls::watch_area(area.id)))
}
