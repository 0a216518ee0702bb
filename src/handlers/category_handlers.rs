use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::MaybeUser,
    constants::FEATURED_TOPICS_LIMIT,
    error::{AppError, OptionExt},
    models::{Category, Forum, Topic, WatchArea},
    policy::{self, Visibility},
    repositories::{category_repository, forum_repository, topic_repository, watch_area_repository},
    AppState,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct CategoryWithForums {
    #[serde(flatten)]
    pub category: Category,
    pub forums: Vec<Forum>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexParams {
    pub watch_area: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IndexResponse {
    pub categories: Vec<CategoryWithForums>,
    pub watch_areas: Vec<WatchArea>,
    pub watch_area: Option<WatchArea>,
    pub featured_topics: Vec<Topic>,
}

async fn with_forums(
    state: &AppState,
    category: Category,
    include_hidden: bool,
) -> Result<CategoryWithForums, AppError> {
    let forums =
        forum_repository::list_forums_in_category(&state.db_pool, category.id, include_hidden).await?;
    Ok(CategoryWithForums { category, forums })
}

pub async fn index_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<IndexParams>,
) -> Result<Json<IndexResponse>, AppError> {
    let visibility = Visibility::for_viewer(user.user());

    let watch_area = match params.watch_area {
        Some(area_id) => {
            let area = watch_area_repository::get_watch_area_by_id(&state.db_pool, area_id)
                .await?
                .or_not_found()?;
            if !policy::can_access_watch_area(user.user(), &area) {
                return Err(AppError::NotFound);
            }
            Some(area)
        }
        None => None,
    };

    let mut categories = Vec::new();
    for category in category_repository::list_categories(&state.db_pool, visibility.include_hidden).await? {
        categories.push(with_forums(&state, category, visibility.include_hidden).await?);
    }

    let featured_topics = topic_repository::list_featured_topics(
        &state.db_pool,
        &visibility,
        watch_area.as_ref().map(|a| a.id),
        FEATURED_TOPICS_LIMIT,
    )
    .await?;
    let watch_areas = watch_area_repository::list_public_watch_areas(&state.db_pool).await?;

    Ok(Json(IndexResponse {
        categories,
        watch_areas,
        watch_area,
        featured_topics,
    }))
}

pub async fn get_category_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryWithForums>, AppError> {
    let category = category_repository::get_category_by_id(&state.db_pool, category_id)
        .await?
        .or_not_found()?;
    let include_hidden = policy::can_view_hidden(user.user());
    if category.hidden && !include_hidden {
        warn!(category_id = %category_id, "Hidden category requested");
        return Err(AppError::NotFound);
    }
    Ok(Json(with_forums(&state, category, include_hidden).await?))
}
