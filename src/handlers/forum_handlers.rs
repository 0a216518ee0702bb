use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::MaybeUser,
    error::AppError,
    models::{Category, Forum, TopicListItem},
    policy::{self, Visibility},
    repositories::{forum_repository, topic_repository},
    utils::{Page, PageParams, PageWindow},
    AppState,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct ForumResponse {
    pub forum: Forum,
    pub category: Category,
    pub is_moderator: bool,
    pub topics: Page<TopicListItem>,
}

/// Topics of one forum. Moderators see topics on moderation; everyone else
/// only sees their own.
pub async fn get_forum_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(forum_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<ForumResponse>, AppError> {
    let (forum, category) = super::load_visible_forum(&state, forum_id, user.user()).await?;
    let moderator_ids = forum_repository::list_moderator_ids(&state.db_pool, forum.id).await?;
    let is_moderator = policy::is_moderator(user.user(), &moderator_ids);

    let visibility = Visibility {
        include_moderated: is_moderator,
        ..Visibility::for_viewer(user.user())
    };
    let total = topic_repository::count_topics_in_forum(&state.db_pool, forum.id, &visibility).await?;
    let window = PageWindow::resolve(&params, state.config.forum_page_size, total)?;
    let items =
        topic_repository::list_topics_in_forum(&state.db_pool, forum.id, &visibility, &window).await?;

    Ok(Json(ForumResponse {
        forum,
        category,
        is_moderator,
        topics: Page::new(items, window, total),
    }))
}
