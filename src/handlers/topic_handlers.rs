use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, MaybeUser},
    error::AppError,
    models::{Forum, PollAnswerResult, PollType, Post, Topic, TopicListItem, User, WatchArea},
    policy::{self, Visibility},
    read_tracking,
    repositories::{
        forum_repository, poll_repository, post_repository, subscription_repository,
        topic_repository::{self, CreateTopicData},
        user_repository, watch_area_repository,
    },
    urls,
    utils::{Page, PageParams, PageWindow},
    AppState,
};

/// The account a post is attributed to and whether it starts on moderation.
/// Anonymous visitors post through the shared anonymous account when allowed.
pub(crate) async fn resolve_poster(state: &AppState, user: MaybeUser) -> Result<(User, bool), AppError> {
    match user.0 {
        Some(user) => Ok((user, false)),
        None if state.config.enable_anonymous_post => {
            let anonymous =
                user_repository::get_or_create_anonymous(&state.db_pool, &state.config.anonymous_username)
                    .await?;
            Ok((anonymous, state.config.premoderation))
        }
        None => Err(AppError::Unauthorized),
    }
}

// --- Listings ---

pub async fn latest_topics_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TopicListItem>>, AppError> {
    let visibility = Visibility::for_viewer(user.user());
    let total = topic_repository::count_latest_topics(&state.db_pool, &visibility).await?;
    let window = PageWindow::resolve(&params, state.config.forum_page_size, total)?;
    let items = topic_repository::list_latest_topics(&state.db_pool, &visibility, &window).await?;
    Ok(Json(Page::new(items, window, total)))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollView {
    pub poll_type: PollType,
    pub question: Option<String>,
    pub answers: Vec<PollAnswerResult>,
    pub can_vote: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TopicResponse {
    pub topic: Topic,
    pub forum: Forum,
    pub posts: Page<Post>,
    pub is_moderator: bool,
    pub is_subscribed: bool,
    pub watch_areas: Vec<WatchArea>,
    pub poll: Option<PollView>,
}

pub async fn get_topic_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(topic_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<TopicResponse>, AppError> {
    let viewer = user.user();
    let (mut topic, forum) = super::load_visible_topic(&state, topic_id, viewer).await?;
    let moderator_ids = forum_repository::list_moderator_ids(&state.db_pool, forum.id).await?;
    let is_moderator = policy::is_moderator(viewer, &moderator_ids);

    if topic.on_moderation && !is_moderator && !policy::is_owner(viewer, topic.user_id) {
        warn!(topic_id = %topic.id, "Topic on moderation requested");
        return Err(AppError::Forbidden);
    }

    let viewer_id = viewer.map(|u| u.id);
    let total = post_repository::count_posts(&state.db_pool, topic.id, viewer_id, is_moderator).await?;
    let window = PageWindow::resolve(&params, state.config.topic_page_size, total)?;
    let posts =
        post_repository::list_posts(&state.db_pool, topic.id, viewer_id, is_moderator, &window).await?;

    topic_repository::increment_views(&state.db_pool, topic.id).await?;
    topic.views += 1;

    let is_subscribed = match viewer {
        Some(u) => subscription_repository::is_subscribed(&state.db_pool, topic.id, u.id).await?,
        None => false,
    };

    let watch_areas = if topic.place.is_some() {
        watch_area_repository::list_areas_for_topic(&state.db_pool, topic.id, viewer_id).await?
    } else {
        Vec::new()
    };

    let poll = if topic.poll_type != PollType::None {
        let answers = poll_repository::list_results(&state.db_pool, topic.id).await?;
        let can_vote = match viewer {
            Some(u) => !poll_repository::has_voted(&state.db_pool, topic.id, u.id).await?,
            None => false,
        };
        Some(PollView {
            poll_type: topic.poll_type,
            question: topic.poll_question.clone(),
            answers,
            can_vote,
        })
    } else {
        None
    };

    if let Some(u) = viewer {
        let outcome = read_tracking::mark_read(&state.db_pool, u.id, &topic).await?;
        debug!(user_id = %u.id, topic_id = %topic.id, outcome = ?outcome, "Read state updated");
    }

    Ok(Json(TopicResponse {
        topic,
        forum,
        posts: Page::new(posts, window, total),
        is_moderator,
        is_subscribed,
        watch_areas,
        poll,
    }))
}

// --- Creation ---

#[derive(Deserialize, Debug)]
pub struct CreateTopicRequest {
    pub name: String,
    pub body: String,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub poll_type: PollType,
    #[serde(default)]
    pub poll_question: Option<String>,
    #[serde(default)]
    pub poll_answers: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedTopic {
    pub topic: Topic,
    pub post: Post,
}

pub async fn create_topic_handler(
    State(state): State<AppState>,
    Path(forum_id): Path<Uuid>,
    user: MaybeUser,
    headers: HeaderMap,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<Response, AppError> {
    let (forum, _) = super::load_visible_forum(&state, forum_id, user.user()).await?;
    let (poster, on_moderation) = resolve_poster(&state, user).await?;

    let name = super::validate_topic_name(&payload.name)?;
    let body = super::validate_body(&payload.body)?;
    let poll = super::validate_poll(
        payload.poll_type,
        payload.poll_question.as_deref(),
        &payload.poll_answers,
    )?;
    let place = super::validate_place(&state, payload.place.as_deref()).await?;

    let data = CreateTopicData {
        forum_id: forum.id,
        user_id: poster.id,
        name,
        body,
        user_ip: super::client_ip(&headers),
        place,
        on_moderation,
        poll_type: poll.poll_type,
        poll_question: poll.question,
        poll_answers: poll.answers,
    };
    let (topic, post) = topic_repository::create_topic(&state.db_pool, &data).await?;
    info!(topic_id = %topic.id, forum_id = %forum.id, user_id = %poster.id, "Created topic");

    if !topic.on_moderation {
        state.notifier.notify_area_watchers(&state.db_pool, &topic).await?;
    }

    Ok((StatusCode::CREATED, Json(CreatedTopic { topic, post })).into_response())
}

// --- Moderator actions ---

async fn moderate_topic(
    state: &AppState,
    user: &User,
    topic_id: Uuid,
    action: TopicAction,
) -> Result<Redirect, AppError> {
    let (topic, forum) = super::load_visible_topic(state, topic_id, Some(user)).await?;
    super::require_moderator(state, forum.id, user).await?;

    match action {
        TopicAction::Stick => topic_repository::set_sticky(&state.db_pool, topic.id, true).await?,
        TopicAction::Unstick => topic_repository::set_sticky(&state.db_pool, topic.id, false).await?,
        TopicAction::Close => topic_repository::set_closed(&state.db_pool, topic.id, true).await?,
        TopicAction::Open => topic_repository::set_closed(&state.db_pool, topic.id, false).await?,
    }
    info!(topic_id = %topic.id, user_id = %user.id, action = ?action, "Topic updated by moderator");
    Ok(Redirect::to(&urls::topic(topic.id)))
}

#[derive(Debug, Clone, Copy)]
enum TopicAction {
    Stick,
    Unstick,
    Close,
    Open,
}

pub async fn stick_topic_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    moderate_topic(&state, &user, topic_id, TopicAction::Stick).await
}

pub async fn unstick_topic_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    moderate_topic(&state, &user, topic_id, TopicAction::Unstick).await
}

pub async fn close_topic_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    moderate_topic(&state, &user, topic_id, TopicAction::Close).await
}

pub async fn open_topic_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    moderate_topic(&state, &user, topic_id, TopicAction::Open).await
}

// --- Polls ---

#[derive(Deserialize, Debug)]
pub struct PollVoteRequest {
    pub answers: Vec<Uuid>,
}

pub async fn poll_vote_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
    Json(payload): Json<PollVoteRequest>,
) -> Result<Redirect, AppError> {
    let (topic, _) = super::load_visible_topic(&state, topic_id, Some(&user)).await?;
    if topic.poll_type == PollType::None {
        return Err(AppError::bad_request("Topic has no poll"));
    }

    let mut answer_ids = payload.answers;
    answer_ids.sort();
    answer_ids.dedup();
    if answer_ids.is_empty() {
        return Err(AppError::bad_request("Choose at least one answer"));
    }
    if topic.poll_type == PollType::Single && answer_ids.len() > 1 {
        return Err(AppError::bad_request("This poll accepts a single answer"));
    }
    if poll_repository::has_voted(&state.db_pool, topic.id, user.id).await? {
        return Err(AppError::bad_request("You have already voted in this poll"));
    }

    let answers = poll_repository::get_answers_by_ids(&state.db_pool, &answer_ids).await?;
    if answers.len() != answer_ids.len() || answers.iter().any(|a| a.topic_id != topic.id) {
        return Err(AppError::bad_request("Answer does not belong to this poll"));
    }

    poll_repository::record_votes(&state.db_pool, &answer_ids, user.id).await?;
    info!(topic_id = %topic.id, user_id = %user.id, votes = answer_ids.len(), "Poll vote recorded");
    Ok(Redirect::to(&urls::topic(topic.id)))
}
