pub mod admin_handlers;
pub mod category_handlers;
pub mod forum_handlers;
pub mod post_handlers;
pub mod subscription_handlers;
pub mod topic_handlers;
pub mod user_handlers;
pub mod watch_area_handlers;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    constants::{MAX_POLL_ANSWERS, MAX_POST_BODY_LENGTH, MAX_TOPIC_NAME_LENGTH, MIN_POLL_ANSWERS},
    error::{AppError, OptionExt},
    models::{Category, Forum, PollType, Topic, User},
    policy,
    repositories::{
        category_repository, forum_repository, topic_repository,
        watch_area_repository::{self, GeometryCheck},
    },
    AppState,
};

/// Loads a forum with its category. Hidden forums, and forums in hidden
/// categories, do not exist for viewers who may not see hidden content.
pub(crate) async fn load_visible_forum(
    state: &AppState,
    forum_id: Uuid,
    user: Option<&User>,
) -> Result<(Forum, Category), AppError> {
    let forum = forum_repository::get_forum_by_id(&state.db_pool, forum_id)
        .await?
        .or_not_found()?;
    let category = category_repository::get_category_by_id(&state.db_pool, forum.category_id)
        .await?
        .or_not_found()?;
    if (forum.hidden || category.hidden) && !policy::can_view_hidden(user) {
        return Err(AppError::NotFound);
    }
    Ok((forum, category))
}

/// Loads a topic whose forum the viewer can see.
pub(crate) async fn load_visible_topic(
    state: &AppState,
    topic_id: Uuid,
    user: Option<&User>,
) -> Result<(Topic, Forum), AppError> {
    let topic = topic_repository::get_topic_by_id(&state.db_pool, topic_id)
        .await?
        .or_not_found()?;
    let (forum, _) = load_visible_forum(state, topic.forum_id, user).await?;
    Ok((topic, forum))
}

/// Fails with 403 unless the viewer moderates the forum.
pub(crate) async fn require_moderator(
    state: &AppState,
    forum_id: Uuid,
    user: &User,
) -> Result<Vec<Uuid>, AppError> {
    let moderator_ids = forum_repository::list_moderator_ids(&state.db_pool, forum_id).await?;
    if !policy::is_moderator(Some(user), &moderator_ids) {
        warn!(user_id = %user.id, forum_id = %forum_id, "Moderator action denied");
        return Err(AppError::Forbidden);
    }
    Ok(moderator_ids)
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`, else empty.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Script callers get an empty 204, links followed from a page or a mail get
/// redirected to `location`.
pub(crate) fn ajax_or_redirect(headers: &HeaderMap, location: &str) -> Response {
    if is_ajax(headers) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Redirect::to(location).into_response()
    }
}

pub(crate) fn validate_topic_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Topic name is required"));
    }
    if name.chars().count() > MAX_TOPIC_NAME_LENGTH {
        return Err(AppError::bad_request(format!(
            "Topic name exceeds maximum length of {} characters",
            MAX_TOPIC_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_body(body: &str) -> Result<String, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::bad_request("Post body is required"));
    }
    if body.chars().count() > MAX_POST_BODY_LENGTH {
        return Err(AppError::bad_request(format!(
            "Post body exceeds maximum length of {} characters",
            MAX_POST_BODY_LENGTH
        )));
    }
    Ok(body.to_string())
}

/// A poll after validation. Question and answers are cleared for `PollType::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidPoll {
    pub poll_type: PollType,
    pub question: Option<String>,
    pub answers: Vec<String>,
}

pub(crate) fn validate_poll(
    poll_type: PollType,
    question: Option<&str>,
    answers: &[String],
) -> Result<ValidPoll, AppError> {
    if poll_type == PollType::None {
        return Ok(ValidPoll {
            poll_type,
            question: None,
            answers: Vec::new(),
        });
    }

    let question = question.map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err(AppError::bad_request("Poll question is required"));
    }
    let answers: Vec<String> = answers
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    if answers.len() < MIN_POLL_ANSWERS || answers.len() > MAX_POLL_ANSWERS {
        return Err(AppError::bad_request(format!(
            "Poll needs between {} and {} answers",
            MIN_POLL_ANSWERS, MAX_POLL_ANSWERS
        )));
    }
    Ok(ValidPoll {
        poll_type,
        question: Some(question.to_string()),
        answers,
    })
}

/// Blank places are no place at all.
pub(crate) async fn validate_place(
    state: &AppState,
    place: Option<&str>,
) -> Result<Option<String>, AppError> {
    let place = match place.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(None),
    };
    match watch_area_repository::check_geometry(&state.db_pool, place).await? {
        GeometryCheck::Valid(_) => Ok(Some(place.to_string())),
        GeometryCheck::Invalid => Err(AppError::bad_request("Place is not a valid geometry")),
    }
}

pub(crate) async fn validate_fence(state: &AppState, fence: &str) -> Result<String, AppError> {
    let fence = fence.trim();
    match watch_area_repository::check_geometry(&state.db_pool, fence).await? {
        GeometryCheck::Valid(kind) if kind == "POLYGON" || kind == "MULTIPOLYGON" => {
            Ok(fence.to_string())
        }
        GeometryCheck::Valid(kind) => Err(AppError::bad_request(format!(
            "Fence must be a polygon, got {}",
            kind
        ))),
        GeometryCheck::Invalid => Err(AppError::bad_request("Fence is not a valid geometry")),
    }
}
