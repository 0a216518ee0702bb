use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, MaybeUser},
    error::{AppError, OptionExt},
    models::{PollType, Post, Topic},
    policy,
    repositories::{
        forum_repository,
        post_repository::{self, CreatePostData},
        topic_repository::{self, UpdateTopicData},
        user_repository,
    },
    urls,
    utils::page_for_position,
    AppState,
};

use super::topic_handlers::resolve_poster;

fn quote(body: &str, username: &str) -> String {
    format!("[quote=\"{}\"]{}[/quote]\n", username, body)
}

#[derive(Deserialize, Debug, Default)]
pub struct NewPostParams {
    pub quote_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NewPostForm {
    pub topic_id: Uuid,
    pub body: String,
}

/// Initial values of the reply form, optionally quoting another post.
pub async fn new_post_form_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(topic_id): Path<Uuid>,
    Query(params): Query<NewPostParams>,
) -> Result<Json<NewPostForm>, AppError> {
    let (topic, _) = super::load_visible_topic(&state, topic_id, user.user()).await?;
    if topic.closed {
        return Err(AppError::Forbidden);
    }
    if user.user().is_none() && !state.config.enable_anonymous_post {
        return Err(AppError::Unauthorized);
    }

    let body = match params.quote_id {
        Some(quote_id) => {
            let quoted = post_repository::get_post_by_id(&state.db_pool, quote_id)
                .await?
                .or_not_found()?;
            let author = user_repository::get_user_by_id(&state.db_pool, quoted.user_id)
                .await?
                .or_not_found()?;
            quote(&quoted.body, &author.username)
        }
        None => String::new(),
    };

    Ok(Json(NewPostForm {
        topic_id: topic.id,
        body,
    }))
}

#[derive(Deserialize, Debug)]
pub struct CreatePostRequest {
    pub body: String,
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
    user: MaybeUser,
    headers: HeaderMap,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Response, AppError> {
    let (topic, _) = super::load_visible_topic(&state, topic_id, user.user()).await?;
    if topic.closed {
        warn!(topic_id = %topic.id, "Reply to closed topic rejected");
        return Err(AppError::Forbidden);
    }
    let (poster, on_moderation) = resolve_poster(&state, user).await?;
    let body = super::validate_body(&payload.body)?;

    let post = post_repository::create_post(
        &state.db_pool,
        &CreatePostData {
            topic_id: topic.id,
            user_id: poster.id,
            body,
            user_ip: super::client_ip(&headers),
            on_moderation,
        },
    )
    .await?;
    info!(post_id = %post.id, topic_id = %topic.id, user_id = %poster.id, "Created post");

    if !post.on_moderation {
        state.notifier.notify_topic_subscribers(&state.db_pool, &post).await?;
    }

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// Redirects to the topic page that holds the post.
pub async fn get_post_handler(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(post_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let post = post_repository::get_post_by_id(&state.db_pool, post_id)
        .await?
        .or_not_found()?;
    let (topic, forum) = super::load_visible_topic(&state, post.topic_id, user.user()).await?;

    if state.config.premoderation && post.on_moderation {
        let moderator_ids = forum_repository::list_moderator_ids(&state.db_pool, forum.id).await?;
        if !policy::is_moderator(user.user(), &moderator_ids) && !policy::is_owner(user.user(), post.user_id) {
            return Err(AppError::Forbidden);
        }
    }

    let position = post_repository::position_in_topic(&state.db_pool, &post).await?;
    let page = page_for_position(position, state.config.topic_page_size);
    Ok(Redirect::to(&urls::post_in_topic(topic.id, page, post.id)))
}

#[derive(Deserialize, Debug)]
pub struct EditPostRequest {
    pub body: String,
    // Topic fields, only honoured for the head post. Absent fields keep their value.
    #[serde(default)]
    pub name: Option<String>,
    /// Empty string removes the place.
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub poll_type: Option<PollType>,
    #[serde(default)]
    pub poll_question: Option<String>,
    #[serde(default)]
    pub poll_answers: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EditedPost {
    pub post: Post,
    pub topic: Topic,
}

pub async fn edit_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<EditPostRequest>,
) -> Result<Json<EditedPost>, AppError> {
    let post = post_repository::get_post_by_id(&state.db_pool, post_id)
        .await?
        .or_not_found()?;
    let (topic, forum) = super::load_visible_topic(&state, post.topic_id, Some(&user)).await?;
    let moderator_ids = forum_repository::list_moderator_ids(&state.db_pool, forum.id).await?;
    if !policy::can_edit_post(Some(&user), &post, &moderator_ids) {
        warn!(post_id = %post.id, user_id = %user.id, "Post edit denied");
        return Err(AppError::Forbidden);
    }

    let body = super::validate_body(&payload.body)?;
    let is_head = post_repository::get_head_post_id(&state.db_pool, topic.id).await? == Some(post.id);

    let topic_update = if is_head {
        let name = match payload.name.as_deref() {
            Some(name) => super::validate_topic_name(name)?,
            None => topic.name.clone(),
        };
        let place = match payload.place.as_deref() {
            Some(place) => super::validate_place(&state, Some(place)).await?,
            None => topic.place.clone(),
        };
        let (poll_type, poll_question, poll_answers) = match payload.poll_type {
            Some(poll_type) => {
                let answers = payload.poll_answers.clone().unwrap_or_default();
                let poll = super::validate_poll(poll_type, payload.poll_question.as_deref(), &answers)?;
                (poll.poll_type, poll.question, Some(poll.answers))
            }
            None => (topic.poll_type, topic.poll_question.clone(), None),
        };
        Some((
            UpdateTopicData {
                name,
                place,
                poll_type,
                poll_question,
            },
            poll_answers,
        ))
    } else {
        None
    };

    let mut tx = state.db_pool.begin().await?;
    let post = post_repository::update_post_body(&mut tx, post.id, &body).await?;
    let updated_topic = match &topic_update {
        Some((data, answers)) => {
            Some(topic_repository::update_topic(&mut tx, topic.id, data, answers.as_deref()).await?)
        }
        None => None,
    };
    tx.commit().await?;
    info!(post_id = %post.id, user_id = %user.id, head = is_head, "Edited post");

    let place_changed = updated_topic
        .as_ref()
        .map_or(false, |updated| updated.place.is_some() && updated.place != topic.place);
    let topic = updated_topic.unwrap_or(topic);
    if place_changed && !topic.on_moderation {
        state.notifier.notify_area_watchers(&state.db_pool, &topic).await?;
    }

    Ok(Json(EditedPost { post, topic }))
}

/// Deleting the only remaining post deletes the topic as well; the redirect then
/// points at the forum.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let post = post_repository::get_post_by_id(&state.db_pool, post_id)
        .await?
        .or_not_found()?;
    let (topic, forum) = super::load_visible_topic(&state, post.topic_id, Some(&user)).await?;
    super::require_moderator(&state, forum.id, &user).await?;

    let mut tx = state.db_pool.begin().await?;
    post_repository::delete_post(&mut tx, post.id).await?;
    let remaining = post_repository::count_all_posts_in_topic(&mut tx, topic.id).await?;
    if remaining == 0 {
        topic_repository::delete_topic(&mut tx, topic.id).await?;
    }
    tx.commit().await?;

    info!(post_id = %post.id, topic_id = %topic.id, user_id = %user.id, topic_deleted = remaining == 0, "Deleted post");
    if remaining == 0 {
        Ok(Redirect::to(&urls::forum(forum.id)))
    } else {
        Ok(Redirect::to(&urls::topic(topic.id)))
    }
}

/// Approves a post held for moderation and sends the notifications it would
/// have caused when it was created.
pub async fn moderate_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let post = post_repository::get_post_by_id(&state.db_pool, post_id)
        .await?
        .or_not_found()?;
    let (topic, forum) = super::load_visible_topic(&state, post.topic_id, Some(&user)).await?;
    super::require_moderator(&state, forum.id, &user).await?;

    let was_on_moderation = post.on_moderation;
    let is_head = post_repository::get_head_post_id(&state.db_pool, topic.id).await? == Some(post.id);

    let mut tx = state.db_pool.begin().await?;
    let post = post_repository::set_on_moderation(&mut tx, post.id, false).await?;
    if is_head {
        topic_repository::set_on_moderation(&mut tx, topic.id, false).await?;
    }
    tx.commit().await?;
    info!(post_id = %post.id, user_id = %user.id, "Post approved");

    if was_on_moderation {
        if is_head {
            let topic = Topic {
                on_moderation: false,
                ..topic
            };
            state.notifier.notify_area_watchers(&state.db_pool, &topic).await?;
        } else {
            state.notifier.notify_topic_subscribers(&state.db_pool, &post).await?;
        }
    }

    Ok(Redirect::to(&urls::post(post.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_wraps_body_with_author() {
        assert_eq!(quote("hi there", "bob"), "[quote=\"bob\"]hi there[/quote]\n");
    }
}
