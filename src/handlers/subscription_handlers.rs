use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

use crate::{auth::CurrentUser, error::AppError, repositories::subscription_repository, urls, AppState};

pub async fn add_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (topic, _) = super::load_visible_topic(&state, topic_id, Some(&user)).await?;
    subscription_repository::subscribe(&state.db_pool, topic.id, user.id).await?;
    info!(topic_id = %topic.id, user_id = %user.id, "Subscribed to topic");
    Ok(super::ajax_or_redirect(&headers, &urls::topic(topic.id)))
}

/// Also reachable with GET: notification mails link here.
pub async fn delete_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(topic_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (topic, _) = super::load_visible_topic(&state, topic_id, Some(&user)).await?;
    subscription_repository::unsubscribe(&state.db_pool, topic.id, user.id).await?;
    info!(topic_id = %topic.id, user_id = %user.id, "Unsubscribed from topic");
    Ok(super::ajax_or_redirect(&headers, &urls::topic(topic.id)))
}
