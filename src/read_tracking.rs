//! Per-user read state of topics and forums.
//!
//! A topic marker records when a user last read one topic; a forum marker says
//! every topic of the forum was read at that time. Viewing a topic writes a
//! topic marker, and once nothing in the forum is left unread the topic markers
//! collapse into a single forum marker.
//!
//! The steps are not atomic as a whole. Concurrent views of the same forum by
//! the same user may both collapse; the outcome is the same either way.
//!
//! A reply bumps `topic.updated` once more after its insert commits, so a
//! marker written concurrently with the reply never covers it. The worst case
//! is a topic shown unread that was in fact seen, fixed by the next view.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::Topic,
    policy::Visibility,
    repositories::{forum_repository, read_tracker_repository},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The forum marker already covers the topic; nothing was written.
    AlreadyRead,
    /// A topic marker was created or touched.
    TopicMarked,
    /// The topic was the last unread one; the forum marker replaced the topic markers.
    ForumMarked,
}

/// Records that `user_id` has seen `topic` at its current `updated` time.
pub async fn mark_read(pool: &PgPool, user_id: Uuid, topic: &Topic) -> Result<ReadOutcome, sqlx::Error> {
    let forum_marker = read_tracker_repository::get_forum_marker(pool, user_id, topic.forum_id).await?;
    if let Some(marker) = &forum_marker {
        if marker.time_stamp >= topic.updated {
            return Ok(ReadOutcome::AlreadyRead);
        }
    }

    read_tracker_repository::touch_topic_marker(pool, user_id, topic.id).await?;

    let unread = read_tracker_repository::count_unread_topics(pool, user_id, topic.forum_id).await?;
    if unread > 0 {
        debug!(user_id = %user_id, topic_id = %topic.id, unread, "Topic marked as read");
        return Ok(ReadOutcome::TopicMarked);
    }

    let mut tx = pool.begin().await?;
    let removed =
        read_tracker_repository::delete_topic_markers_in_forum(&mut tx, user_id, topic.forum_id).await?;
    read_tracker_repository::touch_forum_marker(&mut tx, user_id, topic.forum_id).await?;
    tx.commit().await?;

    debug!(
        user_id = %user_id,
        forum_id = %topic.forum_id,
        removed_topic_markers = removed,
        "Forum marked as read"
    );
    Ok(ReadOutcome::ForumMarked)
}

/// Marks every forum the viewer can see as read. Returns the number of forums marked.
pub async fn mark_all_as_read(
    pool: &PgPool,
    user_id: Uuid,
    visibility: &Visibility,
) -> Result<usize, sqlx::Error> {
    let forums = forum_repository::list_visible_forums(pool, visibility.include_hidden).await?;

    let mut tx = pool.begin().await?;
    for forum in &forums {
        read_tracker_repository::touch_forum_marker(&mut tx, user_id, forum.id).await?;
    }
    read_tracker_repository::delete_all_topic_markers(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(forums.len())
}
