use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{ForumReadTracker, TopicReadTracker};

pub async fn get_forum_marker(
    pool: &PgPool,
    user_id: Uuid,
    forum_id: Uuid,
) -> Result<Option<ForumReadTracker>, sqlx::Error> {
    sqlx::query_as::<_, ForumReadTracker>(
        r#"
        SELECT id, user_id, forum_id, time_stamp
        FROM forum_read_trackers
        WHERE user_id = $1 AND forum_id = $2
        "#,
    )
    .bind(user_id)
    .bind(forum_id)
    .fetch_optional(pool)
    .await
}

/// Get-or-create; an existing marker is moved to the current time.
pub async fn touch_topic_marker(
    pool: &PgPool,
    user_id: Uuid,
    topic_id: Uuid,
) -> Result<TopicReadTracker, sqlx::Error> {
    sqlx::query_as::<_, TopicReadTracker>(
        r#"
        INSERT INTO topic_read_trackers (user_id, topic_id, time_stamp)
        VALUES ($1, $2, clock_timestamp())
        ON CONFLICT (user_id, topic_id) DO UPDATE SET time_stamp = EXCLUDED.time_stamp
        RETURNING id, user_id, topic_id, time_stamp
        "#,
    )
    .bind(user_id)
    .bind(topic_id)
    .fetch_one(pool)
    .await
}

pub async fn touch_forum_marker(
    conn: &mut PgConnection,
    user_id: Uuid,
    forum_id: Uuid,
) -> Result<ForumReadTracker, sqlx::Error> {
    sqlx::query_as::<_, ForumReadTracker>(
        r#"
        INSERT INTO forum_read_trackers (user_id, forum_id, time_stamp)
        VALUES ($1, $2, clock_timestamp())
        ON CONFLICT (user_id, forum_id) DO UPDATE SET time_stamp = EXCLUDED.time_stamp
        RETURNING id, user_id, forum_id, time_stamp
        "#,
    )
    .bind(user_id)
    .bind(forum_id)
    .fetch_one(&mut *conn)
    .await
}

/// Topics of the forum the user has not read since their last activity. A topic
/// counts as read when a topic or forum marker is at least as new as its
/// `updated` time. Topics on moderation only count for their author.
pub async fn count_unread_topics(
    pool: &PgPool,
    user_id: Uuid,
    forum_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM topics t
        WHERE t.forum_id = $2
          AND (NOT t.on_moderation OR t.user_id = $1)
          AND NOT EXISTS (SELECT 1 FROM topic_read_trackers tr
              WHERE tr.topic_id = t.id AND tr.user_id = $1 AND tr.time_stamp >= t.updated)
          AND NOT EXISTS (SELECT 1 FROM forum_read_trackers fr
              WHERE fr.forum_id = t.forum_id AND fr.user_id = $1 AND fr.time_stamp >= t.updated)
        "#,
    )
    .bind(user_id)
    .bind(forum_id)
    .fetch_one(pool)
    .await
}

pub async fn delete_topic_markers_in_forum(
    conn: &mut PgConnection,
    user_id: Uuid,
    forum_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM topic_read_trackers tr
        USING topics t
        WHERE tr.topic_id = t.id AND tr.user_id = $1 AND t.forum_id = $2
        "#,
    )
    .bind(user_id)
    .bind(forum_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all_topic_markers(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM topic_read_trackers WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_topic_markers_in_forum(
    pool: &PgPool,
    user_id: Uuid,
    forum_id: Uuid,
) -> Result<Vec<TopicReadTracker>, sqlx::Error> {
    sqlx::query_as::<_, TopicReadTracker>(
        r#"
        SELECT tr.id, tr.user_id, tr.topic_id, tr.time_stamp
        FROM topic_read_trackers tr
        JOIN topics t ON t.id = tr.topic_id
        WHERE tr.user_id = $1 AND t.forum_id = $2
        "#,
    )
    .bind(user_id)
    .bind(forum_id)
    .fetch_all(pool)
    .await
}
