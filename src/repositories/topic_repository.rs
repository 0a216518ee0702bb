use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    models::{PollType, Post, Topic, TopicListItem},
    policy::Visibility,
    repositories::{poll_repository, post_repository},
    utils::PageWindow,
};

pub(crate) const TOPIC_COLUMNS: &str = "t.id, t.forum_id, t.user_id, t.name, t.created, t.updated, \
     t.views, t.sticky, t.closed, t.on_moderation, ST_AsText(t.place) AS place, \
     t.poll_type, t.poll_question";

// $1 is the viewer id (NULL for anonymous visitors).
const UNREAD_EXPR: &str = "($1::uuid IS NOT NULL \
     AND NOT EXISTS (SELECT 1 FROM topic_read_trackers tr \
         WHERE tr.topic_id = t.id AND tr.user_id = $1 AND tr.time_stamp >= t.updated) \
     AND NOT EXISTS (SELECT 1 FROM forum_read_trackers fr \
         WHERE fr.forum_id = t.forum_id AND fr.user_id = $1 AND fr.time_stamp >= t.updated))";

// $1 viewer id, $2 include hidden forums, $3 include topics on moderation.
const VISIBLE_TOPICS: &str = "($2 OR (NOT f.hidden AND NOT c.hidden)) \
     AND ($3 OR NOT t.on_moderation OR t.user_id = $1)";

#[derive(Debug, Clone)]
pub struct CreateTopicData {
    pub forum_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub body: String,
    pub user_ip: String,
    /// WKT, already validated.
    pub place: Option<String>,
    pub on_moderation: bool,
    pub poll_type: PollType,
    pub poll_question: Option<String>,
    pub poll_answers: Vec<String>,
}

/// Fields of a topic that are edited through its head post.
#[derive(Debug, Clone)]
pub struct UpdateTopicData {
    pub name: String,
    pub place: Option<String>,
    pub poll_type: PollType,
    pub poll_question: Option<String>,
}

/// Creates the topic, its poll answers and its head post in one transaction.
pub async fn create_topic(pool: &PgPool, data: &CreateTopicData) -> Result<(Topic, Post), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let topic = sqlx::query_as::<_, Topic>(&format!(
        r#"
        INSERT INTO topics AS t (forum_id, user_id, name, place, on_moderation, poll_type, poll_question)
        VALUES ($1, $2, $3, ST_GeomFromText($4, 4326), $5, $6, $7)
        RETURNING {}
        "#,
        TOPIC_COLUMNS
    ))
    .bind(data.forum_id)
    .bind(data.user_id)
    .bind(&data.name)
    .bind(&data.place)
    .bind(data.on_moderation)
    .bind(data.poll_type)
    .bind(&data.poll_question)
    .fetch_one(&mut *tx)
    .await?;

    if data.poll_type != PollType::None {
        poll_repository::insert_answers(&mut tx, topic.id, &data.poll_answers).await?;
    }

    let post = post_repository::insert_post(
        &mut tx,
        &post_repository::CreatePostData {
            topic_id: topic.id,
            user_id: data.user_id,
            body: data.body.clone(),
            user_ip: data.user_ip.clone(),
            on_moderation: data.on_moderation,
        },
    )
    .await?;

    // Head post and topic share the same activity time.
    let topic = sqlx::query_as::<_, Topic>(&format!(
        "UPDATE topics AS t SET updated = $1 WHERE t.id = $2 RETURNING {}",
        TOPIC_COLUMNS
    ))
    .bind(post.created)
    .bind(topic.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((topic, post))
}

pub async fn get_topic_by_id(pool: &PgPool, topic_id: Uuid) -> Result<Option<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(&format!("SELECT {} FROM topics t WHERE t.id = $1", TOPIC_COLUMNS))
        .bind(topic_id)
        .fetch_optional(pool)
        .await
}

pub async fn count_topics_in_forum(
    pool: &PgPool,
    forum_id: Uuid,
    visibility: &Visibility,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        r#"
        SELECT COUNT(*)
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        WHERE t.forum_id = $4 AND {}
        "#,
        VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(forum_id)
    .fetch_one(pool)
    .await
}

/// Sticky topics first, then most recently active.
pub async fn list_topics_in_forum(
    pool: &PgPool,
    forum_id: Uuid,
    visibility: &Visibility,
    window: &PageWindow,
) -> Result<Vec<TopicListItem>, sqlx::Error> {
    sqlx::query_as::<_, TopicListItem>(&format!(
        r#"
        SELECT {},
               (SELECT COUNT(*) FROM posts p WHERE p.topic_id = t.id) AS post_count,
               {} AS unread
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        WHERE t.forum_id = $4 AND {}
        ORDER BY t.sticky DESC, t.updated DESC, t.id
        LIMIT $5 OFFSET $6
        "#,
        TOPIC_COLUMNS, UNREAD_EXPR, VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(forum_id)
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await
}

pub async fn count_latest_topics(pool: &PgPool, visibility: &Visibility) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        r#"
        SELECT COUNT(*)
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        WHERE {}
        "#,
        VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .fetch_one(pool)
    .await
}

pub async fn list_latest_topics(
    pool: &PgPool,
    visibility: &Visibility,
    window: &PageWindow,
) -> Result<Vec<TopicListItem>, sqlx::Error> {
    sqlx::query_as::<_, TopicListItem>(&format!(
        r#"
        SELECT {},
               (SELECT COUNT(*) FROM posts p WHERE p.topic_id = t.id) AS post_count,
               {} AS unread
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        WHERE {}
        ORDER BY t.updated DESC, t.id
        LIMIT $4 OFFSET $5
        "#,
        TOPIC_COLUMNS, UNREAD_EXPR, VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await
}

pub async fn count_topics_in_area(
    pool: &PgPool,
    area_id: Uuid,
    visibility: &Visibility,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        r#"
        SELECT COUNT(*)
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        JOIN watch_areas w ON w.id = $4
        WHERE ST_Within(t.place, w.fence) AND {}
        "#,
        VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(area_id)
    .fetch_one(pool)
    .await
}

/// Topics whose place lies inside the area's fence, most recently active first.
pub async fn list_topics_in_area(
    pool: &PgPool,
    area_id: Uuid,
    visibility: &Visibility,
    window: &PageWindow,
) -> Result<Vec<TopicListItem>, sqlx::Error> {
    sqlx::query_as::<_, TopicListItem>(&format!(
        r#"
        SELECT {},
               (SELECT COUNT(*) FROM posts p WHERE p.topic_id = t.id) AS post_count,
               {} AS unread
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        JOIN watch_areas w ON w.id = $4
        WHERE ST_Within(t.place, w.fence) AND {}
        ORDER BY t.updated DESC, t.id
        LIMIT $5 OFFSET $6
        "#,
        TOPIC_COLUMNS, UNREAD_EXPR, VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(area_id)
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await
}

/// Topics with posts, most recent post first, optionally inside one area.
pub async fn list_featured_topics(
    pool: &PgPool,
    visibility: &Visibility,
    area_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(&format!(
        r#"
        SELECT {}
        FROM topics t
        JOIN forums f ON f.id = t.forum_id
        JOIN categories c ON c.id = f.category_id
        JOIN LATERAL (SELECT MAX(p.created) AS last_post FROM posts p WHERE p.topic_id = t.id) lp ON TRUE
        WHERE lp.last_post IS NOT NULL
          AND {}
          AND ($4::uuid IS NULL OR EXISTS (
              SELECT 1 FROM watch_areas w WHERE w.id = $4 AND ST_Within(t.place, w.fence)))
        ORDER BY lp.last_post DESC
        LIMIT $5
        "#,
        TOPIC_COLUMNS, VISIBLE_TOPICS
    ))
    .bind(visibility.viewer_id)
    .bind(visibility.include_hidden)
    .bind(visibility.include_moderated)
    .bind(area_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn increment_views(pool: &PgPool, topic_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE topics SET views = views + 1 WHERE id = $1")
        .bind(topic_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_sticky(pool: &PgPool, topic_id: Uuid, sticky: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE topics SET sticky = $1 WHERE id = $2")
        .bind(sticky)
        .bind(topic_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_closed(pool: &PgPool, topic_id: Uuid, closed: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE topics SET closed = $1 WHERE id = $2")
        .bind(closed)
        .bind(topic_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_on_moderation(
    conn: &mut PgConnection,
    topic_id: Uuid,
    on_moderation: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE topics SET on_moderation = $1 WHERE id = $2")
        .bind(on_moderation)
        .bind(topic_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Applies a head-post edit to the topic. Poll answers are replaced when
/// `poll_answers` is given and dropped when the poll is removed.
pub async fn update_topic(
    conn: &mut PgConnection,
    topic_id: Uuid,
    data: &UpdateTopicData,
    poll_answers: Option<&[String]>,
) -> Result<Topic, sqlx::Error> {
    let topic = sqlx::query_as::<_, Topic>(&format!(
        r#"
        UPDATE topics AS t
        SET name = $1, place = ST_GeomFromText($2, 4326), poll_type = $3, poll_question = $4
        WHERE t.id = $5
        RETURNING {}
        "#,
        TOPIC_COLUMNS
    ))
    .bind(&data.name)
    .bind(&data.place)
    .bind(data.poll_type)
    .bind(&data.poll_question)
    .bind(topic_id)
    .fetch_one(&mut *conn)
    .await?;

    if data.poll_type == PollType::None {
        poll_repository::delete_answers(&mut *conn, topic_id).await?;
    } else if let Some(answers) = poll_answers {
        poll_repository::delete_answers(&mut *conn, topic_id).await?;
        poll_repository::insert_answers(&mut *conn, topic_id, answers).await?;
    }
    Ok(topic)
}

pub async fn delete_topic(conn: &mut PgConnection, topic_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM topics WHERE id = $1")
        .bind(topic_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
