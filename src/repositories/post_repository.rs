use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{models::Post, utils::PageWindow};

const POST_COLUMNS: &str = "id, topic_id, user_id, body, user_ip, created, updated, on_moderation";

#[derive(Debug, Clone)]
pub struct CreatePostData {
    pub topic_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub user_ip: String,
    pub on_moderation: bool,
}

pub(crate) async fn insert_post(
    conn: &mut PgConnection,
    data: &CreatePostData,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (topic_id, user_id, body, user_ip, on_moderation)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        POST_COLUMNS
    ))
    .bind(data.topic_id)
    .bind(data.user_id)
    .bind(&data.body)
    .bind(&data.user_ip)
    .bind(data.on_moderation)
    .fetch_one(&mut *conn)
    .await
}

/// Adds a reply and bumps the topic's activity time.
///
/// The second bump runs after commit: a read marker written while the insert
/// was still uncommitted can be newer than `post.created`, and must not cover
/// a post its reader could not have seen.
pub async fn create_post(pool: &PgPool, data: &CreatePostData) -> Result<Post, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let post = insert_post(&mut tx, data).await?;
    sqlx::query("UPDATE topics SET updated = $1 WHERE id = $2")
        .bind(post.created)
        .bind(post.topic_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    sqlx::query("UPDATE topics SET updated = GREATEST(updated, clock_timestamp()) WHERE id = $1")
        .bind(post.topic_id)
        .execute(pool)
        .await?;
    Ok(post)
}

pub async fn get_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// The earliest post of the topic.
pub async fn get_head_post(pool: &PgPool, topic_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "SELECT {} FROM posts WHERE topic_id = $1 ORDER BY created ASC, id ASC LIMIT 1",
        POST_COLUMNS
    ))
    .bind(topic_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_head_post_id(pool: &PgPool, topic_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM posts WHERE topic_id = $1 ORDER BY created ASC, id ASC LIMIT 1",
    )
    .bind(topic_id)
    .fetch_optional(pool)
    .await
}

/// Posts on moderation are listed only with `include_moderated` or to their author.
pub async fn count_posts(
    pool: &PgPool,
    topic_id: Uuid,
    viewer_id: Option<Uuid>,
    include_moderated: bool,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM posts
        WHERE topic_id = $1 AND ($3 OR NOT on_moderation OR user_id = $2)
        "#,
    )
    .bind(topic_id)
    .bind(viewer_id)
    .bind(include_moderated)
    .fetch_one(pool)
    .await
}

pub async fn list_posts(
    pool: &PgPool,
    topic_id: Uuid,
    viewer_id: Option<Uuid>,
    include_moderated: bool,
    window: &PageWindow,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {} FROM posts
        WHERE topic_id = $1 AND ($3 OR NOT on_moderation OR user_id = $2)
        ORDER BY created ASC, id ASC
        LIMIT $4 OFFSET $5
        "#,
        POST_COLUMNS
    ))
    .bind(topic_id)
    .bind(viewer_id)
    .bind(include_moderated)
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await
}

/// 1-based position of the post within its topic.
pub async fn position_in_topic(pool: &PgPool, post: &Post) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM posts
        WHERE topic_id = $1 AND (created, id) <= ($2, $3)
        "#,
    )
    .bind(post.topic_id)
    .bind(post.created)
    .bind(post.id)
    .fetch_one(pool)
    .await
}

pub async fn count_all_posts_in_topic(
    conn: &mut PgConnection,
    topic_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE topic_id = $1")
        .bind(topic_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn update_post_body(
    conn: &mut PgConnection,
    post_id: Uuid,
    body: &str,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "UPDATE posts SET body = $1, updated = NOW() WHERE id = $2 RETURNING {}",
        POST_COLUMNS
    ))
    .bind(body)
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn set_on_moderation(
    conn: &mut PgConnection,
    post_id: Uuid,
    on_moderation: bool,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "UPDATE posts SET on_moderation = $1 WHERE id = $2 RETURNING {}",
        POST_COLUMNS
    ))
    .bind(on_moderation)
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn delete_post(conn: &mut PgConnection, post_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
