use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Forum;

#[derive(Deserialize, Debug, Clone)]
pub struct CreateForumData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub hidden: bool,
}

const FORUM_COLUMNS: &str = "f.id, f.category_id, f.name, f.description, f.position, f.hidden, f.created_at";

pub async fn create_forum(
    pool: &PgPool,
    category_id: Uuid,
    data: &CreateForumData,
) -> Result<Forum, sqlx::Error> {
    sqlx::query_as::<_, Forum>(
        r#"
        INSERT INTO forums (category_id, name, description, position, hidden)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, category_id, name, description, position, hidden, created_at
        "#,
    )
    .bind(category_id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.position)
    .bind(data.hidden)
    .fetch_one(pool)
    .await
}

pub async fn get_forum_by_id(pool: &PgPool, forum_id: Uuid) -> Result<Option<Forum>, sqlx::Error> {
    sqlx::query_as::<_, Forum>(&format!("SELECT {} FROM forums f WHERE f.id = $1", FORUM_COLUMNS))
        .bind(forum_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_forums_in_category(
    pool: &PgPool,
    category_id: Uuid,
    include_hidden: bool,
) -> Result<Vec<Forum>, sqlx::Error> {
    sqlx::query_as::<_, Forum>(&format!(
        r#"
        SELECT {}
        FROM forums f
        WHERE f.category_id = $1 AND ($2 OR NOT f.hidden)
        ORDER BY f.position ASC, f.name ASC
        "#,
        FORUM_COLUMNS
    ))
    .bind(category_id)
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}

/// Every forum whose forum and category are both visible.
pub async fn list_visible_forums(
    pool: &PgPool,
    include_hidden: bool,
) -> Result<Vec<Forum>, sqlx::Error> {
    sqlx::query_as::<_, Forum>(&format!(
        r#"
        SELECT {}
        FROM forums f
        JOIN categories c ON c.id = f.category_id
        WHERE $1 OR (NOT f.hidden AND NOT c.hidden)
        ORDER BY c.position ASC, f.position ASC, f.name ASC
        "#,
        FORUM_COLUMNS
    ))
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}

pub async fn list_moderator_ids(pool: &PgPool, forum_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM forum_moderators WHERE forum_id = $1")
        .bind(forum_id)
        .fetch_all(pool)
        .await
}

pub async fn add_moderator(pool: &PgPool, forum_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO forum_moderators (forum_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(forum_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
