use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

const USER_COLUMNS: &str =
    "id, public_key, username, email, language, is_staff, is_superuser, is_active, created_at";

#[derive(Deserialize, Debug, Clone)]
pub struct CreateUserData {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Registers a user for a verified public key.
pub async fn create_user(
    pool: &PgPool,
    public_key: &[u8],
    data: &CreateUserData,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (public_key, username, email, language)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(public_key)
    .bind(&data.username)
    .bind(&data.email)
    .bind(&data.language)
    .fetch_one(pool)
    .await
}

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_public_key(
    pool: &PgPool,
    public_key: &[u8],
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE public_key = $1",
        USER_COLUMNS
    ))
    .bind(public_key)
    .fetch_optional(pool)
    .await
}

pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// The keyless account anonymous posts are attributed to, created on first use.
pub async fn get_or_create_anonymous(pool: &PgPool, username: &str) -> Result<User, sqlx::Error> {
    sqlx::query("INSERT INTO users (username) VALUES ($1) ON CONFLICT (username) DO NOTHING")
        .bind(username)
        .execute(pool)
        .await?;
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_one(pool)
    .await
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    language: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET email = $1, language = $2 WHERE id = $3 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(email)
    .bind(language)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Returns the number of rows affected.
pub async fn set_active(pool: &PgPool, user_id: Uuid, active: bool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
        .bind(active)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_topics_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM topics WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}
