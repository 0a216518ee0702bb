use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Idempotent.
pub async fn subscribe(pool: &PgPool, topic_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO topic_subscribers (topic_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(topic_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unsubscribe(pool: &PgPool, topic_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM topic_subscribers WHERE topic_id = $1 AND user_id = $2")
        .bind(topic_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_subscribed(pool: &PgPool, topic_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM topic_subscribers WHERE topic_id = $1 AND user_id = $2)",
    )
    .bind(topic_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn list_topic_subscribers(pool: &PgPool, topic_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.public_key, u.username, u.email, u.language,
               u.is_staff, u.is_superuser, u.is_active, u.created_at
        FROM topic_subscribers s
        JOIN users u ON u.id = s.user_id
        WHERE s.topic_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await
}
