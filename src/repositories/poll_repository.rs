use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{PollAnswer, PollAnswerResult};

pub(crate) async fn insert_answers(
    conn: &mut PgConnection,
    topic_id: Uuid,
    answers: &[String],
) -> Result<(), sqlx::Error> {
    for (position, text) in answers.iter().enumerate() {
        sqlx::query("INSERT INTO poll_answers (topic_id, text, position) VALUES ($1, $2, $3)")
            .bind(topic_id)
            .bind(text)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn delete_answers(conn: &mut PgConnection, topic_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM poll_answers WHERE topic_id = $1")
        .bind(topic_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn list_answers(pool: &PgPool, topic_id: Uuid) -> Result<Vec<PollAnswer>, sqlx::Error> {
    sqlx::query_as::<_, PollAnswer>(
        "SELECT id, topic_id, text, position FROM poll_answers WHERE topic_id = $1 ORDER BY position",
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await
}

/// Answers with their vote counts, in display order.
pub async fn list_results(pool: &PgPool, topic_id: Uuid) -> Result<Vec<PollAnswerResult>, sqlx::Error> {
    sqlx::query_as::<_, PollAnswerResult>(
        r#"
        SELECT a.id, a.text, COUNT(v.id) AS votes
        FROM poll_answers a
        LEFT JOIN poll_answer_users v ON v.poll_answer_id = a.id
        WHERE a.topic_id = $1
        GROUP BY a.id, a.text, a.position
        ORDER BY a.position
        "#,
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await
}

pub async fn has_voted(pool: &PgPool, topic_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM poll_answer_users v
            JOIN poll_answers a ON a.id = v.poll_answer_id
            WHERE a.topic_id = $1 AND v.user_id = $2
        )
        "#,
    )
    .bind(topic_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn get_answers_by_ids(pool: &PgPool, answer_ids: &[Uuid]) -> Result<Vec<PollAnswer>, sqlx::Error> {
    sqlx::query_as::<_, PollAnswer>(
        "SELECT id, topic_id, text, position FROM poll_answers WHERE id = ANY($1)",
    )
    .bind(answer_ids)
    .fetch_all(pool)
    .await
}

/// Records one vote per answer, all or nothing.
pub async fn record_votes(pool: &PgPool, answer_ids: &[Uuid], user_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for answer_id in answer_ids {
        sqlx::query("INSERT INTO poll_answer_users (poll_answer_id, user_id) VALUES ($1, $2)")
            .bind(answer_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}
