use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{WatchArea, WatcherMatch};

const AREA_COLUMNS: &str = "w.id, w.user_id, w.name, ST_AsText(w.fence) AS fence, w.public, w.created_at";

#[derive(Deserialize, Debug, Clone)]
pub struct WatchAreaData {
    pub name: String,
    /// WKT polygon or multipolygon, SRID 4326.
    pub fence: String,
    #[serde(default)]
    pub public: bool,
}

/// Outcome of parsing a WKT string with PostGIS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryCheck {
    /// Parsed and valid; carries the geometry type (`POINT`, `POLYGON`, ...).
    Valid(String),
    Invalid,
}

/// Parses `wkt` without storing it. Unparsable input is `Invalid`, not an error.
pub async fn check_geometry(pool: &PgPool, wkt: &str) -> Result<GeometryCheck, sqlx::Error> {
    let row = sqlx::query_as::<_, (Option<bool>, Option<String>)>(
        "SELECT ST_IsValid(g), GeometryType(g) FROM (SELECT ST_GeomFromText($1, 4326) AS g) parsed",
    )
    .bind(wkt)
    .fetch_one(pool)
    .await;

    match row {
        Ok((Some(true), Some(kind))) => Ok(GeometryCheck::Valid(kind)),
        Ok(_) => Ok(GeometryCheck::Invalid),
        // PostGIS raises on parse errors
        Err(sqlx::Error::Database(_)) => Ok(GeometryCheck::Invalid),
        Err(e) => Err(e),
    }
}

/// Creates the area and registers its owner as a watcher.
pub async fn create_watch_area(
    pool: &PgPool,
    user_id: Uuid,
    data: &WatchAreaData,
) -> Result<WatchArea, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let area = sqlx::query_as::<_, WatchArea>(&format!(
        r#"
        INSERT INTO watch_areas AS w (user_id, name, fence, public)
        VALUES ($1, $2, ST_GeomFromText($3, 4326), $4)
        RETURNING {}
        "#,
        AREA_COLUMNS
    ))
    .bind(user_id)
    .bind(&data.name)
    .bind(&data.fence)
    .bind(data.public)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO watch_area_watchers (watch_area_id, user_id) VALUES ($1, $2)")
        .bind(area.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(area)
}

pub async fn get_watch_area_by_id(pool: &PgPool, area_id: Uuid) -> Result<Option<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!("SELECT {} FROM watch_areas w WHERE w.id = $1", AREA_COLUMNS))
        .bind(area_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_watch_area(
    pool: &PgPool,
    area_id: Uuid,
    data: &WatchAreaData,
) -> Result<Option<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!(
        r#"
        UPDATE watch_areas AS w
        SET name = $1, fence = ST_GeomFromText($2, 4326), public = $3
        WHERE w.id = $4
        RETURNING {}
        "#,
        AREA_COLUMNS
    ))
    .bind(&data.name)
    .bind(&data.fence)
    .bind(data.public)
    .bind(area_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_watch_area(pool: &PgPool, area_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watch_areas WHERE id = $1")
        .bind(area_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn add_watcher(pool: &PgPool, area_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO watch_area_watchers (watch_area_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(area_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_watcher(pool: &PgPool, area_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM watch_area_watchers WHERE watch_area_id = $1 AND user_id = $2")
        .bind(area_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_watching(pool: &PgPool, area_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM watch_area_watchers WHERE watch_area_id = $1 AND user_id = $2)",
    )
    .bind(area_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn list_public_watch_areas(pool: &PgPool) -> Result<Vec<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!(
        "SELECT {} FROM watch_areas w WHERE w.public ORDER BY w.name, w.created_at",
        AREA_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_owned_watch_areas(pool: &PgPool, user_id: Uuid) -> Result<Vec<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!(
        "SELECT {} FROM watch_areas w WHERE w.user_id = $1 ORDER BY w.created_at, w.id",
        AREA_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_watched_areas(pool: &PgPool, user_id: Uuid) -> Result<Vec<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!(
        r#"
        SELECT {}
        FROM watch_areas w
        JOIN watch_area_watchers ww ON ww.watch_area_id = w.id
        WHERE ww.user_id = $1
        ORDER BY w.created_at, w.id
        "#,
        AREA_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Areas intersecting the topic's place that the viewer may see: public ones
/// plus the viewer's own.
pub async fn list_areas_for_topic(
    pool: &PgPool,
    topic_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<Vec<WatchArea>, sqlx::Error> {
    sqlx::query_as::<_, WatchArea>(&format!(
        r#"
        SELECT {}
        FROM watch_areas w
        JOIN topics t ON t.id = $1
        WHERE ST_Intersects(w.fence, t.place)
          AND (w.public OR w.user_id = $2)
        ORDER BY w.created_at, w.id
        "#,
        AREA_COLUMNS
    ))
    .bind(topic_id)
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}

/// Every (area, watcher) pair for areas whose fence intersects the topic's
/// place, in area creation order.
pub async fn find_watchers_for_topic(pool: &PgPool, topic_id: Uuid) -> Result<Vec<WatcherMatch>, sqlx::Error> {
    sqlx::query_as::<_, WatcherMatch>(
        r#"
        SELECT w.id AS watch_area_id, w.name AS watch_area_name,
               u.id AS user_id, u.username, u.email, u.language
        FROM topics t
        JOIN watch_areas w ON ST_Intersects(w.fence, t.place)
        JOIN watch_area_watchers ww ON ww.watch_area_id = w.id
        JOIN users u ON u.id = ww.user_id
        WHERE t.id = $1
        ORDER BY w.created_at, w.id, u.username
        "#,
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await
}
