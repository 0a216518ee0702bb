use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Category;

#[derive(Deserialize, Debug, Clone)]
pub struct CreateCategoryData {
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub hidden: bool,
}

pub async fn create_category(
    pool: &PgPool,
    data: &CreateCategoryData,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, position, hidden)
        VALUES ($1, $2, $3)
        RETURNING id, name, position, hidden, created_at
        "#,
    )
    .bind(&data.name)
    .bind(data.position)
    .bind(data.hidden)
    .fetch_one(pool)
    .await
}

pub async fn get_category_by_id(
    pool: &PgPool,
    category_id: Uuid,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, position, hidden, created_at FROM categories WHERE id = $1",
    )
    .bind(category_id)
    .fetch_optional(pool)
    .await
}

/// Categories in display order. Hidden ones only when `include_hidden`.
pub async fn list_categories(
    pool: &PgPool,
    include_hidden: bool,
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, position, hidden, created_at
        FROM categories
        WHERE $1 OR NOT hidden
        ORDER BY position ASC, name ASC
        "#,
    )
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}
