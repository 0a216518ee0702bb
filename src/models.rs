use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. Anonymous posts are attributed to a shared account
/// without a public key.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub public_key: Option<Vec<u8>>,
    pub username: String,
    pub email: String,
    pub language: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The part of a user that anyone may see.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub position: i32,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Forum {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum PollType {
    None = 0,
    Single = 1,
    Multiple = 2,
}

impl Default for PollType {
    fn default() -> Self {
        PollType::None
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub forum_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub views: i32,
    pub sticky: bool,
    pub closed: bool,
    pub on_moderation: bool,
    /// Location as WKT (SRID 4326).
    pub place: Option<String>,
    pub poll_type: PollType,
    pub poll_question: Option<String>,
}

/// A topic row in a listing, with per-viewer read state.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct TopicListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub topic: Topic,
    pub post_count: i64,
    pub unread: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    #[serde(skip_serializing, default)]
    pub user_ip: String,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub on_moderation: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct TopicReadTracker {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic_id: Uuid,
    pub time_stamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ForumReadTracker {
    pub id: Uuid,
    pub user_id: Uuid,
    pub forum_id: Uuid,
    pub time_stamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct WatchArea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Boundary polygon as WKT (SRID 4326).
    pub fence: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct PollAnswer {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub text: String,
    pub position: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct PollAnswerResult {
    pub id: Uuid,
    pub text: String,
    pub votes: i64,
}

/// One (watch area, watcher) pair whose area fence intersects a topic's place.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WatcherMatch {
    pub watch_area_id: Uuid,
    pub watch_area_name: String,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub language: Option<String>,
}
