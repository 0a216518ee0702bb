//! Authorization predicates evaluated at the top of handlers.
//!
//! Every predicate takes the viewer as `Option<&User>`; `None` is an
//! anonymous visitor.

use uuid::Uuid;

use crate::models::{Post, User, WatchArea};

pub fn is_staff(user: Option<&User>) -> bool {
    user.map_or(false, |u| u.is_staff || u.is_superuser)
}

pub fn is_superuser(user: Option<&User>) -> bool {
    user.map_or(false, |u| u.is_superuser)
}

pub fn is_owner(user: Option<&User>, owner_id: Uuid) -> bool {
    user.map_or(false, |u| u.id == owner_id)
}

/// Superusers moderate everything; others only the forums they are listed on.
pub fn is_moderator(user: Option<&User>, moderator_ids: &[Uuid]) -> bool {
    match user {
        Some(u) => u.is_superuser || moderator_ids.contains(&u.id),
        None => false,
    }
}

/// Hidden categories and forums are visible to staff only.
pub fn can_view_hidden(user: Option<&User>) -> bool {
    is_staff(user)
}

pub fn can_edit_post(user: Option<&User>, post: &Post, moderator_ids: &[Uuid]) -> bool {
    is_owner(user, post.user_id) || is_moderator(user, moderator_ids)
}

pub fn can_access_watch_area(user: Option<&User>, area: &WatchArea) -> bool {
    area.public || can_manage_watch_area(user, area)
}

pub fn can_manage_watch_area(user: Option<&User>, area: &WatchArea) -> bool {
    is_superuser(user) || is_owner(user, area.user_id)
}

/// What a viewer may list, passed to the query functions in `repositories`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Visibility {
    pub viewer_id: Option<Uuid>,
    pub include_hidden: bool,
    pub include_moderated: bool,
}

impl Visibility {
    pub fn for_viewer(user: Option<&User>) -> Self {
        Self {
            viewer_id: user.map(|u| u.id),
            include_hidden: can_view_hidden(user),
            include_moderated: is_superuser(user),
        }
    }
}
