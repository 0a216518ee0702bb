//! Site-relative paths of the resources that mails and redirects point at.

use uuid::Uuid;

pub fn topic(topic_id: Uuid) -> String {
    format!("/topic/{}", topic_id)
}

pub fn topic_page(topic_id: Uuid, page: u64) -> String {
    if page <= 1 {
        topic(topic_id)
    } else {
        format!("/topic/{}?page={}", topic_id, page)
    }
}

pub fn post(post_id: Uuid) -> String {
    format!("/post/{}", post_id)
}

/// Where `GET /post/:id` sends the browser: the topic page holding the post.
pub fn post_in_topic(topic_id: Uuid, page: u64, post_id: Uuid) -> String {
    format!("/topic/{}?page={}#post-{}", topic_id, page, post_id)
}

pub fn forum(forum_id: Uuid) -> String {
    format!("/forum/{}", forum_id)
}

pub fn delete_subscription(topic_id: Uuid) -> String {
    format!("/subscription/topic/{}/delete", topic_id)
}

pub fn edit_profile() -> String {
    "/profile/edit".to_string()
}

pub fn watch_area(area_id: Uuid) -> String {
    format!("/watch_area/{}", area_id)
}
