pub const MAX_TOPIC_NAME_LENGTH: usize = 255;
pub const MAX_POST_BODY_LENGTH: usize = 65536;
pub const MIN_POLL_ANSWERS: usize = 2;
pub const MAX_POLL_ANSWERS: usize = 10;
pub const MAX_USERNAME_LENGTH: usize = 30;
/// Topics shown on the index page.
pub const FEATURED_TOPICS_LIMIT: i64 = 5;
