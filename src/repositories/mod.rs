pub mod category_repository;
pub mod forum_repository;
pub mod poll_repository;
pub mod post_repository;
pub mod read_tracker_repository;
pub mod subscription_repository;
pub mod topic_repository;
pub mod user_repository;
pub mod watch_area_repository;
