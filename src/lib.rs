use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::{collections::HashSet, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod notify;
pub mod policy;
pub mod read_tracking;
pub mod repositories;
pub mod urls;
pub mod utils;

use auth::{get_challenge_handler, ChallengeStore};
use config::Config;
use handlers::{
    admin_handlers, category_handlers, forum_handlers, post_handlers, subscription_handlers,
    topic_handlers, user_handlers, watch_area_handlers,
};
use mail::Mailer;
use notify::Notifier;

const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub challenge_store: ChallengeStore,
    pub admin_pubkeys: Arc<HashSet<Vec<u8>>>,
    pub config: Arc<Config>,
    pub notifier: Notifier,
}

impl AppState {
    /// Must be called from within a tokio runtime.
    pub fn new(db_pool: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let admin_pubkeys = config.admin_pubkey_set()?;
        let notifier = Notifier::new(&config, mailer)?;
        Ok(Self {
            db_pool,
            challenge_store: ChallengeStore::new(),
            admin_pubkeys: Arc::new(admin_pubkeys),
            config: Arc::new(config),
            notifier,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(category_handlers::index_handler))
        .route("/category/:id", get(category_handlers::get_category_handler))
        .route("/forum/:id", get(forum_handlers::get_forum_handler))
        .route("/forum/:id/topic/add", post(topic_handlers::create_topic_handler))
        .route("/topic/latest", get(topic_handlers::latest_topics_handler))
        .route("/topic/:id", get(topic_handlers::get_topic_handler))
        .route("/topic/:id/stick", post(topic_handlers::stick_topic_handler))
        .route("/topic/:id/unstick", post(topic_handlers::unstick_topic_handler))
        .route("/topic/:id/close", post(topic_handlers::close_topic_handler))
        .route("/topic/:id/open", post(topic_handlers::open_topic_handler))
        .route("/topic/:id/poll_vote", post(topic_handlers::poll_vote_handler))
        .route(
            "/topic/:id/post/add",
            get(post_handlers::new_post_form_handler).post(post_handlers::create_post_handler),
        )
        .route("/post/:id", get(post_handlers::get_post_handler))
        .route("/post/:id/edit", post(post_handlers::edit_post_handler))
        .route("/post/:id/delete", post(post_handlers::delete_post_handler))
        .route("/post/:id/moderate", post(post_handlers::moderate_post_handler))
        .route(
            "/subscription/topic/:id/add",
            get(subscription_handlers::add_subscription_handler)
                .post(subscription_handlers::add_subscription_handler),
        )
        .route(
            "/subscription/topic/:id/delete",
            get(subscription_handlers::delete_subscription_handler)
                .post(subscription_handlers::delete_subscription_handler),
        )
        .route("/watch_area/add", post(watch_area_handlers::create_watch_area_handler))
        .route("/watch_area/:id", get(watch_area_handlers::get_watch_area_handler))
        .route("/watch_area/:id/edit", post(watch_area_handlers::edit_watch_area_handler))
        .route("/watch_area/:id/delete", post(watch_area_handlers::delete_watch_area_handler))
        .route(
            "/watch_area/:id/subscription/add",
            get(watch_area_handlers::add_watch_area_subscription_handler)
                .post(watch_area_handlers::add_watch_area_subscription_handler),
        )
        .route(
            "/watch_area/:id/subscription/delete",
            get(watch_area_handlers::delete_watch_area_subscription_handler)
                .post(watch_area_handlers::delete_watch_area_subscription_handler),
        )
        .route("/users", post(user_handlers::register_user_handler))
        .route("/users/:username", get(user_handlers::get_user_handler))
        .route("/block_user/:username", post(user_handlers::block_user_handler))
        .route(
            "/profile/edit",
            get(user_handlers::get_profile_handler).post(user_handlers::edit_profile_handler),
        )
        .route("/mark_all_as_read", post(user_handlers::mark_all_as_read_handler))
        .route("/auth/challenge", get(get_challenge_handler))
        .route("/categories", post(admin_handlers::create_category_handler))
        .route("/categories/:id/forums", post(admin_handlers::create_forum_handler))
        .route("/forum/:id/moderators", post(admin_handlers::add_moderator_handler))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}
