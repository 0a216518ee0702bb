//! Shared helpers for integration tests.
#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{self, header::HeaderName, HeaderMap, HeaderValue, Request, StatusCode},
    Router,
};
use ed25519_dalek::{Signer, SigningKey};
use geoforum::{
    auth::ChallengeResponse,
    config::Config,
    create_router,
    handlers::topic_handlers::CreatedTopic,
    mail::MemoryMailer,
    models::{Category, Forum, Post, User, WatchArea},
    AppState,
};
use envconfig::Envconfig;
use http_body_util::BodyExt;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;
use uuid::Uuid;

const HEADER_PUBKEY_LOWER: &str = "x-geoforum-pubkey-base64";
const HEADER_SIGNATURE_LOWER: &str = "x-geoforum-signature-base64";
const HEADER_CHALLENGE_ID_LOWER: &str = "x-geoforum-challenge-id";

pub const SQUARE: &str = "POLYGON((0 0, 0 10, 10 10, 10 0, 0 0))";
pub const EAST_SQUARE: &str = "POLYGON((5 0, 5 10, 15 10, 15 0, 5 0))";
pub const FAR_SQUARE: &str = "POLYGON((50 50, 50 60, 60 60, 60 50, 50 50))";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn location(&self) -> String {
        self.headers
            .get(http::header::LOCATION)
            .expect("response has no Location header")
            .to_str()
            .unwrap()
            .to_string()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub mailer: MemoryMailer,
    pub admin: SigningKey,
}

pub fn generate_test_keypair() -> SigningKey {
    let mut csprng = OsRng {};
    SigningKey::generate(&mut csprng)
}

impl TestApp {
    pub async fn new(pool: PgPool) -> Self {
        Self::with_settings(pool, &[]).await
    }

    /// `settings` override configuration variables, e.g. `("FORUM_PREMODERATION", "true")`.
    pub async fn with_settings(pool: PgPool, settings: &[(&str, &str)]) -> Self {
        let admin = generate_test_keypair();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("FORUM_SITE_NAME".to_string(), "Test Forum".to_string()),
            ("FORUM_SITE_DOMAIN".to_string(), "forum.test".to_string()),
            ("FORUM_DEFAULT_FROM_EMAIL".to_string(), "forum@forum.test".to_string()),
            ("FORUM_MAIL_BACKEND".to_string(), "memory".to_string()),
            ("FORUM_PAGE_SIZE".to_string(), "5".to_string()),
            ("FORUM_TOPIC_PAGE_SIZE".to_string(), "3".to_string()),
            (
                "FORUM_ADMIN_PUBKEYS".to_string(),
                base64::encode(admin.verifying_key().to_bytes()),
            ),
        ]);
        for (key, value) in settings {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::init_from_hashmap(&vars).expect("Failed to build test config");

        let mailer = MemoryMailer::new();
        let state = AppState::new(pool.clone(), config, Arc::new(mailer.clone()))
            .expect("Failed to build app state");

        let app = Self {
            router: create_router(state),
            pool,
            mailer,
            admin,
        };
        let admin_key = app.admin.clone();
        app.register_with_key(&admin_key, "admin", "admin@example.com").await;
        app
    }

    pub async fn auth_headers(&self, keypair: &SigningKey) -> HeaderMap {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(http::Method::GET)
                    .uri("/auth/challenge")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "Failed to get challenge");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let challenge: ChallengeResponse =
            serde_json::from_slice(&body).expect("Failed to deserialize challenge response");

        let nonce = base64::decode(&challenge.nonce_base64).expect("Failed to decode nonce");
        let signature = keypair.sign(&nonce);

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(HEADER_PUBKEY_LOWER),
            HeaderValue::from_str(&base64::encode(keypair.verifying_key().to_bytes())).unwrap(),
        );
        headers.insert(
            HeaderName::from_static(HEADER_SIGNATURE_LOWER),
            HeaderValue::from_str(&base64::encode(signature.to_bytes())).unwrap(),
        );
        headers.insert(
            HeaderName::from_static(HEADER_CHALLENGE_ID_LOWER),
            HeaderValue::from_str(&challenge.challenge_id.to_string()).unwrap(),
        );
        headers
    }

    /// Sends one request, signed by `keypair` when given.
    pub async fn request(
        &self,
        method: http::Method,
        uri: &str,
        keypair: Option<&SigningKey>,
        body: Option<Value>,
    ) -> TestResponse {
        self.request_with_headers(method, uri, keypair, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: http::Method,
        uri: &str,
        keypair: Option<&SigningKey>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        if let Some(keypair) = keypair {
            for (name, value) in self.auth_headers(keypair).await.iter() {
                builder = builder.header(name, value);
            }
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, keypair: Option<&SigningKey>) -> TestResponse {
        self.request(http::Method::GET, uri, keypair, None).await
    }

    pub async fn post(&self, uri: &str, keypair: Option<&SigningKey>, body: Option<Value>) -> TestResponse {
        self.request(http::Method::POST, uri, keypair, body).await
    }

    /// POST as a script would send it, with `X-Requested-With: XMLHttpRequest`.
    pub async fn ajax_post(&self, uri: &str, keypair: Option<&SigningKey>) -> TestResponse {
        self.request_with_headers(
            http::Method::POST,
            uri,
            keypair,
            None,
            &[("x-requested-with", "XMLHttpRequest")],
        )
        .await
    }

    pub async fn register_with_key(&self, keypair: &SigningKey, username: &str, email: &str) -> User {
        let response = self
            .post(
                "/users",
                Some(keypair),
                Some(json!({ "username": username, "email": email })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to register: {}", response.text());
        response.json()
    }

    pub async fn register(&self, username: &str, email: &str) -> (SigningKey, User) {
        let keypair = generate_test_keypair();
        let user = self.register_with_key(&keypair, username, email).await;
        (keypair, user)
    }

    /// Bypasses validation to store an address the forms would reject.
    pub async fn set_email(&self, user_id: Uuid, email: &str) {
        sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
            .bind(email)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn create_category(&self, name: &str, hidden: bool) -> Category {
        let response = self
            .post(
                "/categories",
                Some(&self.admin),
                Some(json!({ "name": name, "hidden": hidden })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to create category: {}", response.text());
        response.json()
    }

    pub async fn create_forum(&self, category_id: Uuid, name: &str, hidden: bool) -> Forum {
        let response = self
            .post(
                &format!("/categories/{}/forums", category_id),
                Some(&self.admin),
                Some(json!({ "name": name, "hidden": hidden })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to create forum: {}", response.text());
        response.json()
    }

    /// A visible category with one visible forum.
    pub async fn default_forum(&self) -> Forum {
        let category = self.create_category("General", false).await;
        self.create_forum(category.id, "Town square", false).await
    }

    pub async fn add_moderator(&self, forum_id: Uuid, username: &str) {
        let response = self
            .post(
                &format!("/forum/{}/moderators", forum_id),
                Some(&self.admin),
                Some(json!({ "username": username })),
            )
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT, "Failed to add moderator: {}", response.text());
    }

    pub async fn create_topic_with(
        &self,
        keypair: Option<&SigningKey>,
        forum_id: Uuid,
        payload: Value,
    ) -> CreatedTopic {
        let response = self
            .post(&format!("/forum/{}/topic/add", forum_id), keypair, Some(payload))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to create topic: {}", response.text());
        response.json()
    }

    pub async fn create_topic(&self, keypair: &SigningKey, forum_id: Uuid, name: &str) -> CreatedTopic {
        self.create_topic_with(
            Some(keypair),
            forum_id,
            json!({ "name": name, "body": format!("Opening post of {}", name) }),
        )
        .await
    }

    pub async fn reply(&self, keypair: Option<&SigningKey>, topic_id: Uuid, body: &str) -> Post {
        let response = self
            .post(
                &format!("/topic/{}/post/add", topic_id),
                keypair,
                Some(json!({ "body": body })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to reply: {}", response.text());
        response.json()
    }

    pub async fn subscribe(&self, keypair: &SigningKey, topic_id: Uuid) {
        let response = self
            .ajax_post(&format!("/subscription/topic/{}/add", topic_id), Some(keypair))
            .await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    pub async fn create_watch_area(&self, keypair: &SigningKey, name: &str, fence: &str, public: bool) -> WatchArea {
        let response = self
            .post(
                "/watch_area/add",
                Some(keypair),
                Some(json!({ "name": name, "fence": fence, "public": public })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "Failed to create watch area: {}", response.text());
        response.json()
    }
}
