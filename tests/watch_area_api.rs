mod common;

use axum::http::StatusCode;
use geoforum::{
    handlers::{topic_handlers::TopicResponse, user_handlers::ProfileResponse, watch_area_handlers::WatchAreaResponse},
    repositories::watch_area_repository,
};
use serde_json::json;
use sqlx::PgPool;

use common::helpers::{TestApp, FAR_SQUARE, SQUARE};

#[sqlx::test]
async fn test_creator_watches_new_area(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (key, user) = app.register("erin", "erin@example.com").await;

    let response = app
        .post(
            "/watch_area/add",
            Some(&key),
            Some(json!({ "name": "Old Town", "fence": SQUARE })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let area: geoforum::models::WatchArea = response.json();
    assert_eq!(response.location(), format!("/watch_area/{}", area.id));
    assert!(!area.public);
    assert!(area.fence.starts_with("POLYGON"));
    assert!(watch_area_repository::is_watching(&app.pool, area.id, user.id).await.unwrap());

    let profile: ProfileResponse = app.get("/profile/edit", Some(&key)).await.json();
    assert_eq!(profile.own_watch_areas.len(), 1);
    assert_eq!(profile.watched_areas.len(), 1);
}

#[sqlx::test]
async fn test_fence_must_be_a_valid_polygon(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (key, _) = app.register("erin", "erin@example.com").await;

    for fence in ["POINT(1 1)", "POLYGON((0 0, 1 1", "not wkt at all"] {
        let response = app
            .post(
                "/watch_area/add",
                Some(&key),
                Some(json!({ "name": "Broken", "fence": fence })),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "fence {:?}", fence);
    }

    let response = app
        .post(
            "/watch_area/add",
            Some(&key),
            Some(json!({ "name": "  ", "fence": SQUARE })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[sqlx::test]
async fn test_private_area_access(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (owner, _) = app.register("owner", "owner@example.com").await;
    let (stranger, _) = app.register("stranger", "stranger@example.com").await;
    let private = app.create_watch_area(&owner, "Backyard", SQUARE, false).await;
    let public = app.create_watch_area(&owner, "Park", SQUARE, true).await;

    let uri = format!("/watch_area/{}", private.id);
    assert_eq!(app.get(&uri, Some(&stranger)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, Some(&owner)).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, Some(&app.admin)).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, None).await.status, StatusCode::UNAUTHORIZED);

    let view: WatchAreaResponse = app.get(&format!("/watch_area/{}", public.id), Some(&stranger)).await.json();
    assert!(!view.can_manage);
    assert!(!view.is_watching);

    let response = app
        .post(&format!("/watch_area/{}/subscription/add", private.id), Some(&stranger), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .ajax_post(&format!("/watch_area/{}/subscription/add", public.id), Some(&stranger))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let view: WatchAreaResponse = app.get(&format!("/watch_area/{}", public.id), Some(&stranger)).await.json();
    assert!(view.is_watching);

    // A plain link click is redirected back to the area
    let response = app
        .get(&format!("/watch_area/{}/subscription/delete", public.id), Some(&stranger))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), format!("/watch_area/{}", public.id));
    let view: WatchAreaResponse = app.get(&format!("/watch_area/{}", public.id), Some(&stranger)).await.json();
    assert!(!view.is_watching);
}

#[sqlx::test]
async fn test_edit_and_delete_are_owner_only(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let (owner, _) = app.register("owner", "owner@example.com").await;
    let (stranger, _) = app.register("stranger", "stranger@example.com").await;
    let area = app.create_watch_area(&owner, "Backyard", SQUARE, true).await;

    let edit = json!({ "name": "Front yard", "fence": FAR_SQUARE, "public": false });
    let response = app
        .post(&format!("/watch_area/{}/edit", area.id), Some(&stranger), Some(edit.clone()))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .post(&format!("/watch_area/{}/edit", area.id), Some(&owner), Some(edit))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let updated: geoforum::models::WatchArea = response.json();
    assert_eq!(updated.name, "Front yard");
    assert!(!updated.public);

    let response = app.post(&format!("/watch_area/{}/delete", area.id), Some(&stranger), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.post(&format!("/watch_area/{}/delete", area.id), Some(&owner), None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/profile/edit");
    assert!(watch_area_repository::get_watch_area_by_id(&app.pool, area.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
async fn test_area_lists_topics_inside_fence(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (author, _) = app.register("author", "author@example.com").await;
    let area = app.create_watch_area(&author, "Old Town", SQUARE, true).await;

    let inside = app
        .create_topic_with(
            Some(&author),
            forum.id,
            json!({ "name": "Fountain", "body": "Dry", "place": "POINT(2 3)" }),
        )
        .await;
    app.create_topic_with(
        Some(&author),
        forum.id,
        json!({ "name": "Lighthouse", "body": "Bright", "place": "POINT(55 55)" }),
    )
    .await;
    app.create_topic(&author, forum.id, "No place").await;

    let view: WatchAreaResponse = app.get(&format!("/watch_area/{}", area.id), Some(&author)).await.json();
    assert_eq!(view.topics.total, 1);
    assert_eq!(view.topics.items[0].topic.id, inside.topic.id);

    // The topic page shows the public areas around its place
    let topic: TopicResponse = app.get(&format!("/topic/{}", inside.topic.id), None).await.json();
    assert_eq!(topic.watch_areas.len(), 1);
    assert_eq!(topic.watch_areas[0].id, area.id);

    // Index filtered by area
    let index: serde_json::Value = app.get(&format!("/?watch_area={}", area.id), None).await.json();
    let featured = index["featured_topics"].as_array().unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0]["name"], "Fountain");
}

#[sqlx::test]
async fn test_invalid_place_is_rejected(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (author, _) = app.register("author", "author@example.com").await;

    let response = app
        .post(
            &format!("/forum/{}/topic/add", forum.id),
            Some(&author),
            Some(json!({ "name": "Somewhere", "body": "text", "place": "POINT(1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
