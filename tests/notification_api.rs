mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::helpers::{TestApp, EAST_SQUARE, FAR_SQUARE, SQUARE};

#[sqlx::test]
async fn test_reply_mails_valid_non_author_subscribers(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (starter, _) = app.register("starter", "starter@example.com").await;
    let (a_key, a) = app.register("alice", "alice@example.com").await;
    let (b_key, _) = app.register("bob", "bob@example.com").await;
    let (c_key, _) = app.register("carol", "carol@example.com").await;
    app.set_email(a.id, "alice-at-nowhere").await;

    let created = app.create_topic(&starter, forum.id, "Harbour works").await;
    for key in [&a_key, &b_key, &c_key] {
        app.subscribe(key, created.topic.id).await;
    }
    app.mailer.clear();

    let post = app.reply(Some(&b_key), created.topic.id, "Cranes arrive Monday").await;

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1, "{:?}", sent);
    assert_eq!(sent[0].to, vec!["carol@example.com".to_string()]);
    assert_eq!(sent[0].from, "forum@forum.test");
    assert_eq!(sent[0].subject, "[Test Forum] New reply in \"Harbour works\"");
    assert!(sent[0].body.contains("Cranes arrive Monday"));
    assert!(sent[0].body.contains(&format!("http://forum.test/post/{}", post.id)));
    assert!(sent[0]
        .body
        .contains(&format!("http://forum.test/subscription/topic/{}/delete", created.topic.id)));
}

#[sqlx::test]
async fn test_new_topic_does_not_mail_subscribers(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (starter, _) = app.register("starter", "starter@example.com").await;
    app.create_topic(&starter, forum.id, "Harbour works").await;
    assert!(app.mailer.sent().is_empty());
}

#[sqlx::test]
async fn test_subscriber_language_selects_template(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (starter, _) = app.register("starter", "starter@example.com").await;
    let (ivan_key, _) = app.register("ivan", "ivan@example.com").await;
    let response = app
        .post(
            "/profile/edit",
            Some(&ivan_key),
            Some(json!({ "email": "ivan@example.com", "language": "ru" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let created = app.create_topic(&starter, forum.id, "Причал").await;
    app.subscribe(&ivan_key, created.topic.id).await;
    app.reply(Some(&starter), created.topic.id, "Новости").await;

    let sent = app.mailer.sent_to("ivan@example.com");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Новый ответ в теме"));
    assert!(sent[0].body.starts_with("Здравствуйте, ivan!"));
}

#[sqlx::test]
async fn test_subject_never_contains_line_breaks(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (starter, _) = app.register("starter", "starter@example.com").await;
    let (reader, _) = app.register("reader", "reader@example.com").await;

    let created = app
        .create_topic_with(
            Some(&starter),
            forum.id,
            json!({ "name": "Line one\nBcc: victim@example.com\r\nthree", "body": "Body" }),
        )
        .await;
    app.subscribe(&reader, created.topic.id).await;
    app.reply(Some(&starter), created.topic.id, "reply").await;

    let sent = app.mailer.sent_to("reader@example.com");
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].subject.contains('\n'));
    assert!(!sent[0].subject.contains('\r'));
    assert!(sent[0].subject.contains("Line oneBcc: victim@example.comthree"));
}

#[sqlx::test]
async fn test_watcher_of_two_areas_gets_one_mail(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (author, _) = app.register("author", "author@example.com").await;
    let (erin_key, _) = app.register("erin", "erin@example.com").await;
    let (frank_key, _) = app.register("frank", "frank@example.com").await;

    app.create_watch_area(&erin_key, "West", SQUARE, false).await;
    app.create_watch_area(&erin_key, "East", EAST_SQUARE, false).await;
    app.create_watch_area(&frank_key, "Far away", FAR_SQUARE, false).await;
    // The author watches too but is never told about their own topic
    app.create_watch_area(&author, "Author's patch", SQUARE, false).await;

    app.create_topic_with(
        Some(&author),
        forum.id,
        json!({ "name": "Pothole", "body": "Deep one", "place": "POINT(7 5)" }),
    )
    .await;

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1, "{:?}", sent);
    assert_eq!(sent[0].to, vec!["erin@example.com".to_string()]);
    assert_eq!(sent[0].subject, "[Test Forum] New topic in your watch areas: West, East");
    assert!(sent[0].body.contains("Pothole"));
    assert!(sent[0].body.contains("http://forum.test/profile/edit"));
}

#[sqlx::test]
async fn test_topic_without_place_notifies_no_watchers(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (author, _) = app.register("author", "author@example.com").await;
    let (erin_key, _) = app.register("erin", "erin@example.com").await;
    app.create_watch_area(&erin_key, "West", SQUARE, true).await;

    app.create_topic(&author, forum.id, "Nowhere in particular").await;
    assert!(app.mailer.sent().is_empty());
}

#[sqlx::test]
async fn test_moving_topic_place_notifies_watchers(pool: PgPool) {
    let app = TestApp::new(pool).await;
    let forum = app.default_forum().await;
    let (author, _) = app.register("author", "author@example.com").await;
    let (erin_key, _) = app.register("erin", "erin@example.com").await;
    app.create_watch_area(&erin_key, "Far away", FAR_SQUARE, false).await;

    let created = app
        .create_topic_with(
            Some(&author),
            forum.id,
            json!({ "name": "Market", "body": "Saturdays", "place": "POINT(1 1)" }),
        )
        .await;
    assert!(app.mailer.sent().is_empty());

    // Body-only edit keeps the place: no mail
    let response = app
        .post(
            &format!("/post/{}/edit", created.post.id),
            Some(&author),
            Some(json!({ "body": "Saturdays and Sundays" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert!(app.mailer.sent().is_empty());

    let response = app
        .post(
            &format!("/post/{}/edit", created.post.id),
            Some(&author),
            Some(json!({ "body": "Moved", "place": "POINT(55 55)" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert_eq!(app.mailer.sent_to("erin@example.com").len(), 1);
}

#[sqlx::test]
async fn test_premoderated_reply_notifies_on_approval(pool: PgPool) {
    let app = TestApp::with_settings(
        pool,
        &[("FORUM_ENABLE_ANONYMOUS_POST", "true"), ("FORUM_PREMODERATION", "true")],
    )
    .await;
    let forum = app.default_forum().await;
    let (starter, _) = app.register("starter", "starter@example.com").await;
    let created = app.create_topic(&starter, forum.id, "Ferry strike").await;
    app.subscribe(&starter, created.topic.id).await;

    let post = app.reply(None, created.topic.id, "Is it over?").await;
    assert!(post.on_moderation);
    assert!(app.mailer.sent().is_empty());

    let response = app.post(&format!("/post/{}/moderate", post.id), Some(&app.admin), None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), format!("/post/{}", post.id));

    let sent = app.mailer.sent_to("starter@example.com");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Is it over?"));

    // Approving twice sends nothing new
    app.post(&format!("/post/{}/moderate", post.id), Some(&app.admin), None).await;
    assert_eq!(app.mailer.sent_to("starter@example.com").len(), 1);
}
