use reqwest::{Method, StatusCode};

use serde_json::Value;

use sqlx::PgPool;

use crate::helpers::TestApp;

#[sqlx::test(migrations = "./migrations")]
async fn subscribe_returns_the_normalized_subscriber(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .subscribe("Test.User@Test.com")
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(true, body["success"]);
    assert_eq!("Successfully subscribed", body["message"]);
    assert_eq!("test.user@test.com", body["subscriber"]["email"]);
    assert_eq!(true, body["subscriber"]["subscribed"]);
    assert!(body["subscriber"]["unsubscribedAt"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn subscribe_accepts_the_email_as_a_query_parameter(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::POST, "api/subscribers/subscribe")
        .query(&[("email", "query@x.com")])
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!("query@x.com", body["subscriber"]["email"]);

    let res = app
        .request(Method::POST, "api/subscribers/subscribe")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Email is required", body["message"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn subscribing_twice_is_rejected(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let first = app.subscribe("a@x.com").await.unwrap();
    assert_eq!(StatusCode::OK, first.status());

    let second = app.subscribe("A@X.com").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, second.status());

    let body: Value = second.json().await.unwrap();
    assert_eq!(false, body["success"]);
    assert_eq!("Email is already subscribed", body["message"]);

    let counts = app.subscriber_counts().await;
    assert_eq!(1, counts["totalSubscribed"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn subscribe_rejects_invalid_data(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let test_cases = vec![
        ("", "empty email"),
        ("   ", "blank email"),
        ("not-an-email", "missing @"),
        ("@domain.com", "missing local part"),
    ];
    for (email, description) in test_cases {
        let res = app.subscribe(email).await.unwrap();
        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "Did not reject payload with {}",
            description
        );
    }

    // No `email` field at all
    let res = app
        .request(Method::POST, "api/subscribers/subscribe")
        .form(&[("name", "Someone")])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(false, body["success"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn unsubscribing_an_unknown_email_fails_without_creating_it(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app.unsubscribe("nobody@x.com").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!("Subscriber not found", body["message"]);

    let all = app.get_json("api/subscribers/all").await;
    assert_eq!(0, all.as_array().unwrap().len());
}

#[sqlx::test(migrations = "./migrations")]
async fn unsubscribed_email_can_subscribe_again(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    app.subscribe("a@x.com").await.unwrap();

    let res = app.unsubscribe("a@x.com").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let counts = app.subscriber_counts().await;
    assert_eq!(0, counts["totalSubscribed"]);
    assert_eq!(1, counts["totalUnsubscribed"]);

    let all = app.get_json("api/subscribers/all").await;
    assert!(!all[0]["unsubscribedAt"].is_null());

    let res = app.subscribe("a@x.com").await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(true, body["subscriber"]["subscribed"]);
    assert!(body["subscriber"]["unsubscribedAt"].is_null());

    let counts = app.subscriber_counts().await;
    assert_eq!(1, counts["totalSubscribed"]);
    assert_eq!(0, counts["totalUnsubscribed"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleted_subscribers_are_gone(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app.subscribe("a@x.com").await.unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["subscriber"]["id"].as_str().unwrap().to_string();

    let path = format!("api/subscribers/{}", id);
    let res = app.request(Method::DELETE, &path).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let all = app.get_json("api/subscribers/all").await;
    assert_eq!(0, all.as_array().unwrap().len());

    let res = app.request(Method::DELETE, &path).send().await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
