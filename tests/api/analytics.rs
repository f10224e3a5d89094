use reqwest::{Method, StatusCode};

use sqlx::PgPool;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[sqlx::test(migrations = "./migrations")]
async fn dashboard_is_empty_before_any_delivery(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let dashboard = app.get_json("api/analytics/dashboard").await;

    assert_eq!(0, dashboard["totalEmailsSent"]);
    assert_eq!(0, dashboard["totalEmailsOpened"]);
    assert_eq!(0.0, dashboard["overallOpenRate"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn dashboard_aggregates_opens_over_all_deliveries(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        app.subscribe(email).await.unwrap();
    }

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&app.email_server)
        .await;

    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();
    app.newsletter_send(id).await.unwrap();
    app.wait_until_sent(id).await;

    let html = app
        .sent_html_bodies()
        .await
        .into_iter()
        .find(|body| body.contains("/b@x.com"))
        .expect("No email was sent to b@x.com");
    let res = app.client.get(app.tracking_link(&html)).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let dashboard = app.get_json("api/analytics/dashboard").await;
    assert_eq!(3, dashboard["totalEmailsSent"]);
    assert_eq!(1, dashboard["totalEmailsOpened"]);
    assert_eq!(33.33, dashboard["overallOpenRate"]);

    let analytics = app.newsletter_analytics(id).await;
    assert_eq!(id, analytics["newsletterId"]);
    assert_eq!(3, analytics["totalSent"]);
    assert_eq!(1, analytics["totalOpened"]);
    assert_eq!(33.33, analytics["openRate"]);
    assert_eq!(3, analytics["analytics"].as_array().unwrap().len());
}

#[sqlx::test(migrations = "./migrations")]
async fn tracking_unknown_deliveries_returns_the_pixel_without_recording(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;
    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();

    let test_cases = vec![
        format!("api/track/{}/nobody@x.com", id),
        "api/track/not-a-uuid/nobody@x.com".to_string(),
        format!("api/track/{}/not-an-email", id),
    ];
    for path in test_cases {
        let res = app.request(Method::GET, &path).send().await.unwrap();
        assert_eq!(StatusCode::OK, res.status(), "GET {}", path);
        assert_eq!("image/png", res.headers()["content-type"]);
    }

    let analytics = app.newsletter_analytics(id).await;
    assert_eq!(0, analytics["totalSent"]);
    assert_eq!(0.0, analytics["openRate"]);
}
