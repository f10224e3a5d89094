use reqwest::{Method, StatusCode};

use serde_json::Value;

use sqlx::PgPool;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{MediaFile, NewsletterForm, TestApp};

fn png() -> MediaFile {
    MediaFile {
        filename: "cover.png".into(),
        mime: "image/png".into(),
        bytes: vec![0x89, 0x50, 0x4E, 0x47, 1, 2, 3],
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn create_returns_an_unsent_newsletter(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm::valid())
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::CREATED, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(true, body["success"]);
    assert_eq!("Newsletter created successfully", body["message"]);

    let newsletter = &body["newsletter"];
    assert_eq!("Newsletter Title", newsletter["title"]);
    assert_eq!("Newsletter Subtitle", newsletter["subtitle"]);
    assert_eq!("<p>Newsletter Body</p>", newsletter["content"]);
    assert!(newsletter["sentAt"].is_null());
    assert!(newsletter["mediaUrl"].is_null());
    assert_eq!(0, newsletter["recipientCount"]);

    let id = newsletter["id"].as_str().unwrap();
    let fetched = app.get_json(&format!("api/newsletters/{}", id)).await;
    assert_eq!(newsletter, &fetched);
}

#[sqlx::test(migrations = "./migrations")]
async fn create_rejects_missing_or_blank_headlines(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let test_cases = vec![
        (
            "missing title",
            NewsletterForm {
                title: None,
                ..NewsletterForm::valid()
            },
        ),
        (
            "blank title",
            NewsletterForm {
                title: Some("   ".into()),
                ..NewsletterForm::valid()
            },
        ),
        (
            "missing subtitle",
            NewsletterForm {
                subtitle: None,
                ..NewsletterForm::valid()
            },
        ),
    ];

    for (description, form) in test_cases {
        let res = app.newsletter_create(form).await.unwrap();
        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "Did not reject newsletter with {}",
            description
        );
    }

    let all = app.get_json("api/newsletters/all").await;
    assert_eq!(0, all.as_array().unwrap().len());
}

#[sqlx::test(migrations = "./migrations")]
async fn uploaded_media_is_attached_and_served(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm {
            media: Some(png()),
            ..NewsletterForm::valid()
        })
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());

    let body: Value = res.json().await.unwrap();
    let newsletter = &body["newsletter"];
    assert_eq!("image", newsletter["mediaKind"]);

    let media_url = newsletter["mediaUrl"].as_str().unwrap();
    assert!(media_url.starts_with(&format!("{}/api/media/", app.addr)));
    assert!(media_url.ends_with(".png"));

    let res = app.client.get(media_url).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!("image/png", res.headers()["content-type"]);
    assert!(res.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("inline"));
    assert_eq!(png().bytes, res.bytes().await.unwrap().to_vec());
}

#[sqlx::test(migrations = "./migrations")]
async fn uploads_other_than_images_and_videos_are_rejected(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm {
            media: Some(MediaFile {
                filename: "notes.pdf".into(),
                mime: "application/pdf".into(),
                bytes: b"%PDF".to_vec(),
            }),
            ..NewsletterForm::valid()
        })
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_media_files_are_not_found(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::GET, "api/media/missing.png")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[sqlx::test(migrations = "./migrations")]
async fn send_now_delivers_in_the_background(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;
    app.subscribe("a@x.com").await.unwrap();
    app.subscribe("b@x.com").await.unwrap();

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();

    let res = app.newsletter_send(id).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Newsletter sending started", body["message"]);

    let sent = app.wait_until_sent(id).await;
    assert_eq!(2, sent.recipient_count);

    let analytics = app.newsletter_analytics(id).await;
    assert_eq!(2, analytics["totalSent"]);
    assert_eq!(0, analytics["totalOpened"]);

    let totals = app.get_json("api/newsletters/analytics").await;
    assert_eq!(2, totals["totalEmailsSent"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn sent_newsletters_cannot_be_sent_again(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;
    app.subscribe("a@x.com").await.unwrap();
    app.subscribe("b@x.com").await.unwrap();

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();
    app.newsletter_send(id).await.unwrap();
    let sent = app.wait_until_sent(id).await;

    app.unsubscribe("b@x.com").await.unwrap();

    let res = app.newsletter_send(id).await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Newsletter has already been sent", body["message"]);

    let fetched = app.wait_until_sent(id).await;
    assert_eq!(sent.sent_at, fetched.sent_at);
    assert_eq!(2, fetched.recipient_count);

    let totals = app.get_json("api/newsletters/analytics").await;
    assert_eq!(2, totals["totalEmailsSent"]);
}

#[tokio::test]
async fn send_now_delivers_on_the_in_memory_store() {
    let app = TestApp::spawn_in_memory().await;
    app.subscribe("a@x.com").await.unwrap();

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();
    app.newsletter_send(id).await.unwrap();

    let sent = app.wait_until_sent(id).await;
    assert_eq!(1, sent.recipient_count);
}

#[sqlx::test(migrations = "./migrations")]
async fn send_now_rejects_unknown_newsletters(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let res = app
        .newsletter_send("8f6a0e5e-4a8e-4b6f-9d47-6a2f3c1d2b7a")
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Newsletter not found", body["message"]);

    let res = app.newsletter_send("not-a-uuid").await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[sqlx::test(migrations = "./migrations")]
async fn drafts_can_be_updated_but_sent_newsletters_cannot(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;
    app.subscribe("a@x.com").await.unwrap();

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let newsletter = app.create_newsletter().await;
    let id = newsletter["id"].as_str().unwrap();

    let res = app
        .newsletter_update(
            id,
            NewsletterForm {
                title: Some("Updated Title".into()),
                content: None,
                ..NewsletterForm::valid()
            },
        )
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("Updated Title", body["newsletter"]["title"]);
    assert!(body["newsletter"]["content"].is_null());

    app.newsletter_send(id).await.unwrap();
    app.wait_until_sent(id).await;

    let res = app
        .newsletter_update(id, NewsletterForm::valid())
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let fetched = app.get_json(&format!("api/newsletters/{}", id)).await;
    assert_eq!("Updated Title", fetched["title"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn replacing_media_removes_the_previous_file(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm {
            media: Some(png()),
            ..NewsletterForm::valid()
        })
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["newsletter"]["id"].as_str().unwrap().to_string();
    let old_url = body["newsletter"]["mediaUrl"].as_str().unwrap().to_string();

    let res = app
        .newsletter_update(
            &id,
            NewsletterForm {
                media: Some(MediaFile {
                    filename: "clip.mp4".into(),
                    mime: "video/mp4".into(),
                    bytes: b"mp4".to_vec(),
                }),
                ..NewsletterForm::valid()
            },
        )
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!("video", body["newsletter"]["mediaKind"]);
    assert_ne!(old_url, body["newsletter"]["mediaUrl"].as_str().unwrap());

    let res = app.client.get(&old_url).send().await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[sqlx::test(migrations = "./migrations")]
async fn updating_without_a_new_upload_keeps_the_media(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm {
            media: Some(png()),
            ..NewsletterForm::valid()
        })
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["newsletter"]["id"].as_str().unwrap().to_string();
    let media_url = body["newsletter"]["mediaUrl"].clone();

    let res = app
        .newsletter_update(&id, NewsletterForm::valid())
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(media_url, body["newsletter"]["mediaUrl"]);
    assert_eq!("image", body["newsletter"]["mediaKind"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_newsletter_removes_its_media(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .newsletter_create(NewsletterForm {
            media: Some(png()),
            ..NewsletterForm::valid()
        })
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["newsletter"]["id"].as_str().unwrap().to_string();
    let media_url = body["newsletter"]["mediaUrl"].as_str().unwrap().to_string();

    let path = format!("api/newsletters/delete/{}", id);
    let res = app.request(Method::DELETE, &path).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = app.client.get(&media_url).send().await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = app
        .request(Method::GET, &format!("api/newsletters/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = app.request(Method::DELETE, &path).send().await.unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[sqlx::test(migrations = "./migrations")]
async fn newsletters_are_listed_newest_first(pool: PgPool) {
    let app = TestApp::spawn(&pool).await;

    let first = app.create_newsletter().await;
    let second = app.create_newsletter().await;

    let all = app.get_json("api/newsletters/all").await;
    let ids: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();

    assert_eq!(
        vec![
            second["id"].as_str().unwrap(),
            first["id"].as_str().unwrap()
        ],
        ids
    );
}
