use actix_web::dev::HttpServiceFactory;
use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{get, web, HttpResponse, Responder};

use chrono::Utc;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::repo::Repos;

/// 1x1 transparent PNG
const PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Record that a recipient opened a newsletter.
///
/// Only flips an existing, unopened analytics record. Any failure is logged and the pixel is
/// returned regardless.
#[tracing::instrument(name = "Track email open", skip(repos))]
#[get("/track/{newsletter_id}/{email}")]
async fn track(repos: web::Data<Repos>, path: web::Path<(String, String)>) -> impl Responder {
    let (newsletter_id, email) = path.into_inner();

    match (newsletter_id.parse::<Uuid>(), email.parse::<EmailAddress>()) {
        (Ok(newsletter_id), Ok(recipient)) => {
            match repos
                .analytics
                .mark_opened(newsletter_id, &recipient, Utc::now())
                .await
            {
                Ok(true) => tracing::info!("Email open recorded"),
                Ok(false) => tracing::debug!("No unopened delivery to record"),
                Err(e) => tracing::error!(error.cause_chain = ?e, "Failed to record email open"),
            }
        }
        _ => tracing::warn!("Ignoring malformed tracking request"),
    }

    HttpResponse::Ok()
        .content_type(ContentType::png())
        .insert_header(CacheControl(vec![
            CacheDirective::NoCache,
            CacheDirective::NoStore,
            CacheDirective::MustRevalidate,
        ]))
        .body(PIXEL)
}

/// Tracking pixel endpoint
pub fn scope() -> impl HttpServiceFactory {
    track
}
