use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use serde::Serialize;
use serde_json::Value;

pub mod analytics;
pub mod error;
pub mod media;
pub mod newsletters;
pub mod scheduling;
pub mod subscribers;
pub mod tracking;

/// Body of every successful mutating endpoint: `{ success, message, ...payload }`
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    success: bool,
    message: &'a str,
    #[serde(flatten)]
    payload: Value,
}

fn respond(status: StatusCode, message: &str, payload: Value) -> HttpResponse {
    HttpResponse::build(status).json(Envelope {
        success: true,
        message,
        payload,
    })
}

fn ok(message: &str) -> HttpResponse {
    respond(StatusCode::OK, message, Value::Object(Default::default()))
}
