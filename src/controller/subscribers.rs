use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, web, HttpResponse, Responder};

use chrono::Utc;

use serde::Deserialize;
use serde_json::json;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::error::Error;
use crate::repo::Repos;

use super::error::RestResult;
use super::{ok, respond};

/// Form/query wrapper carrying a single email address
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    email: String,
}

/// Optional email parameter, for endpoints taking it from either the body or the query
#[derive(Debug, Deserialize)]
pub struct EmailParam {
    email: Option<String>,
}

/// Subscribe an address, or flip a previously unsubscribed address back to subscribed.
///
/// The address is read from the form body, falling back to the `email` query parameter.
#[tracing::instrument(name = "Subscribe", skip(repos))]
#[post("/subscribe")]
async fn subscribe(
    repos: web::Data<Repos>,
    form: Option<web::Form<EmailParam>>,
    query: web::Query<EmailParam>,
) -> RestResult<impl Responder> {
    let email: EmailAddress = form
        .and_then(|form| form.into_inner().email)
        .or(query.into_inner().email)
        .ok_or_else(|| Error::Validation("Email is required".into()))?
        .parse()?;
    let now = Utc::now();

    let subscriber = match repos.subscribers.find_by_email(&email).await? {
        Some(existing) if existing.subscribed => {
            tracing::warn!("Email is already subscribed");
            return Err(Error::Conflict("Email is already subscribed".into()).into());
        }
        Some(existing) => {
            tracing::info!("Resubscribing previously unsubscribed email");
            repos
                .subscribers
                .resubscribe(existing.id, now)
                .await?
                .ok_or_else(|| Error::not_found("Subscriber"))?
        }
        None => repos.subscribers.insert(&email, now).await?,
    };

    Ok(respond(
        StatusCode::OK,
        "Successfully subscribed",
        json!({ "subscriber": subscriber }),
    ))
}

/// Unsubscribe endpoint, linked from every newsletter email
#[tracing::instrument(name = "Unsubscribe", skip(repos))]
#[get("/unsubscribe")]
async fn unsubscribe(
    repos: web::Data<Repos>,
    query: web::Query<EmailForm>,
) -> RestResult<impl Responder> {
    let email: EmailAddress = query.0.email.parse()?;

    let subscriber = repos
        .subscribers
        .find_by_email(&email)
        .await?
        .ok_or_else(|| Error::not_found("Subscriber"))?;
    repos
        .subscribers
        .unsubscribe(subscriber.id, Utc::now())
        .await?;

    Ok(ok("Successfully unsubscribed"))
}

#[tracing::instrument(name = "List subscribers", skip(repos))]
#[get("/all")]
async fn all(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let subscribers = repos.subscribers.fetch_all().await?;
    Ok(HttpResponse::Ok().json(subscribers))
}

#[tracing::instrument(name = "Count subscribers", skip(repos))]
#[get("/count")]
async fn count(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let subscribed = repos.subscribers.count(true).await?;
    let unsubscribed = repos.subscribers.count(false).await?;

    Ok(HttpResponse::Ok().json(json!({
        "totalSubscribed": subscribed,
        "totalUnsubscribed": unsubscribed,
    })))
}

#[tracing::instrument(name = "Delete subscriber", skip(repos))]
#[delete("/{id}")]
async fn remove(repos: web::Data<Repos>, path: web::Path<(Uuid,)>) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    if !repos.subscribers.delete(id).await? {
        return Err(Error::not_found("Subscriber").into());
    }

    Ok(ok("Subscriber deleted successfully"))
}

/// Subscriber API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/subscribers")
        .service(subscribe)
        .service(unsubscribe)
        .service(all)
        .service(count)
        .service(remove)
}
