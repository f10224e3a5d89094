use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, web, HttpResponse, Responder};

use chrono::Utc;

use serde::Deserialize;
use serde_json::json;

use uuid::Uuid;

use crate::repo::Repos;
use crate::scheduler;

use super::error::RestResult;
use super::{ok, respond};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    newsletter_id: Uuid,
    scheduled_at: String,
}

/// Schedule a newsletter for delivery at a future time
#[tracing::instrument(name = "Schedule email", skip(repos))]
#[post("/schedule")]
async fn schedule(
    repos: web::Data<Repos>,
    query: web::Query<ScheduleQuery>,
) -> RestResult<impl Responder> {
    let scheduled_at = scheduler::parse_send_time(&query.scheduled_at)?;

    let job = scheduler::schedule(&repos, query.newsletter_id, scheduled_at, Utc::now()).await?;
    tracing::info!(job_id = %job.id, "Newsletter scheduled");

    Ok(respond(
        StatusCode::OK,
        "Email scheduled successfully",
        json!({ "scheduledEmail": job }),
    ))
}

/// Pending jobs, earliest first
#[tracing::instrument(name = "List scheduled emails", skip(repos))]
#[get("/all")]
async fn all(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let jobs = repos.scheduled_jobs.fetch_pending().await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[tracing::instrument(name = "List scheduled emails of a newsletter", skip(repos))]
#[get("/newsletter/{id}")]
async fn by_newsletter(
    repos: web::Data<Repos>,
    path: web::Path<(Uuid,)>,
) -> RestResult<impl Responder> {
    let (newsletter_id,) = path.into_inner();

    let jobs = repos
        .scheduled_jobs
        .fetch_by_newsletter(newsletter_id)
        .await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[tracing::instrument(name = "Cancel scheduled email", skip(repos))]
#[delete("/cancel/{id}")]
async fn cancel(repos: web::Data<Repos>, path: web::Path<(Uuid,)>) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();

    scheduler::cancel(&repos, id).await?;

    Ok(ok("Scheduled email cancelled successfully"))
}

/// Scheduling API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/scheduling")
        .service(schedule)
        .service(all)
        .service(by_newsletter)
        .service(cancel)
}
