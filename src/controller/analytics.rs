use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse, Responder};

use serde_json::json;

use uuid::Uuid;

use crate::model::AnalyticsSummary;
use crate::repo::Repos;

use super::error::RestResult;

/// Totals over every recorded delivery
#[tracing::instrument(name = "Analytics dashboard", skip(repos))]
#[get("/dashboard")]
async fn dashboard(repos: web::Data<Repos>) -> RestResult<impl Responder> {
    let summary = repos.analytics.summary().await?;

    Ok(HttpResponse::Ok().json(json!({
        "totalEmailsSent": summary.total_sent,
        "totalEmailsOpened": summary.total_opened,
        "overallOpenRate": summary.open_rate(),
    })))
}

/// Totals and per-recipient rows for one newsletter
#[tracing::instrument(name = "Newsletter analytics", skip(repos))]
#[get("/{newsletter_id}")]
async fn newsletter(
    repos: web::Data<Repos>,
    path: web::Path<(Uuid,)>,
) -> RestResult<impl Responder> {
    let (newsletter_id,) = path.into_inner();

    let records = repos.analytics.fetch_by_newsletter(newsletter_id).await?;
    let summary = AnalyticsSummary::from_records(&records);

    Ok(HttpResponse::Ok().json(json!({
        "newsletterId": newsletter_id,
        "totalSent": summary.total_sent,
        "totalOpened": summary.total_opened,
        "openRate": summary.open_rate(),
        "analytics": records,
    })))
}

/// Analytics API endpoints
pub fn scope() -> impl HttpServiceFactory {
    // `/dashboard` must be matched before `/{newsletter_id}`
    web::scope("/analytics")
        .service(dashboard)
        .service(newsletter)
}
