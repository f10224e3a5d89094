use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::model::ScheduledJob;
use crate::repo::Repos;

/// Outcome of one scheduler tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs that were due when the tick started
    pub due: usize,
    /// Jobs dispatched and marked as sent
    pub sent: usize,
    /// Jobs left pending for the next tick
    pub failed: usize,
    /// Jobs retired without sending because their newsletter had already gone out
    pub skipped: usize,
}

/// Periodically dispatches scheduled newsletters whose time has come
pub struct Scheduler {
    repos: Repos,
    dispatcher: Arc<Dispatcher>,
    period: Duration,
}

impl Scheduler {
    pub fn new(repos: Repos, dispatcher: Arc<Dispatcher>, period: Duration) -> Self {
        Self {
            repos,
            dispatcher,
            period,
        }
    }

    /// Run one pass over the due jobs.
    ///
    /// Jobs are handled one after the other and a failing job never stops the pass. A job is
    /// only marked as sent once its newsletter was dispatched; a failed dispatch leaves it
    /// pending so the next tick retries it. A job whose newsletter was already sent by other
    /// means is marked as sent without emailing anyone.
    #[tracing::instrument(name = "Scheduler tick", skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let due = self.repos.scheduled_jobs.fetch_due(now).await?;
        if due.is_empty() {
            return Ok(TickReport::default());
        }

        tracing::info!("Processing {} due scheduled email(s)", due.len());

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        for job in due {
            match self.dispatcher.dispatch(job.newsletter_id).await {
                Ok(_) if self.retire(&job).await => report.sent += 1,
                Ok(_) => report.failed += 1,
                Err(Error::AlreadySent) => {
                    tracing::warn!(
                        job_id = %job.id,
                        newsletter_id = %job.newsletter_id,
                        "Newsletter already sent, retiring scheduled job"
                    );
                    if self.retire(&job).await {
                        report.skipped += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::error!(
                        error.cause_chain = ?error,
                        error.message = %error,
                        job_id = %job.id,
                        newsletter_id = %job.newsletter_id,
                        "Failed to dispatch scheduled newsletter"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Mark a job as sent. Failures are logged and leave the job pending
    async fn retire(&self, job: &ScheduledJob) -> bool {
        match self.repos.scheduled_jobs.mark_sent(job.id, Utc::now()).await {
            Ok(_) => true,
            Err(error) => {
                tracing::error!(
                    error.cause_chain = ?error,
                    error.message = %error,
                    job_id = %job.id,
                    "Failed to mark scheduled job as sent"
                );
                false
            }
        }
    }

    /// Tick forever, one tick per period.
    ///
    /// The first tick happens immediately. A tick that outlasts the period delays the next one
    /// instead of overlapping with it.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period = ?self.period, "Scheduler started");
        loop {
            interval.tick().await;
            if let Err(error) = self.tick(Utc::now()).await {
                tracing::error!(
                    error.cause_chain = ?error,
                    error.message = %error,
                    "Scheduler tick failed"
                );
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Create a pending job for an unsent newsletter, `scheduled_at` must be strictly after `now`
#[tracing::instrument(name = "Schedule newsletter", skip(repos))]
pub async fn schedule(
    repos: &Repos,
    newsletter_id: Uuid,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ScheduledJob> {
    if scheduled_at <= now {
        return Err(Error::InvalidTime);
    }

    let newsletter = repos
        .newsletters
        .fetch(newsletter_id)
        .await?
        .ok_or_else(|| Error::not_found("Newsletter"))?;
    if newsletter.is_sent() {
        return Err(Error::AlreadySent);
    }

    repos
        .scheduled_jobs
        .insert(newsletter_id, scheduled_at, now)
        .await
}

/// Delete a pending job. Sent jobs are kept as history and cannot be cancelled
#[tracing::instrument(name = "Cancel scheduled newsletter", skip(repos))]
pub async fn cancel(repos: &Repos, job_id: Uuid) -> Result<()> {
    let job = repos
        .scheduled_jobs
        .fetch(job_id)
        .await?
        .ok_or_else(|| Error::not_found("Scheduled email"))?;

    if job.sent || !repos.scheduled_jobs.delete_pending(job.id).await? {
        return Err(Error::Conflict("Cannot cancel already sent email".into()));
    }

    Ok(())
}

/// Parse a client-supplied send time.
///
/// Accepts RFC 3339 timestamps, and ISO date-times without an offset which are read as UTC.
pub fn parse_send_time(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Validation(format!("Invalid scheduled time: {}", input)))
}
