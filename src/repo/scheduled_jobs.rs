use uuid::Uuid;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use crate::error::Result;
use crate::model::ScheduledJob;

#[async_trait::async_trait]
pub trait ScheduledJobRepo: Send + Sync {
    /// Insert a new pending job
    async fn insert(
        &self,
        newsletter_id: Uuid,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<ScheduledJob>;

    async fn fetch(&self, id: Uuid) -> Result<Option<ScheduledJob>>;

    /// Fetch all unsent jobs whose target time is at or before `now`, earliest first
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>>;

    /// Fetch all unsent jobs, earliest first
    async fn fetch_pending(&self) -> Result<Vec<ScheduledJob>>;

    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<ScheduledJob>>;

    /// Transition a pending job to sent. Returns `false` if the job is gone or already sent
    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<bool>;

    /// Delete a job only while it is still pending
    async fn delete_pending(&self, id: Uuid) -> Result<bool>;
}

/// Postgres Scheduled Job Repository
#[derive(Debug, Clone)]
pub struct PgScheduledJobRepo {
    pool: PgPool,
}

impl PgScheduledJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ScheduledJobRepo for PgScheduledJobRepo {
    #[tracing::instrument(name = "Insert scheduled job", skip(self))]
    async fn insert(
        &self,
        newsletter_id: Uuid,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<ScheduledJob> {
        let job = sqlx::query_as::<_, ScheduledJob>(
            "insert into scheduled_jobs(id, newsletter_id, scheduled_at, sent, created_at) \
             values ($1, $2, $3, false, $4) \
             returning id, newsletter_id, scheduled_at, sent, sent_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(newsletter_id)
        .bind(scheduled_at)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(name = "Fetch scheduled job", skip(self))]
    async fn fetch(&self, id: Uuid) -> Result<Option<ScheduledJob>> {
        let job = sqlx::query_as::<_, ScheduledJob>(
            "select id, newsletter_id, scheduled_at, sent, sent_at, created_at \
             from scheduled_jobs where id=$1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    #[tracing::instrument(name = "Fetch due scheduled jobs", skip(self))]
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        let jobs = sqlx::query_as::<_, ScheduledJob>(
            "select id, newsletter_id, scheduled_at, sent, sent_at, created_at \
             from scheduled_jobs where not sent and scheduled_at <= $1 order by scheduled_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(name = "Fetch pending scheduled jobs", skip(self))]
    async fn fetch_pending(&self) -> Result<Vec<ScheduledJob>> {
        let jobs = sqlx::query_as::<_, ScheduledJob>(
            "select id, newsletter_id, scheduled_at, sent, sent_at, created_at \
             from scheduled_jobs where not sent order by scheduled_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(name = "Fetch scheduled jobs by newsletter", skip(self))]
    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<ScheduledJob>> {
        let jobs = sqlx::query_as::<_, ScheduledJob>(
            "select id, newsletter_id, scheduled_at, sent, sent_at, created_at \
             from scheduled_jobs where newsletter_id=$1 order by scheduled_at",
        )
        .bind(newsletter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(name = "Mark scheduled job as sent", skip(self))]
    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "update scheduled_jobs set sent=true, sent_at=$2 where id=$1 and not sent",
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete pending scheduled job", skip(self))]
    async fn delete_pending(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("delete from scheduled_jobs where id=$1 and not sent")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
