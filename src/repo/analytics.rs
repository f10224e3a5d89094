use uuid::Uuid;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use crate::domain::EmailAddress;
use crate::error::Result;
use crate::model::{AnalyticsRecord, AnalyticsSummary};

#[async_trait::async_trait]
pub trait AnalyticsRepo: Send + Sync {
    /// Record a successful delivery as an unopened record.
    /// An existing record for the same pair is kept as is.
    async fn record_delivery(&self, newsletter_id: Uuid, recipient: &EmailAddress) -> Result<()>;

    /// Flip an unopened record to opened. Returns `false` when there is no record for the pair
    /// or it was already opened.
    async fn mark_opened(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
        opened_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn fetch(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
    ) -> Result<Option<AnalyticsRecord>>;

    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<AnalyticsRecord>>;

    /// Totals across every newsletter
    async fn summary(&self) -> Result<AnalyticsSummary>;
}

/// Postgres Analytics Repository
#[derive(Debug, Clone)]
pub struct PgAnalyticsRepo {
    pool: PgPool,
}

impl PgAnalyticsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AnalyticsRepo for PgAnalyticsRepo {
    #[tracing::instrument(name = "Record newsletter delivery", skip(self))]
    async fn record_delivery(&self, newsletter_id: Uuid, recipient: &EmailAddress) -> Result<()> {
        sqlx::query(
            "insert into analytics(newsletter_id, recipient_email, opened) values ($1, $2, false) \
             on conflict (newsletter_id, recipient_email) do nothing",
        )
        .bind(newsletter_id)
        .bind(recipient.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Mark newsletter opened", skip(self))]
    async fn mark_opened(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
        opened_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "update analytics set opened=true, opened_at=$3 \
             where newsletter_id=$1 and recipient_email=$2 and not opened",
        )
        .bind(newsletter_id)
        .bind(recipient.as_ref())
        .bind(opened_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Fetch analytics record", skip(self))]
    async fn fetch(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
    ) -> Result<Option<AnalyticsRecord>> {
        let record = sqlx::query_as::<_, AnalyticsRecord>(
            "select newsletter_id, recipient_email, opened, opened_at \
             from analytics where newsletter_id=$1 and recipient_email=$2",
        )
        .bind(newsletter_id)
        .bind(recipient.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(name = "Fetch analytics by newsletter", skip(self))]
    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<AnalyticsRecord>> {
        let records = sqlx::query_as::<_, AnalyticsRecord>(
            "select newsletter_id, recipient_email, opened, opened_at \
             from analytics where newsletter_id=$1 order by recipient_email",
        )
        .bind(newsletter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(name = "Summarize analytics", skip(self))]
    async fn summary(&self) -> Result<AnalyticsSummary> {
        let (total_sent, total_opened) = sqlx::query_as::<_, (i64, i64)>(
            "select count(*), count(*) filter (where opened) from analytics",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalyticsSummary {
            total_sent,
            total_opened,
        })
    }
}
