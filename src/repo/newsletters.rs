use uuid::Uuid;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use crate::error::Result;
use crate::model::{NewNewsletter, Newsletter};

#[async_trait::async_trait]
pub trait NewsletterRepo: Send + Sync {
    async fn insert(&self, newsletter: &NewNewsletter, created_at: DateTime<Utc>)
        -> Result<Newsletter>;

    async fn fetch(&self, id: Uuid) -> Result<Option<Newsletter>>;

    /// Fetch all newsletters, newest first
    async fn fetch_all(&self) -> Result<Vec<Newsletter>>;

    /// Replace the content of an unsent newsletter. Media is only replaced when the update
    /// carries new media. Returns `None` if the newsletter is missing or already sent.
    async fn update(&self, id: Uuid, newsletter: &NewNewsletter) -> Result<Option<Newsletter>>;

    /// Stamp the send time and the number of recipients reached. A newsletter is only stamped
    /// once: returns `false` if it is missing or already sent
    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>, recipient_count: i32)
        -> Result<bool>;

    /// Delete a newsletter together with its scheduled jobs and analytics, returning the
    /// deleted record so its media can be released
    async fn delete(&self, id: Uuid) -> Result<Option<Newsletter>>;

    /// Sum of recipients over all sent newsletters
    async fn total_recipients_sent(&self) -> Result<i64>;
}

/// Postgres Newsletter Repository
#[derive(Debug, Clone)]
pub struct PgNewsletterRepo {
    pool: PgPool,
}

impl PgNewsletterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NewsletterRepo for PgNewsletterRepo {
    #[tracing::instrument(name = "Insert newsletter", skip(self, newsletter))]
    async fn insert(
        &self,
        newsletter: &NewNewsletter,
        created_at: DateTime<Utc>,
    ) -> Result<Newsletter> {
        let media = newsletter.media.as_ref();
        let inserted = sqlx::query_as::<_, Newsletter>(
            "insert into newsletters(id, title, subtitle, content, media_url, media_kind, created_at) \
             values ($1, $2, $3, $4, $5, $6, $7) \
             returning id, title, subtitle, content, media_url, media_kind, created_at, sent_at, recipient_count",
        )
        .bind(Uuid::new_v4())
        .bind(newsletter.title.as_ref())
        .bind(newsletter.subtitle.as_ref())
        .bind(newsletter.content.as_deref())
        .bind(media.map(|m| m.url.as_str()))
        .bind(media.map(|m| m.kind))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    #[tracing::instrument(name = "Fetch newsletter", skip(self))]
    async fn fetch(&self, id: Uuid) -> Result<Option<Newsletter>> {
        let newsletter = sqlx::query_as::<_, Newsletter>(
            "select id, title, subtitle, content, media_url, media_kind, created_at, sent_at, recipient_count \
             from newsletters where id=$1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(newsletter)
    }

    #[tracing::instrument(name = "Fetch all newsletters", skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Newsletter>> {
        let newsletters = sqlx::query_as::<_, Newsletter>(
            "select id, title, subtitle, content, media_url, media_kind, created_at, sent_at, recipient_count \
             from newsletters order by created_at desc",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(newsletters)
    }

    #[tracing::instrument(name = "Update newsletter", skip(self, newsletter))]
    async fn update(&self, id: Uuid, newsletter: &NewNewsletter) -> Result<Option<Newsletter>> {
        let media = newsletter.media.as_ref();
        let updated = sqlx::query_as::<_, Newsletter>(
            "update newsletters set title=$2, subtitle=$3, content=$4, \
             media_url=coalesce($5, media_url), media_kind=coalesce($6, media_kind) \
             where id=$1 and sent_at is null \
             returning id, title, subtitle, content, media_url, media_kind, created_at, sent_at, recipient_count",
        )
        .bind(id)
        .bind(newsletter.title.as_ref())
        .bind(newsletter.subtitle.as_ref())
        .bind(newsletter.content.as_deref())
        .bind(media.map(|m| m.url.as_str()))
        .bind(media.map(|m| m.kind))
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    #[tracing::instrument(name = "Mark newsletter as sent", skip(self))]
    async fn mark_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        recipient_count: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            "update newsletters set sent_at=$2, recipient_count=$3 \
             where id=$1 and sent_at is null",
        )
        .bind(id)
        .bind(sent_at)
        .bind(recipient_count)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete newsletter", skip(self))]
    async fn delete(&self, id: Uuid) -> Result<Option<Newsletter>> {
        // Scheduled jobs and analytics rows are removed by `on delete cascade`
        let deleted = sqlx::query_as::<_, Newsletter>(
            "delete from newsletters where id=$1 \
             returning id, title, subtitle, content, media_url, media_kind, created_at, sent_at, recipient_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deleted)
    }

    #[tracing::instrument(name = "Sum sent newsletter recipients", skip(self))]
    async fn total_recipients_sent(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "select coalesce(sum(recipient_count), 0)::bigint from newsletters where sent_at is not null",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
