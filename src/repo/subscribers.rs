use uuid::Uuid;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use crate::domain::EmailAddress;
use crate::error::{Error, Result};
use crate::model::Subscriber;

/// Subscriber repository trait, implemented for each store used.
#[async_trait::async_trait]
pub trait SubscriberRepo: Send + Sync {
    /// Insert a new, subscribed, subscriber. Fails with `Conflict` if the email already exists
    async fn insert(&self, email: &EmailAddress, subscribed_at: DateTime<Utc>)
        -> Result<Subscriber>;

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Subscriber>>;

    /// Flip an existing subscriber back to subscribed, clearing the unsubscribe stamp
    async fn resubscribe(&self, id: Uuid, subscribed_at: DateTime<Utc>)
        -> Result<Option<Subscriber>>;

    async fn unsubscribe(&self, id: Uuid, unsubscribed_at: DateTime<Utc>)
        -> Result<Option<Subscriber>>;

    async fn fetch_all(&self) -> Result<Vec<Subscriber>>;

    /// Fetch all subscribers that currently receive newsletters
    async fn fetch_all_active(&self) -> Result<Vec<Subscriber>>;

    async fn count(&self, subscribed: bool) -> Result<i64>;

    /// Hard-delete a subscriber, returns `false` if it did not exist
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Postgres Subscriber Repository
#[derive(Debug, Clone)]
pub struct PgSubscriberRepo {
    pool: PgPool,
}

impl PgSubscriberRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SubscriberRepo for PgSubscriberRepo {
    #[tracing::instrument(name = "Insert subscriber", skip(self))]
    async fn insert(
        &self,
        email: &EmailAddress,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscriber> {
        let result = sqlx::query_as::<_, Subscriber>(
            "insert into subscribers(id, email, subscribed, subscribed_at) values ($1, $2, true, $3) \
             returning id, email, subscribed, subscribed_at, unsubscribed_at",
        )
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(subscribed_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::Conflict("Email is already subscribed".into()))
            }
            other => Ok(other?),
        }
    }

    #[tracing::instrument(name = "Find subscriber by email", skip(self))]
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            "select id, email, subscribed, subscribed_at, unsubscribed_at \
             from subscribers where email=$1",
        )
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscriber)
    }

    #[tracing::instrument(name = "Resubscribe a subscriber", skip(self))]
    async fn resubscribe(
        &self,
        id: Uuid,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            "update subscribers set subscribed=true, subscribed_at=$2, unsubscribed_at=null \
             where id=$1 \
             returning id, email, subscribed, subscribed_at, unsubscribed_at",
        )
        .bind(id)
        .bind(subscribed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscriber)
    }

    #[tracing::instrument(name = "Unsubscribe a subscriber", skip(self))]
    async fn unsubscribe(
        &self,
        id: Uuid,
        unsubscribed_at: DateTime<Utc>,
    ) -> Result<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            "update subscribers set subscribed=false, unsubscribed_at=$2 \
             where id=$1 \
             returning id, email, subscribed, subscribed_at, unsubscribed_at",
        )
        .bind(id)
        .bind(unsubscribed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscriber)
    }

    #[tracing::instrument(name = "Fetch all subscribers", skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            "select id, email, subscribed, subscribed_at, unsubscribed_at \
             from subscribers order by subscribed_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(subscribers)
    }

    #[tracing::instrument(name = "Fetch all active subscribers", skip(self))]
    async fn fetch_all_active(&self) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            "select id, email, subscribed, subscribed_at, unsubscribed_at \
             from subscribers where subscribed order by subscribed_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(subscribers)
    }

    #[tracing::instrument(name = "Count subscribers", skip(self))]
    async fn count(&self, subscribed: bool) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("select count(*) from subscribers where subscribed=$1")
                .bind(subscribed)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    #[tracing::instrument(name = "Delete subscriber", skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("delete from subscribers where id=$1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
