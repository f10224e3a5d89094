use std::collections::HashMap;

use uuid::Uuid;

use chrono::{DateTime, Utc};

use tokio::sync::Mutex;

use crate::domain::EmailAddress;
use crate::error::{Error, Result};
use crate::model::{
    AnalyticsRecord, AnalyticsSummary, NewNewsletter, Newsletter, ScheduledJob, Subscriber,
};

use super::{AnalyticsRepo, NewsletterRepo, ScheduledJobRepo, SubscriberRepo};

/// In-process store implementing every repository.
///
/// Mirrors the Postgres schema's constraints: unique subscriber emails, one analytics record
/// per (newsletter, recipient) and cascading deletes from newsletters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    subscribers: HashMap<Uuid, Subscriber>,
    newsletters: HashMap<Uuid, Newsletter>,
    scheduled_jobs: HashMap<Uuid, ScheduledJob>,
    analytics: HashMap<(Uuid, String), AnalyticsRecord>,
}

fn sorted_by<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait::async_trait]
impl SubscriberRepo for MemoryStore {
    async fn insert(
        &self,
        email: &EmailAddress,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Subscriber> {
        let mut state = self.state.lock().await;
        if state
            .subscribers
            .values()
            .any(|s| s.email == email.as_ref())
        {
            return Err(Error::Conflict("Email is already subscribed".into()));
        }

        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: email.to_string(),
            subscribed: true,
            subscribed_at,
            unsubscribed_at: None,
        };
        state.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Subscriber>> {
        let state = self.state.lock().await;
        Ok(state
            .subscribers
            .values()
            .find(|s| s.email == email.as_ref())
            .cloned())
    }

    async fn resubscribe(
        &self,
        id: Uuid,
        subscribed_at: DateTime<Utc>,
    ) -> Result<Option<Subscriber>> {
        let mut state = self.state.lock().await;
        Ok(state.subscribers.get_mut(&id).map(|subscriber| {
            subscriber.subscribed = true;
            subscriber.subscribed_at = subscribed_at;
            subscriber.unsubscribed_at = None;
            subscriber.clone()
        }))
    }

    async fn unsubscribe(
        &self,
        id: Uuid,
        unsubscribed_at: DateTime<Utc>,
    ) -> Result<Option<Subscriber>> {
        let mut state = self.state.lock().await;
        Ok(state.subscribers.get_mut(&id).map(|subscriber| {
            subscriber.subscribed = false;
            subscriber.unsubscribed_at = Some(unsubscribed_at);
            subscriber.clone()
        }))
    }

    async fn fetch_all(&self) -> Result<Vec<Subscriber>> {
        let state = self.state.lock().await;
        Ok(sorted_by(state.subscribers.values().cloned(), |s| {
            s.subscribed_at
        }))
    }

    async fn fetch_all_active(&self) -> Result<Vec<Subscriber>> {
        let state = self.state.lock().await;
        Ok(sorted_by(
            state.subscribers.values().filter(|s| s.subscribed).cloned(),
            |s| s.subscribed_at,
        ))
    }

    async fn count(&self, subscribed: bool) -> Result<i64> {
        let state = self.state.lock().await;
        let count = state
            .subscribers
            .values()
            .filter(|s| s.subscribed == subscribed)
            .count();
        Ok(count as i64)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.subscribers.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl NewsletterRepo for MemoryStore {
    async fn insert(
        &self,
        newsletter: &NewNewsletter,
        created_at: DateTime<Utc>,
    ) -> Result<Newsletter> {
        let mut state = self.state.lock().await;
        let newsletter = Newsletter {
            id: Uuid::new_v4(),
            title: newsletter.title.as_ref().into(),
            subtitle: newsletter.subtitle.as_ref().into(),
            content: newsletter.content.clone(),
            media_url: newsletter.media.as_ref().map(|m| m.url.clone()),
            media_kind: newsletter.media.as_ref().map(|m| m.kind),
            created_at,
            sent_at: None,
            recipient_count: 0,
        };
        state.newsletters.insert(newsletter.id, newsletter.clone());
        Ok(newsletter)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Newsletter>> {
        let state = self.state.lock().await;
        Ok(state.newsletters.get(&id).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Newsletter>> {
        let state = self.state.lock().await;
        let mut newsletters = sorted_by(state.newsletters.values().cloned(), |n| n.created_at);
        newsletters.reverse();
        Ok(newsletters)
    }

    async fn update(&self, id: Uuid, update: &NewNewsletter) -> Result<Option<Newsletter>> {
        let mut state = self.state.lock().await;
        let newsletter = match state.newsletters.get_mut(&id) {
            Some(newsletter) if !newsletter.is_sent() => newsletter,
            _ => return Ok(None),
        };

        newsletter.title = update.title.as_ref().into();
        newsletter.subtitle = update.subtitle.as_ref().into();
        newsletter.content = update.content.clone();
        if let Some(media) = &update.media {
            newsletter.media_url = Some(media.url.clone());
            newsletter.media_kind = Some(media.kind);
        }
        Ok(Some(newsletter.clone()))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        recipient_count: i32,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.newsletters.get_mut(&id) {
            Some(newsletter) if !newsletter.is_sent() => {
                newsletter.sent_at = Some(sent_at);
                newsletter.recipient_count = recipient_count;
                true
            }
            _ => false,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Newsletter>> {
        let mut state = self.state.lock().await;
        let deleted = state.newsletters.remove(&id);
        if deleted.is_some() {
            state.scheduled_jobs.retain(|_, job| job.newsletter_id != id);
            state.analytics.retain(|(newsletter_id, _), _| *newsletter_id != id);
        }
        Ok(deleted)
    }

    async fn total_recipients_sent(&self) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .newsletters
            .values()
            .filter(|n| n.is_sent())
            .map(|n| i64::from(n.recipient_count))
            .sum())
    }
}

#[async_trait::async_trait]
impl ScheduledJobRepo for MemoryStore {
    async fn insert(
        &self,
        newsletter_id: Uuid,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<ScheduledJob> {
        let mut state = self.state.lock().await;
        let job = ScheduledJob {
            id: Uuid::new_v4(),
            newsletter_id,
            scheduled_at,
            sent: false,
            sent_at: None,
            created_at,
        };
        state.scheduled_jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ScheduledJob>> {
        let state = self.state.lock().await;
        Ok(state.scheduled_jobs.get(&id).cloned())
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        let state = self.state.lock().await;
        Ok(sorted_by(
            state
                .scheduled_jobs
                .values()
                .filter(|job| job.is_due(now))
                .cloned(),
            |job| job.scheduled_at,
        ))
    }

    async fn fetch_pending(&self) -> Result<Vec<ScheduledJob>> {
        let state = self.state.lock().await;
        Ok(sorted_by(
            state.scheduled_jobs.values().filter(|job| !job.sent).cloned(),
            |job| job.scheduled_at,
        ))
    }

    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<ScheduledJob>> {
        let state = self.state.lock().await;
        Ok(sorted_by(
            state
                .scheduled_jobs
                .values()
                .filter(|job| job.newsletter_id == newsletter_id)
                .cloned(),
            |job| job.scheduled_at,
        ))
    }

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.scheduled_jobs.get_mut(&id) {
            Some(job) if !job.sent => {
                job.sent = true;
                job.sent_at = Some(sent_at);
                true
            }
            _ => false,
        })
    }

    async fn delete_pending(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.scheduled_jobs.get(&id) {
            Some(job) if !job.sent => Ok(state.scheduled_jobs.remove(&id).is_some()),
            _ => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl AnalyticsRepo for MemoryStore {
    async fn record_delivery(&self, newsletter_id: Uuid, recipient: &EmailAddress) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .analytics
            .entry((newsletter_id, recipient.to_string()))
            .or_insert_with(|| AnalyticsRecord {
                newsletter_id,
                recipient_email: recipient.to_string(),
                opened: false,
                opened_at: None,
            });
        Ok(())
    }

    async fn mark_opened(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
        opened_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(
            match state
                .analytics
                .get_mut(&(newsletter_id, recipient.to_string()))
            {
                Some(record) if !record.opened => {
                    record.opened = true;
                    record.opened_at = Some(opened_at);
                    true
                }
                _ => false,
            },
        )
    }

    async fn fetch(
        &self,
        newsletter_id: Uuid,
        recipient: &EmailAddress,
    ) -> Result<Option<AnalyticsRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .analytics
            .get(&(newsletter_id, recipient.to_string()))
            .cloned())
    }

    async fn fetch_by_newsletter(&self, newsletter_id: Uuid) -> Result<Vec<AnalyticsRecord>> {
        let state = self.state.lock().await;
        Ok(sorted_by(
            state
                .analytics
                .values()
                .filter(|record| record.newsletter_id == newsletter_id)
                .cloned(),
            |record| record.recipient_email.clone(),
        ))
    }

    async fn summary(&self) -> Result<AnalyticsSummary> {
        let state = self.state.lock().await;
        Ok(AnalyticsSummary::from_records(state.analytics.values()))
    }
}
