use chrono::Utc;

use uuid::Uuid;

use crate::client::EmailClient;
use crate::domain::EmailAddress;
use crate::error::{Error, Result};
use crate::links::LinkBuilder;
use crate::model::Newsletter;
use crate::repo::Repos;

mod email;
mod worker;

pub use worker::{spawn_worker, DispatchQueue};

/// Outcome of one newsletter dispatch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Recipients the mail transport accepted the newsletter for
    pub sent: usize,
    /// Recipients whose delivery failed
    pub failed: usize,
}

/// Sends a newsletter to every active subscriber and records per-recipient analytics
pub struct Dispatcher {
    repos: Repos,
    email_client: EmailClient,
    links: LinkBuilder,
}

impl Dispatcher {
    pub fn new(repos: Repos, email_client: EmailClient, links: LinkBuilder) -> Self {
        Self {
            repos,
            email_client,
            links,
        }
    }

    /// Fan a newsletter out to all active subscribers.
    ///
    /// Fails without side effects if the newsletter does not exist, has already been sent, or
    /// there is nobody to send to. Otherwise every recipient is attempted independently:
    /// failures are logged and counted, and the newsletter is marked as sent once the loop is
    /// done, with the number of recipients actually reached.
    #[tracing::instrument(name = "Dispatch newsletter", skip(self))]
    pub async fn dispatch(&self, newsletter_id: Uuid) -> Result<DispatchReport> {
        let newsletter = self
            .repos
            .newsletters
            .fetch(newsletter_id)
            .await?
            .ok_or_else(|| Error::not_found("Newsletter"))?;
        if newsletter.is_sent() {
            tracing::warn!("Newsletter has already been sent");
            return Err(Error::AlreadySent);
        }

        let subscribers = self.repos.subscribers.fetch_all_active().await?;
        if subscribers.is_empty() {
            tracing::warn!("No active subscribers found, newsletter left unsent");
            return Err(Error::NoRecipients);
        }

        let mut report = DispatchReport::default();
        for subscriber in subscribers {
            match self.deliver(&newsletter, &subscriber.email).await {
                Ok(()) => {
                    report.sent += 1;
                    tracing::debug!(recipient = %subscriber.email, "Newsletter delivered");
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::error!(
                        error.cause_chain = ?error,
                        "Failed to deliver newsletter to a subscriber (id: {}, email: {})",
                        subscriber.id,
                        subscriber.email
                    );
                }
            }
        }

        let recipient_count = i32::try_from(report.sent).unwrap_or(i32::MAX);
        let stamped = self
            .repos
            .newsletters
            .mark_sent(newsletter.id, Utc::now(), recipient_count)
            .await?;
        if !stamped {
            tracing::warn!("Newsletter was sent or deleted during dispatch, send record kept");
        }

        if report.sent == 0 {
            tracing::warn!(
                failed = report.failed,
                "Newsletter marked as sent without reaching any recipient"
            );
        }
        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            "Newsletter dispatch completed"
        );

        Ok(report)
    }

    async fn deliver(&self, newsletter: &Newsletter, address: &str) -> Result<()> {
        let recipient: EmailAddress = address.parse()?;
        let email = email::render(newsletter, recipient, &self.links)?;

        self.email_client.send(&email).await?;
        self.repos
            .analytics
            .record_delivery(newsletter.id, &email.recipient)
            .await
    }
}
