use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

/// A deferred send of a newsletter.
///
/// A job is `Pending` while `sent` is false. Once `sent` is set the job is terminal: it is
/// never dispatched again and can no longer be cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledJob {
    /// A job is due when it has not been sent and its target time has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.sent && self.scheduled_at <= now
    }
}
