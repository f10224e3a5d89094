use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

/// Stored subscriber record
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    /// Normalized (lowercase) email address, unique across subscribers
    pub email: String,
    /// `false` once the subscriber has opted out; only subscribed records receive newsletters
    pub subscribed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}
