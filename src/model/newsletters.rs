use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::domain::{Headline, MediaKind};

/// Media attached to a newsletter, referenced by its public URL
#[derive(Debug, Clone, PartialEq)]
pub struct NewsletterMedia {
    pub url: String,
    pub kind: MediaKind,
}

/// New or updated newsletter content
#[derive(Debug, Clone)]
pub struct NewNewsletter {
    pub title: Headline,
    pub subtitle: Headline,
    pub content: Option<String>,
    pub media: Option<NewsletterMedia>,
}

/// Stored newsletter record
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    /// Rich (HTML) content
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
    /// `None` until the newsletter has been dispatched
    pub sent_at: Option<DateTime<Utc>>,
    /// Number of recipients the newsletter was successfully sent to
    pub recipient_count: i32,
}

impl Newsletter {
    pub fn media(&self) -> Option<NewsletterMedia> {
        match (&self.media_url, self.media_kind) {
            (Some(url), Some(kind)) if !url.is_empty() => Some(NewsletterMedia {
                url: url.clone(),
                kind,
            }),
            _ => None,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}
