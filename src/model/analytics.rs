use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

/// Delivery/open state for one recipient of one newsletter.
/// At most one record exists per (newsletter, recipient) pair.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    pub newsletter_id: Uuid,
    pub recipient_email: String,
    pub opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
}

/// Read-time aggregation over a set of analytics records
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_sent: i64,
    pub total_opened: i64,
}

impl AnalyticsSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AnalyticsRecord>) -> Self {
        records.into_iter().fold(
            Self {
                total_sent: 0,
                total_opened: 0,
            },
            |mut summary, record| {
                summary.total_sent += 1;
                if record.opened {
                    summary.total_opened += 1;
                }
                summary
            },
        )
    }

    /// Open rate as a percentage rounded to two decimals, `0` when nothing was sent
    pub fn open_rate(&self) -> f64 {
        if self.total_sent == 0 {
            return 0.0;
        }
        let rate = self.total_opened as f64 / self.total_sent as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}
