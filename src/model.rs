mod analytics;
mod newsletters;
mod scheduling;
mod subscribers;

pub use analytics::{AnalyticsRecord, AnalyticsSummary};
pub use newsletters::{NewNewsletter, Newsletter, NewsletterMedia};
pub use scheduling::ScheduledJob;
pub use subscribers::Subscriber;
