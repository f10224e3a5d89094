use std::sync::Arc;

use sqlx::PgPool;

mod analytics;
mod memory;
mod newsletters;
mod scheduled_jobs;
mod subscribers;

pub use analytics::{AnalyticsRepo, PgAnalyticsRepo};
pub use memory::MemoryStore;
pub use newsletters::{NewsletterRepo, PgNewsletterRepo};
pub use scheduled_jobs::{PgScheduledJobRepo, ScheduledJobRepo};
pub use subscribers::{PgSubscriberRepo, SubscriberRepo};

/// Handles to every store the application persists to.
///
/// Each repository trait is implemented for Postgres and for the in-process [`MemoryStore`];
/// the rest of the application only ever sees the trait objects.
#[derive(Clone)]
pub struct Repos {
    pub subscribers: Arc<dyn SubscriberRepo>,
    pub newsletters: Arc<dyn NewsletterRepo>,
    pub scheduled_jobs: Arc<dyn ScheduledJobRepo>,
    pub analytics: Arc<dyn AnalyticsRepo>,
}

impl Repos {
    /// Repositories backed by a Postgres connection pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            subscribers: Arc::new(PgSubscriberRepo::new(pool.clone())),
            newsletters: Arc::new(PgNewsletterRepo::new(pool.clone())),
            scheduled_jobs: Arc::new(PgScheduledJobRepo::new(pool.clone())),
            analytics: Arc::new(PgAnalyticsRepo::new(pool)),
        }
    }

    /// Repositories sharing a single in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            subscribers: store.clone(),
            newsletters: store.clone(),
            scheduled_jobs: store.clone(),
            analytics: store,
        }
    }
}
