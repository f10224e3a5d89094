use url::Url;

use uuid::Uuid;

use crate::domain::EmailAddress;

/// Builds the public URLs embedded in emails and returned to clients
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    pub fn new(mut base: Url) -> anyhow::Result<Self> {
        if base.cannot_be_a_base() {
            anyhow::bail!("{} cannot be used as a base URL", base);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// Link that unsubscribes `recipient`, e.g. `/api/subscribers/unsubscribe?email=...`
    pub fn unsubscribe(&self, recipient: &EmailAddress) -> Url {
        let mut url = self.endpoint(&["api", "subscribers", "unsubscribe"]);
        url.query_pairs_mut()
            .append_pair("email", recipient.as_ref());
        url
    }

    /// Open-tracking pixel for one recipient of one newsletter
    pub fn tracking_pixel(&self, newsletter_id: Uuid, recipient: &EmailAddress) -> Url {
        self.endpoint(&[
            "api",
            "track",
            &newsletter_id.to_string(),
            recipient.as_ref(),
        ])
    }

    /// Public URL of an uploaded media file
    pub fn media(&self, filename: &str) -> Url {
        self.endpoint(&["api", "media", filename])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects URLs that cannot be a base, so the segments are always available
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
