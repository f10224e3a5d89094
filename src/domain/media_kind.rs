use serde::{Deserialize, Serialize};

/// Kind of media attached to a newsletter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "media_kind", rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Derive the media kind from an upload's MIME type, e.g. `image/png`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let top_level = content_type.split('/').next()?.trim();
        if top_level.eq_ignore_ascii_case("image") {
            Some(Self::Image)
        } else if top_level.eq_ignore_ascii_case("video") {
            Some(Self::Video)
        } else {
            None
        }
    }
}
