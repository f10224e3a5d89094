use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::links::LinkBuilder;

/// Local storage for media attached to newsletters.
///
/// Files are stored under a generated name in a single upload directory and served back through
/// the media endpoint.
#[derive(Debug, Clone)]
pub struct MediaStore {
    upload_dir: PathBuf,
    links: LinkBuilder,
}

impl MediaStore {
    pub fn new(upload_dir: impl Into<PathBuf>, links: LinkBuilder) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            links,
        }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// Store an upload and return its public URL.
    ///
    /// The stored name is a fresh UUID followed by the extension of the original filename.
    #[tracing::instrument(name = "Save media file", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, original_filename: Option<&str>, bytes: &[u8]) -> Result<String> {
        let filename = match original_filename.and_then(extension) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&filename), bytes).await?;

        Ok(self.links.media(&filename).to_string())
    }

    /// Remove a stored file given its public URL. Failures are logged, never returned
    #[tracing::instrument(name = "Delete media file", skip(self))]
    pub async fn delete(&self, url: &str) {
        let Some(filename) = url.rsplit('/').next().filter(|name| is_plain_filename(name)) else {
            tracing::warn!("Refusing to delete media outside of the upload directory");
            return;
        };

        match tokio::fs::remove_file(self.upload_dir.join(filename)).await {
            Ok(()) => tracing::debug!("Media file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Media file was already gone")
            }
            Err(e) => tracing::error!(error.cause_chain = ?e, "Failed to remove media file"),
        }
    }

    /// Read a stored file, returning its bytes and content type
    pub async fn open(&self, filename: &str) -> Result<Option<(Vec<u8>, &'static str)>> {
        if !is_plain_filename(filename) {
            return Err(Error::Validation(format!("Invalid media filename: {}", filename)));
        }

        match tokio::fs::read(self.upload_dir.join(filename)).await {
            Ok(bytes) => Ok(Some((bytes, content_type_for(filename)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
}

/// Content type of a stored media file, guessed from its extension
pub fn content_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}
