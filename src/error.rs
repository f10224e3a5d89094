pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    // Dispatch and scheduling errors
    #[error("No active subscribers found")]
    NoRecipients,
    #[error("Scheduled time must be in the future")]
    InvalidTime,
    #[error("Newsletter has already been sent")]
    AlreadySent,
    // Email client errors
    #[error("Failed to send email: {0}")]
    SendEmail(#[from] reqwest::Error),
    #[error("Failed to render email: {0}")]
    Template(#[from] askama::Error),
    // Storage errors
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }
}
