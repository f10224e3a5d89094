use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde_json::json;

use thiserror::Error;

use crate::error::Error;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Error> for RestError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(_)
            | Error::NotFound(_)
            | Error::Conflict(_)
            | Error::NoRecipients
            | Error::InvalidTime
            | Error::AlreadySent => Self::BadRequest(e.to_string()),
            Error::SendEmail(e) => {
                tracing::error!(error.cause_chain = ?e, "Mail transport error");
                Self::InternalError("Failed to send email".into())
            }
            Error::Template(e) => {
                tracing::error!(error.cause_chain = ?e, "Email template error");
                Self::InternalError("Failed to render email".into())
            }
            Error::Database(e) => {
                tracing::error!(error.cause_chain = ?e, "Database error");
                Self::InternalError("Database error".into())
            }
            Error::Io(e) => {
                tracing::error!(error.cause_chain = ?e, "Storage error");
                Self::InternalError("Storage error".into())
            }
        }
    }
}

impl From<MultipartError> for RestError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("Malformed multipart body: {}", e))
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Other(e) => {
                tracing::error!(error.cause_chain = ?e, "Unhandled error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message,
        }))
    }
}
