use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::api::models::whiteboard::ErrorBody;

/// Pipeline stage in which a processing failure occurred.
///
/// Only ever visible in server logs; the HTTP response carries the same
/// generic message regardless of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the multipart form body
    Parse,
    /// The vision call turning the image into text
    Extraction,
    /// The follow-up call condensing the extracted text
    Summarization,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Extraction => "extraction",
            Stage::Summarization => "summarization",
        };
        write!(f, "{name}")
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// The form body carried no usable `image` field
    #[error("no image provided")]
    MissingImage,

    /// Any failure between accepting the upload and producing the result
    #[error("whiteboard processing failed during {stage}")]
    Processing {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    /// Upload exceeded the configured size cap
    #[error("payload too large: {message}")]
    PayloadTooLarge { message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingImage => StatusCode::BAD_REQUEST,
            Error::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::MissingImage => "No image provided".to_string(),
            // All downstream failures collapse into the same generic message;
            // the stage is only ever named in logs.
            Error::Processing { .. } => "Failed to process whiteboard image".to_string(),
            Error::PayloadTooLarge { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Processing { stage, source } => {
                tracing::error!("Whiteboard processing failed during {stage}: {source:#}");
            }
            Error::MissingImage | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorBody {
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
