use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Service error taxonomy.
///
/// Every failure surfaced over HTTP falls into one of two kinds: the caller
/// sent something unusable, or a step after validation failed. There is no
/// finer distinction in the response contract.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or malformed request input; the caller must resubmit
    #[error("{message}")]
    Validation { message: String },

    /// Request body exceeded the configured upload limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Disk I/O or removal-capability failure after validation
    #[error("{message}")]
    Processing { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation { message: message.into() }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Error::Processing { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the JSON `error` field of the response body.
    ///
    /// Processing errors expose the underlying message to the caller. That
    /// matches the observed contract of this service; see DESIGN.md for the
    /// disclosure trade-off.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } | Error::PayloadTooLarge { message } | Error::Processing { message } => message.clone(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Processing { message: err.to_string() }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain in one line
        Error::Processing {
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Validation { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Processing { .. } => {
                tracing::error!("Error processing image: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "error": self.user_message() });
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = Error::validation("No image file provided");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "No image file provided");
    }

    #[test]
    fn processing_maps_to_internal_server_error() {
        let err = Error::processing("model exploded");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn payload_too_large_maps_to_413() {
        let err = Error::PayloadTooLarge {
            message: "Uploaded image exceeds the maximum allowed size".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn io_errors_become_processing() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io);
        assert!(matches!(err, Error::Processing { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn anyhow_context_chain_is_kept() {
        use anyhow::Context;
        let err: anyhow::Error = Err::<(), _>(std::io::Error::other("socket closed"))
            .context("background removal request failed")
            .unwrap_err();
        let err = Error::from(err);
        let message = err.user_message();
        assert!(message.contains("background removal request failed"));
        assert!(message.contains("socket closed"));
    }
}
