//! Error types
//!
//! `Error` covers the HTTP media path. Relay-side failures have their own
//! type in [`crate::relay::RelayError`] because they never leave the
//! connection they happened on.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for media and server operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested media file does not exist
    #[error("media not found: {0}")]
    NotFound(String),

    /// The range header parsed but cannot be satisfied by a file of `size` bytes
    #[error("range not satisfiable for resource of {size} bytes")]
    RangeNotSatisfiable {
        /// Size of the resource in bytes
        size: u64,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid server configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Error::Io(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            Error::RangeNotSatisfiable { size } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
            )
                .into_response(),
            Error::Io(ref e) => {
                tracing::error!(error = %e, "I/O error while serving media");
                let body = ErrorBody {
                    error: "Internal server error".to_string(),
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    error: other.to_string(),
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::NotFound("a.mp4".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::RangeNotSatisfiable { size: 10 }.status(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(Error::from(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unsatisfiable_response_carries_content_range() {
        let response = Error::RangeNotSatisfiable { size: 1234 }.into_response();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes */1234"
        );
    }
}
