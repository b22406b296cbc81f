//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Only upgrade
//! rejections and REST handlers turn it into an HTTP response; inside a
//! live connection every error is logged and the offending frame dropped.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ConnectionId, DeviceId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "device id required"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Relay error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                 |
/// |-----------|---------------------|-----------------------------|
/// | 1000–1999 | Protocol / payload  | 400 / 404 / 422             |
/// | 2000–2999 | Routing / delivery  | 404 / 410 / 503             |
/// | 3000–3999 | Server              | 500 Internal Server Error   |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Upgrade request for a path that is neither a device nor the viewer
    /// endpoint.
    #[error("no relay endpoint at {0}")]
    UnknownPath(String),

    /// Device upgrade path without an identifier segment.
    #[error("device id required")]
    MissingDeviceId,

    /// Frame could not be decoded into an envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Media frame payload failed validation.
    #[error("invalid media frame: {0}")]
    InvalidFrame(String),

    /// Routed send targeted a device that is absent or no longer open.
    #[error("device {0} is not connected")]
    DeviceNotConnected(DeviceId),

    /// Send attempted on a connection whose writer has gone away.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The connection's outbound queue is at capacity; the frame was not
    /// queued.
    #[error("connection {0} is not keeping up; frame dropped")]
    QueueFull(ConnectionId),

    /// Startup configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::UnknownPath(_) => 1001,
            Self::MissingDeviceId => 1002,
            Self::MalformedMessage(_) => 1003,
            Self::InvalidFrame(_) => 1004,
            Self::DeviceNotConnected(_) => 2001,
            Self::ConnectionClosed(_) => 2002,
            Self::QueueFull(_) => 2003,
            Self::Internal(_) => 3000,
            Self::InvalidConfig(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingDeviceId | Self::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            Self::UnknownPath(_) | Self::DeviceNotConnected(_) => StatusCode::NOT_FOUND,
            Self::InvalidFrame(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConnectionClosed(_) => StatusCode::GONE,
            Self::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidConfig(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for errors raised while classifying an upgrade
    /// request; no connection object exists for these.
    #[must_use]
    pub const fn is_upgrade_rejection(&self) -> bool {
        matches!(self, Self::UnknownPath(_) | Self::MissingDeviceId)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let close = self.is_upgrade_rejection();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if close {
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        response
    }
}
