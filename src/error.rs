//! Error taxonomy for the render pipeline and its HTTP mapping.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use crate::logo::LogoTooLargeError;
use crate::qrcode::EncodingError;

/// Malformed or out-of-range request fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("content must not be empty")]
    EmptyContent,
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("{field} must be a #rrggbb color, got {value:?}")]
    InvalidColor { field: &'static str, value: String },
    #[error("logo_url must be an http(s) or data URL, got {0:?}")]
    InvalidLogoUrl(String),
    #[error("rendered image would be {side}px wide, the limit is {max}px")]
    ImageTooLarge { side: u64, max: u32 },
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Everything that can stop a render from producing an image.
///
/// A failed logo fetch is deliberately absent: it degrades to a render without a logo.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    LogoTooLarge(#[from] LogoTooLargeError),
    #[error("internal render error: {0}")]
    Internal(String),
}

impl RenderError {
    /// Machine-readable reason reported to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Encoding(_) => "encoding_error",
            Self::LogoTooLarge(_) => "logo_too_large",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Encoding(_) | Self::LogoTooLarge(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    reason: &'static str,
    message: String,
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "render failed");
        } else {
            debug!(err = %self, reason = self.reason(), "rejected render request");
        }
        let body = ErrorBody {
            reason: self.reason(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
