use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every rejection the service can produce. Each one aborts the request
/// before anything is written.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum AppError {
    /// Missing login, bad token, or unknown staff user.
    #[display(fmt = "{}", _0)]
    Unauthenticated(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(
        fmt = "Clocking is only allowed between {:02}:00 and {:02}:00.",
        opening_hour,
        closing_hour
    )]
    OutsideClockingHours { opening_hour: u32, closing_hour: u32 },

    #[display(fmt = "Invalid or expired store barcode.")]
    InvalidBarcode,

    /// Backing store failure. The message is logged, never returned.
    #[display(fmt = "Storage error: {}", _0)]
    Storage(String),

    #[display(fmt = "Another scan for this session was recorded first. Please scan again.")]
    Conflict,

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database call failed");
        AppError::Storage(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!(error = %e, "Token rejected");
        AppError::Unauthenticated("Invalid or expired token".into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::OutsideClockingHours { .. } => {
                StatusCode::FORBIDDEN
            }
            AppError::InvalidBarcode | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Don't expose storage details to clients
        let message = match self {
            AppError::Storage(_) | AppError::Internal(_) => {
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
