use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::services::{BookingError, ErrorKind};
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict ({code}): {message}")]
    Conflict {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("Busy: {0}")]
    Busy(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict { code, .. } => *code,
            AppError::Busy(_) => "OCCURRENCE_BUSY",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Busy(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::Conflict { code, message, .. } => {
                warn!(code, message = %message, "Request conflicts with current state");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
        }
    }

    fn conflict(code: &'static str, err: &BookingError, details: Option<Value>) -> Self {
        AppError::Conflict {
            code,
            message: err.to_string(),
            details,
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => return AppError::ValidationError(err.to_string()),
            ErrorKind::NotFound => return AppError::NotFound(err.to_string()),
            ErrorKind::Forbidden => return AppError::Forbidden(err.to_string()),
            ErrorKind::Busy => return AppError::Busy(err.to_string()),
            ErrorKind::Conflict | ErrorKind::Internal => {}
        }

        match &err {
            BookingError::OccurrenceNotScheduled(_) => {
                AppError::conflict("OCCURRENCE_NOT_SCHEDULED", &err, None)
            }
            BookingError::InsufficientCapacity {
                requested,
                remaining,
            } => AppError::conflict(
                "INSUFFICIENT_CAPACITY",
                &err,
                Some(json!({ "requested": requested, "remaining": remaining })),
            ),
            BookingError::SeatCountMismatch { .. } => {
                AppError::conflict("SEAT_COUNT_MISMATCH", &err, None)
            }
            BookingError::SeatCollision { seats } => {
                AppError::conflict("SEAT_COLLISION", &err, Some(json!({ "seats": seats })))
            }
            BookingError::CancellationWindowExpired { .. } => {
                AppError::conflict("CANCELLATION_WINDOW_EXPIRED", &err, None)
            }
            BookingError::NoSuccessfulPayment => {
                AppError::conflict("NO_SUCCESSFUL_PAYMENT", &err, None)
            }
            BookingError::CardNotFound => AppError::conflict("CARD_DECLINED", &err, None),
            BookingError::InsufficientBalance => {
                AppError::conflict("INSUFFICIENT_BALANCE", &err, None)
            }
            BookingError::Coupon(_) => AppError::conflict("INVALID_COUPON", &err, None),
            BookingError::PaymentStore(inner) => {
                AppError::ExternalServiceError(format!("payment store: {}", inner))
            }
            other => AppError::InternalServerError(format!("{:?}", other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Infrastructure failures only get a generic message.
        let (public_message, details) = match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Busy(msg) => (msg, None),
            AppError::Conflict {
                message, details, ..
            } => (message, details),
            AppError::ExternalServiceError(_) => {
                ("Payment processor is unavailable".to_string(), None)
            }
            AppError::InternalServerError(_) => ("An internal error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}
