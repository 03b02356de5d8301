use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod bookings;
pub mod occurrences;
pub mod payments;

/// Set by the authentication gateway in front of this service.
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// The authenticated customer making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for CustomerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Customer identity is required".to_string()))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(CustomerId)
            .ok_or_else(|| AppError::AuthError("Customer identity is invalid".to_string()))
    }
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventmaster-api",
    };

    success(payload, "Health check successful").into_response()
}
