use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::handlers::CustomerId;
use crate::models::{Booking, BookingStatus};
use crate::services::{CancelOutcome, CreateBooking, RefundOutcome};
use crate::state::AppState;
use crate::store::BookingStore;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub occurrence_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub seats: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: i64,
    pub occurrence_id: i64,
    pub ticket_number: String,
    pub quantity: i32,
    pub seats_occupied: Vec<String>,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            occurrence_id: booking.occurrence_id,
            seats_occupied: booking.seats_occupied.to_vec(),
            ticket_number: booking.ticket_number,
            quantity: booking.quantity,
            total_amount: booking.total_amount,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub message: String,
    pub refunded_amount: Decimal,
    pub refund_payment_id: Option<i64>,
}

pub async fn list_bookings<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
) -> Result<Response, AppError> {
    let bookings: Vec<BookingResponse> = state
        .bookings
        .list(customer_id)
        .await?
        .into_iter()
        .map(BookingResponse::from)
        .collect();

    Ok(success(bookings, "Bookings retrieved").into_response())
}

pub async fn create_booking<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    let booking = state
        .bookings
        .create(
            customer_id,
            CreateBooking {
                occurrence_id: body.occurrence_id,
                quantity: body.quantity,
                seats: body.seats,
            },
        )
        .await?;

    Ok(created(BookingResponse::from(booking), "Booking created successfully.").into_response())
}

pub async fn get_booking<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Path(booking_id): Path<i64>,
) -> Result<Response, AppError> {
    let booking = state.bookings.get(customer_id, booking_id).await?;
    Ok(success(BookingResponse::from(booking), "Booking retrieved").into_response())
}

pub async fn cancel_booking<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Path(booking_id): Path<i64>,
) -> Result<Response, AppError> {
    let message = match state.bookings.cancel(customer_id, booking_id).await? {
        CancelOutcome::Cancelled => "Booking cancelled successfully.",
        CancelOutcome::AlreadyCancelled => "Booking is already cancelled.",
    };
    Ok(empty_success(message).into_response())
}

pub async fn cancel_with_refund<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Path(booking_id): Path<i64>,
) -> Result<Response, AppError> {
    let body = match state
        .bookings
        .cancel_with_refund(customer_id, booking_id)
        .await?
    {
        RefundOutcome::Refunded { amount, payment_id } => RefundResponse {
            message: "Booking cancelled and refunded.".to_string(),
            refunded_amount: amount,
            refund_payment_id: Some(payment_id),
        },
        RefundOutcome::AlreadyCancelled => RefundResponse {
            message: "Booking is already cancelled.".to_string(),
            refunded_amount: Decimal::ZERO,
            refund_payment_id: None,
        },
    };

    let message = body.message.clone();
    Ok(success(body, message).into_response())
}
