use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::handlers::CustomerId;
use crate::models::{CardDetails, Payment, PaymentStatus};
use crate::services::{FinalizeBooking, FinalizedBooking};
use crate::state::AppState;
use crate::store::BookingStore;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub coupon_code: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeBookingRequest {
    pub occurrence_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub seats: Vec<String>,
    pub card_details: CardDetails,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub card: Option<String>,
    pub status: PaymentStatus,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            amount: payment.amount,
            card: payment.card,
            status: payment.status,
            details: payment.details,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeBookingResponse {
    pub booking_id: i64,
    pub ticket_number: String,
    pub total_amount: Decimal,
    pub seats_occupied: Vec<String>,
    pub payment: PaymentResponse,
}

impl From<FinalizedBooking> for FinalizeBookingResponse {
    fn from(finalized: FinalizedBooking) -> Self {
        let booking = finalized.booking;
        Self {
            booking_id: booking.id,
            seats_occupied: booking.seats_occupied.to_vec(),
            ticket_number: booking.ticket_number,
            total_amount: booking.total_amount,
            payment: finalized.payment.into(),
        }
    }
}

pub async fn validate_coupon<S: BookingStore>(
    State(state): State<AppState<S>>,
    _customer: CustomerId,
    Json(body): Json<ValidateCouponRequest>,
) -> Result<Response, AppError> {
    let validation = state
        .payments
        .validate_coupon(&body.coupon_code, body.amount)
        .await?;

    let message = validation.message.clone();
    Ok(success(validation, message).into_response())
}

pub async fn finalize_booking<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Json(body): Json<FinalizeBookingRequest>,
) -> Result<Response, AppError> {
    let finalized = state
        .payments
        .finalize_booking(
            customer_id,
            FinalizeBooking {
                occurrence_id: body.occurrence_id,
                quantity: body.quantity,
                seats: body.seats,
                card: body.card_details,
                coupon_code: body.coupon_code,
            },
        )
        .await?;

    Ok(created(
        FinalizeBookingResponse::from(finalized),
        "Payment approved and booking confirmed.",
    )
    .into_response())
}

pub async fn get_booking_payment<S: BookingStore>(
    State(state): State<AppState<S>>,
    CustomerId(customer_id): CustomerId,
    Path(booking_id): Path<i64>,
) -> Result<Response, AppError> {
    let payment = state.payments.latest_payment(customer_id, booking_id).await?;
    Ok(success(PaymentResponse::from(payment), "Payment retrieved").into_response())
}
