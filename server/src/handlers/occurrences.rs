use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::handlers::CustomerId;
use crate::models::{Occurrence, OccurrenceStatus};
use crate::state::AppState;
use crate::store::BookingStore;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapacityRequest {
    pub remaining_capacity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceResponse {
    pub occurrence_id: i64,
    pub event_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub price: Decimal,
    pub remaining_capacity: i32,
    pub seats_occupied: Vec<String>,
    pub status: OccurrenceStatus,
}

impl From<Occurrence> for OccurrenceResponse {
    fn from(occurrence: Occurrence) -> Self {
        Self {
            occurrence_id: occurrence.id,
            event_id: occurrence.event_id,
            date: occurrence.date,
            time: occurrence.time,
            price: occurrence.price,
            remaining_capacity: occurrence.remaining_capacity,
            seats_occupied: occurrence.seats_occupied.to_vec(),
            status: occurrence.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesCancelled {
    pub event_id: i64,
    pub cancelled_occurrences: usize,
}

pub async fn cancel_event<S: BookingStore>(
    State(state): State<AppState<S>>,
    _organizer: CustomerId,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let cancelled = state.occurrences.cancel_series(event_id).await?;
    let body = SeriesCancelled {
        event_id,
        cancelled_occurrences: cancelled,
    };
    Ok(success(body, "Upcoming occurrences cancelled.").into_response())
}

pub async fn cancel_occurrence<S: BookingStore>(
    State(state): State<AppState<S>>,
    _organizer: CustomerId,
    Path((event_id, occurrence_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    state.occurrences.find(event_id, occurrence_id).await?;
    let message = if state.occurrences.cancel_occurrence(occurrence_id).await? {
        "Occurrence cancelled."
    } else {
        "Occurrence is already cancelled."
    };
    Ok(empty_success(message).into_response())
}

pub async fn update_capacity<S: BookingStore>(
    State(state): State<AppState<S>>,
    _organizer: CustomerId,
    Path((event_id, occurrence_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateCapacityRequest>,
) -> Result<Response, AppError> {
    state.occurrences.find(event_id, occurrence_id).await?;
    let occurrence = state
        .occurrences
        .update_capacity(occurrence_id, body.remaining_capacity)
        .await?;
    Ok(success(OccurrenceResponse::from(occurrence), "Capacity updated.").into_response())
}
