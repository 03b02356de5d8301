use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::booking::ticket_number;
use crate::models::seats;
use crate::models::{Booking, NewBooking, NewPayment, PaymentStatus, SeatSet};
use crate::services::clock::Clock;
use crate::services::coordinator::{OccurrenceLock, TransactionCoordinator};
use crate::services::error::BookingError;
use crate::services::round_money;
use crate::store::{BookingStore, StoreTx};

/// How much of the last charge a customer gets back, and how early they
/// must cancel to get it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefundPolicy {
    pub refund_ratio: Decimal,
    pub cancellation_window: Duration,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            refund_ratio: Decimal::new(85, 2),
            cancellation_window: Duration::hours(24),
        }
    }
}

impl RefundPolicy {
    pub fn refund_for(&self, charged: Decimal) -> Decimal {
        round_money(charged * self.refund_ratio)
    }

    fn note(&self) -> String {
        let fee = ((Decimal::ONE - self.refund_ratio) * Decimal::ONE_HUNDRED).normalize();
        format!("Customer Cancelled ({}% fee)", fee)
    }
}

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub occurrence_id: i64,
    pub quantity: i32,
    pub seats: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefundOutcome {
    Refunded { amount: Decimal, payment_id: i64 },
    AlreadyCancelled,
}

/// Records a Confirmed booking on a locked occurrence.
///
/// Reserves capacity and seats, inserts the row with the pending ticket
/// number, then assigns `EM-{year}-{id:06}` once the id is known. Nothing is
/// visible until the lock is committed.
pub(crate) async fn create_in<T: StoreTx>(
    lock: &mut OccurrenceLock<T>,
    customer_id: i64,
    quantity: i32,
    seats: &SeatSet,
    total_amount: Decimal,
    now: DateTime<Utc>,
) -> Result<Booking, BookingError> {
    let assigned = lock.reserve(quantity, seats)?;
    let occurrence_id = lock.occurrence().id;

    let mut booking = lock
        .tx()
        .insert_booking(NewBooking {
            occurrence_id,
            customer_id,
            quantity,
            seats_occupied: assigned,
            total_amount,
            created_at: now,
        })
        .await?;

    let ticket = ticket_number(now.year(), booking.id);
    lock.tx().assign_ticket_number(booking.id, &ticket).await?;
    booking.ticket_number = ticket;

    Ok(booking)
}

/// Moves a Confirmed booking to Cancelled and frees what it held.
async fn cancel_in<T: StoreTx>(
    lock: &mut OccurrenceLock<T>,
    booking: &Booking,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    lock.release(booking);
    lock.tx().mark_booking_cancelled(booking.id, now).await?;
    Ok(())
}

pub struct BookingService<S> {
    coordinator: TransactionCoordinator<S>,
    clock: Arc<dyn Clock>,
    policy: RefundPolicy,
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(
        coordinator: TransactionCoordinator<S>,
        clock: Arc<dyn Clock>,
        policy: RefundPolicy,
    ) -> Self {
        Self {
            coordinator,
            clock,
            policy,
        }
    }

    pub async fn create(
        &self,
        customer_id: i64,
        request: CreateBooking,
    ) -> Result<Booking, BookingError> {
        if request.occurrence_id <= 0 {
            return Err(BookingError::invalid("OccurrenceId is required."));
        }
        if request.quantity <= 0 {
            return Err(BookingError::invalid("Quantity must be greater than 0."));
        }
        let requested: SeatSet = seats::normalize(&request.seats).into_iter().collect();

        let mut lock = self.coordinator.lock_occurrence(request.occurrence_id).await?;
        let total = lock.occurrence().price * Decimal::from(request.quantity);
        let booking = create_in(
            &mut lock,
            customer_id,
            request.quantity,
            &requested,
            total,
            self.clock.now(),
        )
        .await?;
        let occurrence = lock.commit().await?;

        info!(
            booking_id = booking.id,
            occurrence_id = occurrence.id,
            customer_id,
            quantity = booking.quantity,
            remaining_capacity = occurrence.remaining_capacity,
            ticket_number = %booking.ticket_number,
            "Booking created"
        );
        Ok(booking)
    }

    /// Cancels without refund. Cancelling twice is a no-op.
    pub async fn cancel(
        &self,
        customer_id: i64,
        booking_id: i64,
    ) -> Result<CancelOutcome, BookingError> {
        let booking = self.get(customer_id, booking_id).await?;
        if booking.is_cancelled() {
            return Ok(CancelOutcome::AlreadyCancelled);
        }

        let mut lock = self.coordinator.lock_occurrence(booking.occurrence_id).await?;
        // Another request may have cancelled it while we waited for the lock.
        let booking = lock
            .tx()
            .lock_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound("Booking"))?;
        if booking.is_cancelled() {
            return Ok(CancelOutcome::AlreadyCancelled);
        }

        cancel_in(&mut lock, &booking, self.clock.now()).await?;
        let occurrence = lock.commit().await?;

        info!(
            booking_id,
            occurrence_id = occurrence.id,
            released = booking.quantity,
            remaining_capacity = occurrence.remaining_capacity,
            "Booking cancelled"
        );
        Ok(CancelOutcome::Cancelled)
    }

    /// Cancels and refunds the last successful charge minus the cancellation
    /// fee. Only allowed on Scheduled occurrences at least the policy window
    /// before the start. Cancelling twice is a no-op.
    pub async fn cancel_with_refund(
        &self,
        customer_id: i64,
        booking_id: i64,
    ) -> Result<RefundOutcome, BookingError> {
        let booking = self.get(customer_id, booking_id).await?;
        if booking.is_cancelled() {
            return Ok(RefundOutcome::AlreadyCancelled);
        }

        let mut lock = self.coordinator.lock_occurrence(booking.occurrence_id).await?;
        let booking = lock
            .tx()
            .lock_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound("Booking"))?;
        if booking.is_cancelled() {
            return Ok(RefundOutcome::AlreadyCancelled);
        }

        let now = self.clock.now();
        let occurrence = lock.occurrence();
        if !occurrence.is_scheduled() {
            return Err(BookingError::OccurrenceNotScheduled(occurrence.status));
        }
        if occurrence.starts_at() - now < self.policy.cancellation_window {
            warn!(
                booking_id,
                starts_at = %occurrence.starts_at(),
                "Refund refused, inside cancellation window"
            );
            return Err(BookingError::CancellationWindowExpired {
                hours: self.policy.cancellation_window.num_hours(),
            });
        }

        let paid = lock
            .tx()
            .last_successful_payment(booking_id)
            .await?
            .ok_or(BookingError::NoSuccessfulPayment)?;

        cancel_in(&mut lock, &booking, now).await?;

        let refund = self.policy.refund_for(paid.amount);
        let refund_row = lock
            .tx()
            .insert_payment(NewPayment {
                booking_id,
                amount: -refund,
                card: paid.card.clone(),
                status: PaymentStatus::Refunded,
                details: Some(self.policy.note()),
                created_at: now,
            })
            .await?;
        let occurrence = lock.commit().await?;

        info!(
            booking_id,
            occurrence_id = occurrence.id,
            charged = %paid.amount,
            refunded = %refund,
            refund_payment_id = refund_row.id,
            "Booking cancelled with refund"
        );
        Ok(RefundOutcome::Refunded {
            amount: refund,
            payment_id: refund_row.id,
        })
    }

    /// A customer's own booking. Other customers' bookings are reported as
    /// missing.
    pub async fn get(&self, customer_id: i64, booking_id: i64) -> Result<Booking, BookingError> {
        self.coordinator
            .store()
            .find_booking(booking_id)
            .await?
            .filter(|b| b.customer_id == customer_id)
            .ok_or(BookingError::NotFound("Booking"))
    }

    pub async fn list(&self, customer_id: i64) -> Result<Vec<Booking>, BookingError> {
        Ok(self
            .coordinator
            .store()
            .bookings_for_customer(customer_id)
            .await?)
    }
}
