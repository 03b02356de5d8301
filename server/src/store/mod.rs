//! Persistence for occurrences, bookings and payments.
//!
//! All writes go through a [`StoreTx`] obtained from
//! [`BookingStore::lock_occurrence`], which holds the exclusive lock on one
//! occurrence row until it is committed or dropped. Dropping a transaction
//! without committing rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{Booking, NewBooking, NewPayment, Occurrence, Payment};

pub mod memory;
pub mod payment_store;
pub mod postgres;

pub use memory::MemoryStore;
pub use payment_store::{CardCheck, CardLedger, CouponSource, JsonPaymentStore, PaymentStoreError};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("timed out waiting for the lock on occurrence {0}")]
    LockTimeout(i64),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    type Tx: StoreTx + 'static;

    /// Begins a transaction and takes the exclusive lock on the occurrence.
    ///
    /// Returns `Ok(None)` when the occurrence does not exist. Waiting longer
    /// than `timeout` for the lock fails with [`StoreError::LockTimeout`].
    async fn lock_occurrence(
        &self,
        occurrence_id: i64,
        timeout: Duration,
    ) -> Result<Option<(Self::Tx, Occurrence)>, StoreError>;

    async fn find_occurrence(&self, occurrence_id: i64) -> Result<Option<Occurrence>, StoreError>;

    /// Ids of Scheduled occurrences of an event dated strictly after `after`.
    async fn scheduled_occurrences_after(
        &self,
        event_id: i64,
        after: NaiveDate,
    ) -> Result<Vec<i64>, StoreError>;

    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, StoreError>;

    /// Newest first.
    async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_for_occurrence(&self, occurrence_id: i64) -> Result<Vec<Booking>, StoreError>;

    /// Newest first.
    async fn payments_for_booking(&self, booking_id: i64) -> Result<Vec<Payment>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StoreError>;

    /// Reads a booking inside the transaction, locking its row.
    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, StoreError>;

    /// Inserts the row with the pending ticket number and returns it with its id.
    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, StoreError>;

    async fn assign_ticket_number(
        &mut self,
        booking_id: i64,
        ticket_number: &str,
    ) -> Result<(), StoreError>;

    async fn mark_booking_cancelled(
        &mut self,
        booking_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn last_successful_payment(&mut self, booking_id: i64)
        -> Result<Option<Payment>, StoreError>;

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
