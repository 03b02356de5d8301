//! In-process store used by the test suite and for running without Postgres.
//!
//! Each occurrence has its own async mutex standing in for the row lock, so
//! transactions on different occurrences never wait on each other. Writes are
//! staged on the transaction and only become visible on commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::models::booking::PENDING_TICKET_NUMBER;
use crate::models::{
    Booking, BookingStatus, NewBooking, NewPayment, Occurrence, OccurrenceStatus, Payment,
    PaymentStatus,
};
use crate::store::{BookingStore, StoreError, StoreTx};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    booking_seq: AtomicI64,
    payment_seq: AtomicI64,
}

#[derive(Default)]
struct Tables {
    occurrences: HashMap<i64, Occurrence>,
    bookings: BTreeMap<i64, Booking>,
    payments: BTreeMap<i64, Payment>,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, occurrence_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(occurrence_id)
            .or_default()
            .clone()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces an occurrence row outside of any transaction.
    pub fn insert_occurrence(&self, occurrence: Occurrence) {
        self.inner
            .tables()
            .occurrences
            .insert(occurrence.id, occurrence);
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn lock_occurrence(
        &self,
        occurrence_id: i64,
        timeout: Duration,
    ) -> Result<Option<(MemoryTx, Occurrence)>, StoreError> {
        if !self.inner.tables().occurrences.contains_key(&occurrence_id) {
            return Ok(None);
        }

        let row_lock = self.inner.row_lock(occurrence_id);
        let guard = tokio::time::timeout(timeout, row_lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(occurrence_id))?;

        // Re-read after acquiring the lock so the caller sees the last commit.
        let Some(occurrence) = self.inner.tables().occurrences.get(&occurrence_id).cloned() else {
            return Ok(None);
        };

        let tx = MemoryTx {
            inner: Arc::clone(&self.inner),
            _row_lock: guard,
            occurrence: None,
            bookings: BTreeMap::new(),
            payments: Vec::new(),
        };
        Ok(Some((tx, occurrence)))
    }

    async fn find_occurrence(&self, occurrence_id: i64) -> Result<Option<Occurrence>, StoreError> {
        Ok(self.inner.tables().occurrences.get(&occurrence_id).cloned())
    }

    async fn scheduled_occurrences_after(
        &self,
        event_id: i64,
        after: NaiveDate,
    ) -> Result<Vec<i64>, StoreError> {
        let mut ids: Vec<i64> = self
            .inner
            .tables()
            .occurrences
            .values()
            .filter(|o| {
                o.event_id == event_id && o.status == OccurrenceStatus::Scheduled && o.date > after
            })
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        Ok(self.inner.tables().bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .inner
            .tables()
            .bookings
            .values()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn bookings_for_occurrence(&self, occurrence_id: i64) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .inner
            .tables()
            .bookings
            .values()
            .filter(|b| b.occurrence_id == occurrence_id)
            .cloned()
            .collect())
    }

    async fn payments_for_booking(&self, booking_id: i64) -> Result<Vec<Payment>, StoreError> {
        let mut payments: Vec<Payment> = self
            .inner
            .tables()
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(payments)
    }
}

/// Open transaction on a [`MemoryStore`]; holds the occurrence lock.
pub struct MemoryTx {
    inner: Arc<Inner>,
    _row_lock: OwnedMutexGuard<()>,
    occurrence: Option<Occurrence>,
    bookings: BTreeMap<i64, Booking>,
    payments: Vec<Payment>,
}

impl MemoryTx {
    fn booking_mut(&mut self, booking_id: i64) -> Result<&mut Booking, StoreError> {
        if !self.bookings.contains_key(&booking_id) {
            let committed = self
                .inner
                .tables()
                .bookings
                .get(&booking_id)
                .cloned()
                .ok_or_else(|| StoreError::Corrupt(format!("booking {} vanished", booking_id)))?;
            self.bookings.insert(booking_id, committed);
        }

        self.bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::Corrupt(format!("booking {} vanished", booking_id)))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.occurrence = Some(occurrence.clone());
        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        if let Some(staged) = self.bookings.get(&booking_id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.inner.tables().bookings.get(&booking_id).cloned())
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, StoreError> {
        let id = self.inner.booking_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Booking {
            id,
            occurrence_id: booking.occurrence_id,
            customer_id: booking.customer_id,
            quantity: booking.quantity,
            seats_occupied: booking.seats_occupied,
            status: BookingStatus::Confirmed,
            total_amount: booking.total_amount,
            ticket_number: PENDING_TICKET_NUMBER.to_string(),
            created_at: booking.created_at,
            updated_at: booking.created_at,
        };
        self.bookings.insert(id, row.clone());
        Ok(row)
    }

    async fn assign_ticket_number(
        &mut self,
        booking_id: i64,
        ticket_number: &str,
    ) -> Result<(), StoreError> {
        self.booking_mut(booking_id)?.ticket_number = ticket_number.to_string();
        Ok(())
    }

    async fn mark_booking_cancelled(
        &mut self,
        booking_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let booking = self.booking_mut(booking_id)?;
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = at;
        Ok(())
    }

    async fn last_successful_payment(
        &mut self,
        booking_id: i64,
    ) -> Result<Option<Payment>, StoreError> {
        let tables = self.inner.tables();
        let latest = tables
            .payments
            .values()
            .chain(self.payments.iter())
            .filter(|p| p.booking_id == booking_id && p.status == PaymentStatus::Success)
            .max_by_key(|p| (p.created_at, p.id))
            .cloned();
        Ok(latest)
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError> {
        let id = self.inner.payment_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Payment {
            id,
            booking_id: payment.booking_id,
            amount: payment.amount,
            card: payment.card,
            status: payment.status,
            details: payment.details,
            created_at: payment.created_at,
        };
        self.payments.push(row.clone());
        Ok(row)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tables = self.inner.tables();
        if let Some(occurrence) = self.occurrence {
            tables.occurrences.insert(occurrence.id, occurrence);
        }
        tables.bookings.extend(self.bookings);
        for payment in self.payments {
            tables.payments.insert(payment.id, payment);
        }
        // `_row_lock` drops with `self`, after the writes above are visible.
        Ok(())
    }
}
