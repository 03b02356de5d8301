use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::models::{Booking, Occurrence, OccurrenceStatus, SeatSet};
use crate::services::error::BookingError;
use crate::services::ledger;
use crate::store::{BookingStore, StoreTx};

/// Opens occurrence-locked transactions. This is the only way to obtain an
/// [`OccurrenceLock`], and so the only way to change capacity or seats.
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    lock_timeout: Duration,
}

impl<S> Clone for TransactionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock_timeout: self.lock_timeout,
        }
    }
}

impl<S: BookingStore> TransactionCoordinator<S> {
    pub fn new(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Begins a transaction holding the exclusive lock on the occurrence.
    ///
    /// Concurrent callers for the same occurrence wait here; a wait longer
    /// than the configured timeout fails with [`BookingError::Busy`].
    pub async fn lock_occurrence(
        &self,
        occurrence_id: i64,
    ) -> Result<OccurrenceLock<S::Tx>, BookingError> {
        let (tx, occurrence) = self
            .store
            .lock_occurrence(occurrence_id, self.lock_timeout)
            .await?
            .ok_or(BookingError::NotFound("Event occurrence"))?;

        debug!(occurrence_id, "Occurrence locked");

        Ok(OccurrenceLock {
            tx,
            occurrence,
            dirty: false,
        })
    }
}

/// A transaction holding one occurrence row lock.
///
/// [`commit`](Self::commit) persists the occurrence and commits everything
/// written through [`tx`](Self::tx). Dropping the lock instead rolls all of it
/// back.
pub struct OccurrenceLock<T> {
    tx: T,
    occurrence: Occurrence,
    dirty: bool,
}

impl<T: StoreTx> OccurrenceLock<T> {
    pub fn occurrence(&self) -> &Occurrence {
        &self.occurrence
    }

    pub fn tx(&mut self) -> &mut T {
        &mut self.tx
    }

    pub fn ensure_scheduled(&self) -> Result<(), BookingError> {
        if !self.occurrence.is_scheduled() {
            return Err(BookingError::OccurrenceNotScheduled(self.occurrence.status));
        }
        Ok(())
    }

    pub fn ensure_bookable(&self, quantity: i32) -> Result<(), BookingError> {
        ledger::check_bookable(&self.occurrence, quantity)
    }

    pub fn reserve(&mut self, quantity: i32, seats: &SeatSet) -> Result<SeatSet, BookingError> {
        let assigned = ledger::reserve(&mut self.occurrence, quantity, seats)?;
        self.dirty = true;
        Ok(assigned)
    }

    pub fn release(&mut self, booking: &Booking) {
        ledger::release(&mut self.occurrence, booking);
        self.dirty = true;
    }

    pub fn set_status(&mut self, status: OccurrenceStatus) {
        self.occurrence.status = status;
        self.dirty = true;
    }

    pub fn set_remaining_capacity(&mut self, remaining_capacity: i32) {
        self.occurrence.remaining_capacity = remaining_capacity;
        self.dirty = true;
    }

    pub async fn commit(mut self) -> Result<Occurrence, BookingError> {
        if self.dirty {
            self.tx.save_occurrence(&self.occurrence).await?;
        }
        self.tx.commit().await?;

        debug!(occurrence_id = self.occurrence.id, "Occurrence transaction committed");
        Ok(self.occurrence)
    }
}
