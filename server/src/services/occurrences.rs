use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{Occurrence, OccurrenceStatus};
use crate::services::clock::Clock;
use crate::services::coordinator::TransactionCoordinator;
use crate::services::error::BookingError;
use crate::store::BookingStore;

/// Organizer-side changes to occurrences. Existing bookings are left as
/// they are.
pub struct OccurrenceService<S> {
    coordinator: TransactionCoordinator<S>,
    clock: Arc<dyn Clock>,
}

impl<S: BookingStore> OccurrenceService<S> {
    pub fn new(coordinator: TransactionCoordinator<S>, clock: Arc<dyn Clock>) -> Self {
        Self { coordinator, clock }
    }

    /// The occurrence, if it belongs to the event.
    pub async fn find(&self, event_id: i64, occurrence_id: i64) -> Result<Occurrence, BookingError> {
        self.coordinator
            .store()
            .find_occurrence(occurrence_id)
            .await?
            .filter(|o| o.event_id == event_id)
            .ok_or(BookingError::NotFound("Event occurrence"))
    }

    /// Soft-cancels one occurrence. Returns `false` if it was already
    /// cancelled.
    pub async fn cancel_occurrence(&self, occurrence_id: i64) -> Result<bool, BookingError> {
        let mut lock = self.coordinator.lock_occurrence(occurrence_id).await?;
        match lock.occurrence().status {
            OccurrenceStatus::Cancelled => return Ok(false),
            OccurrenceStatus::Completed => {
                return Err(BookingError::OccurrenceNotScheduled(OccurrenceStatus::Completed))
            }
            OccurrenceStatus::Scheduled => {}
        }

        lock.set_status(OccurrenceStatus::Cancelled);
        let occurrence = lock.commit().await?;

        info!(
            occurrence_id,
            event_id = occurrence.event_id,
            "Occurrence cancelled"
        );
        Ok(true)
    }

    /// Cancels every Scheduled occurrence of the event dated after today.
    /// Each occurrence is locked and committed on its own.
    pub async fn cancel_series(&self, event_id: i64) -> Result<usize, BookingError> {
        let today = self.clock.today();
        let ids = self
            .coordinator
            .store()
            .scheduled_occurrences_after(event_id, today)
            .await?;

        let mut cancelled = 0;
        for occurrence_id in ids {
            let mut lock = self.coordinator.lock_occurrence(occurrence_id).await?;
            // Re-checked under the lock; a concurrent change wins.
            if !lock.occurrence().is_scheduled() {
                continue;
            }
            lock.set_status(OccurrenceStatus::Cancelled);
            lock.commit().await?;
            cancelled += 1;
        }

        if cancelled == 0 {
            warn!(event_id, "No upcoming occurrences to cancel");
        } else {
            info!(event_id, cancelled, "Event series cancelled");
        }
        Ok(cancelled)
    }

    pub async fn update_capacity(
        &self,
        occurrence_id: i64,
        remaining_capacity: i32,
    ) -> Result<Occurrence, BookingError> {
        if remaining_capacity < 0 {
            return Err(BookingError::invalid("Capacity must not be negative."));
        }

        let mut lock = self.coordinator.lock_occurrence(occurrence_id).await?;
        lock.ensure_scheduled()?;
        let previous = lock.occurrence().remaining_capacity;
        lock.set_remaining_capacity(remaining_capacity);
        let occurrence = lock.commit().await?;

        info!(
            occurrence_id,
            previous,
            remaining_capacity,
            "Occurrence capacity updated"
        );
        Ok(occurrence)
    }
}
