//! Capacity and seat bookkeeping for one occurrence.
//!
//! These functions mutate an in-memory [`Occurrence`] and are only reachable
//! through [`OccurrenceLock`](super::coordinator::OccurrenceLock), which holds
//! the row lock and persists the result on commit.

use crate::models::{Booking, Occurrence, SeatSet};
use crate::services::error::BookingError;

/// Status and capacity checks that do not depend on seats.
pub fn check_bookable(occurrence: &Occurrence, quantity: i32) -> Result<(), BookingError> {
    if !occurrence.is_scheduled() {
        return Err(BookingError::OccurrenceNotScheduled(occurrence.status));
    }
    if occurrence.remaining_capacity < quantity {
        return Err(BookingError::InsufficientCapacity {
            requested: quantity,
            remaining: occurrence.remaining_capacity,
        });
    }
    Ok(())
}

/// Takes `quantity` places and, for seated venues, exactly `quantity` seats.
///
/// Returns the seats now owned by the new booking. Unseated venues ignore
/// `requested` and return an empty set. On error the occurrence is unchanged.
pub(super) fn reserve(
    occurrence: &mut Occurrence,
    quantity: i32,
    requested: &SeatSet,
) -> Result<SeatSet, BookingError> {
    check_bookable(occurrence, quantity)?;

    let assigned = if occurrence.seated {
        if i32::try_from(requested.len()) != Ok(quantity) {
            return Err(BookingError::SeatCountMismatch {
                seats: requested.len(),
                quantity,
            });
        }

        let taken = occurrence.seats_occupied.overlap(requested);
        if !taken.is_empty() {
            return Err(BookingError::SeatCollision { seats: taken });
        }

        occurrence.seats_occupied.extend(requested);
        requested.clone()
    } else {
        SeatSet::new()
    };

    occurrence.remaining_capacity -= quantity;
    Ok(assigned)
}

/// Gives a booking's places and seats back. Callers must only do this once
/// per booking, i.e. while it is still Confirmed.
pub(super) fn release(occurrence: &mut Occurrence, booking: &Booking) {
    occurrence.seats_occupied.remove_all(&booking.seats_occupied);
    occurrence.remaining_capacity += booking.quantity;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seats;
    use crate::models::{BookingStatus, OccurrenceStatus};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use rust_decimal::Decimal;

    fn occurrence(capacity: i32, seated: bool, occupied: &str) -> Occurrence {
        Occurrence {
            id: 1,
            event_id: 1,
            venue_id: 1,
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            price: Decimal::new(5000, 2),
            remaining_capacity: capacity,
            seats_occupied: seats::parse(Some(occupied)),
            status: OccurrenceStatus::Scheduled,
            seated,
        }
    }

    fn booking(quantity: i32, seats_taken: &str) -> Booking {
        Booking {
            id: 9,
            occurrence_id: 1,
            customer_id: 3,
            quantity,
            seats_occupied: seats::parse(Some(seats_taken)),
            status: BookingStatus::Confirmed,
            total_amount: Decimal::ZERO,
            ticket_number: "EM-2030-000009".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unseated_reserve_only_moves_capacity() {
        let mut occ = occurrence(10, false, "");
        let assigned = reserve(&mut occ, 3, &seats::parse(Some("Z9"))).unwrap();

        assert!(assigned.is_empty());
        assert_eq!(occ.remaining_capacity, 7);
        assert!(occ.seats_occupied.is_empty());
    }

    #[test]
    fn seated_reserve_merges_seats() {
        let mut occ = occurrence(10, true, "A1,A2");
        let assigned = reserve(&mut occ, 2, &seats::parse(Some("c2,C1"))).unwrap();

        assert_eq!(seats::serialize(&assigned).as_deref(), Some("C1,c2"));
        assert_eq!(
            seats::serialize(&occ.seats_occupied).as_deref(),
            Some("A1,A2,C1,c2")
        );
        assert_eq!(occ.remaining_capacity, 8);
    }

    #[test]
    fn collision_leaves_occurrence_untouched() {
        let mut occ = occurrence(10, true, "A1,A2");
        let before = occ.clone();

        let err = reserve(&mut occ, 1, &seats::parse(Some("a1"))).unwrap_err();
        match err {
            BookingError::SeatCollision { seats } => assert_eq!(seats, vec!["a1".to_string()]),
            other => panic!("expected a seat collision, got {:?}", other),
        }
        assert_eq!(occ, before);
    }

    #[test]
    fn seated_venue_requires_one_seat_per_ticket() {
        let mut occ = occurrence(10, true, "");
        assert!(matches!(
            reserve(&mut occ, 2, &seats::parse(Some("B1"))),
            Err(BookingError::SeatCountMismatch { seats: 1, quantity: 2 })
        ));
        assert!(matches!(
            reserve(&mut occ, 1, &SeatSet::new()),
            Err(BookingError::SeatCountMismatch { seats: 0, quantity: 1 })
        ));
        assert_eq!(occ.remaining_capacity, 10);
    }

    #[test]
    fn capacity_and_status_are_checked_first() {
        let mut occ = occurrence(1, false, "");
        assert!(matches!(
            reserve(&mut occ, 2, &SeatSet::new()),
            Err(BookingError::InsufficientCapacity { requested: 2, remaining: 1 })
        ));

        occ.status = OccurrenceStatus::Cancelled;
        assert!(matches!(
            reserve(&mut occ, 1, &SeatSet::new()),
            Err(BookingError::OccurrenceNotScheduled(OccurrenceStatus::Cancelled))
        ));
    }

    #[test]
    fn release_returns_capacity_and_frees_only_own_seats() {
        let mut occ = occurrence(6, true, "A1,A2,B1,B2");
        release(&mut occ, &booking(2, "b1,B2"));

        assert_eq!(occ.remaining_capacity, 8);
        assert_eq!(seats::serialize(&occ.seats_occupied).as_deref(), Some("A1,A2"));
    }
}
