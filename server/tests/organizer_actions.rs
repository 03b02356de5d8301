mod common;

use chrono::NaiveDate;

use common::*;

use eventmaster_server::models::{Occurrence, OccurrenceStatus};
use eventmaster_server::services::{BookingError, CreateBooking};

fn on(id: i64, date: NaiveDate) -> Occurrence {
    Occurrence {
        date,
        ..occurrence(id, 10)
    }
}

#[tokio::test]
async fn cancelling_an_occurrence_is_idempotent_and_blocks_sales() {
    let h = Harness::new();
    h.add(occurrence(1, 10));
    let booking = h
        .state
        .bookings
        .create(
            CUSTOMER,
            CreateBooking {
                occurrence_id: 1,
                quantity: 2,
                seats: Vec::new(),
            },
        )
        .await
        .unwrap();

    assert!(h.state.occurrences.cancel_occurrence(1).await.unwrap());
    assert!(!h.state.occurrences.cancel_occurrence(1).await.unwrap());

    let occurrence = h.occurrence(1).await;
    assert_eq!(occurrence.status, OccurrenceStatus::Cancelled);
    assert_eq!(occurrence.remaining_capacity, 8);

    // Existing bookings are left alone.
    let kept = h.state.bookings.get(CUSTOMER, booking.id).await.unwrap();
    assert!(!kept.is_cancelled());

    let err = h
        .state
        .bookings
        .create(
            CUSTOMER,
            CreateBooking {
                occurrence_id: 1,
                quantity: 1,
                seats: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::OccurrenceNotScheduled(OccurrenceStatus::Cancelled)
    ));
}

#[tokio::test]
async fn completed_occurrence_cannot_be_cancelled() {
    let h = Harness::new();
    h.add(Occurrence {
        status: OccurrenceStatus::Completed,
        ..occurrence(1, 10)
    });

    let err = h.state.occurrences.cancel_occurrence(1).await.unwrap_err();
    assert!(matches!(
        err,
        BookingError::OccurrenceNotScheduled(OccurrenceStatus::Completed)
    ));
}

#[tokio::test]
async fn series_cancel_only_touches_upcoming_scheduled_dates() {
    let h = Harness::new();
    // The clock reads 2026-06-01.
    h.add(on(1, NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()));
    h.add(on(2, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()));
    h.add(on(3, NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()));
    h.add(on(4, NaiveDate::from_ymd_opt(2026, 8, 15).unwrap()));
    h.add(Occurrence {
        status: OccurrenceStatus::Completed,
        ..on(5, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
    });
    h.add(Occurrence {
        event_id: EVENT + 1,
        ..on(6, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
    });

    let cancelled = h.state.occurrences.cancel_series(EVENT).await.unwrap();
    assert_eq!(cancelled, 2);

    let statuses = [
        (1, OccurrenceStatus::Scheduled),
        (2, OccurrenceStatus::Scheduled),
        (3, OccurrenceStatus::Cancelled),
        (4, OccurrenceStatus::Cancelled),
        (5, OccurrenceStatus::Completed),
        (6, OccurrenceStatus::Scheduled),
    ];
    for (id, expected) in statuses {
        assert_eq!(h.occurrence(id).await.status, expected, "occurrence {}", id);
    }

    assert_eq!(h.state.occurrences.cancel_series(EVENT).await.unwrap(), 0);
}

#[tokio::test]
async fn capacity_updates_need_a_scheduled_occurrence_and_a_sane_value() {
    let h = Harness::new();
    h.add(occurrence(1, 10));

    let updated = h.state.occurrences.update_capacity(1, 40).await.unwrap();
    assert_eq!(updated.remaining_capacity, 40);
    assert_eq!(h.occurrence(1).await.remaining_capacity, 40);

    let err = h
        .state
        .occurrences
        .update_capacity(1, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidInput(_)));

    h.state.occurrences.cancel_occurrence(1).await.unwrap();
    let err = h.state.occurrences.update_capacity(1, 5).await.unwrap_err();
    assert!(matches!(err, BookingError::OccurrenceNotScheduled(_)));
}

#[tokio::test]
async fn occurrence_must_belong_to_the_event() {
    let h = Harness::new();
    h.add(occurrence(1, 10));

    assert!(h.state.occurrences.find(EVENT, 1).await.is_ok());
    let err = h.state.occurrences.find(EVENT + 1, 1).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));
}
