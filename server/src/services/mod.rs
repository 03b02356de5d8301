//! The booking consistency core.
//!
//! Capacity, seats, bookings and payments only change inside an
//! [`OccurrenceLock`](coordinator::OccurrenceLock), so every mutation of one
//! occurrence is serialized by its row lock.

use rust_decimal::{Decimal, RoundingStrategy};

pub mod bookings;
pub mod clock;
pub mod coordinator;
pub mod coupons;
pub mod error;
pub mod ledger;
pub mod occurrences;
pub mod payments;

pub use bookings::{BookingService, CancelOutcome, CreateBooking, RefundOutcome, RefundPolicy};
pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::{OccurrenceLock, TransactionCoordinator};
pub use coupons::{CouponEvaluator, CouponQuote};
pub use error::{BookingError, CouponError, ErrorKind};
pub use occurrences::OccurrenceService;
pub use payments::{CouponValidation, FinalizeBooking, FinalizedBooking, PaymentService};

/// Rounds a money amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
