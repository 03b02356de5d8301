use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::OccurrenceStatus;
use crate::store::{PaymentStoreError, StoreError};

/// How a failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; retrying the same input will fail again.
    InvalidInput,
    NotFound,
    Forbidden,
    /// A business rule rejected the attempt. Nothing was written.
    Conflict,
    /// The occurrence lock could not be taken in time; retry from scratch.
    Busy,
    Internal,
}

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Invalid coupon code.")]
    Invalid,

    #[error("Coupon is not active.")]
    Inactive,

    #[error("Coupon is expired.")]
    Expired,

    #[error("Coupon requires minimum amount {minimum:.2}.")]
    MinimumAmountNotMet { minimum: Decimal },

    #[error("Coupon type is invalid in the payment store.")]
    InvalidConfiguration,

    #[error(transparent)]
    Store(#[from] PaymentStoreError),
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("You do not have access to this {0}.")]
    Forbidden(&'static str),

    #[error("Occurrence status is '{0}', only Scheduled occurrences accept this operation.")]
    OccurrenceNotScheduled(OccurrenceStatus),

    #[error("Not enough remaining capacity.")]
    InsufficientCapacity { requested: i32, remaining: i32 },

    #[error("Seats count must match quantity.")]
    SeatCountMismatch { seats: usize, quantity: i32 },

    #[error("One or more selected seats are already occupied.")]
    SeatCollision { seats: Vec<String> },

    #[error("Bookings can only be cancelled at least {hours} hours before the event starts.")]
    CancellationWindowExpired { hours: i64 },

    #[error("No successful payment found for this booking. Refund cannot be processed.")]
    NoSuccessfulPayment,

    #[error("Incorrect card details.")]
    CardNotFound,

    #[error("Insufficient balance.")]
    InsufficientBalance,

    #[error(transparent)]
    Coupon(CouponError),

    #[error("Occurrence {0} is busy, retry the request.")]
    Busy(i64),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    PaymentStore(#[from] PaymentStoreError),

    #[error("settlement task failed")]
    Settlement(#[from] tokio::task::JoinError),
}

impl BookingError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BookingError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidInput(_) => ErrorKind::InvalidInput,
            BookingError::NotFound(_) => ErrorKind::NotFound,
            BookingError::Forbidden(_) => ErrorKind::Forbidden,
            BookingError::OccurrenceNotScheduled(_)
            | BookingError::InsufficientCapacity { .. }
            | BookingError::SeatCountMismatch { .. }
            | BookingError::SeatCollision { .. }
            | BookingError::CancellationWindowExpired { .. }
            | BookingError::NoSuccessfulPayment
            | BookingError::CardNotFound
            | BookingError::InsufficientBalance
            | BookingError::Coupon(_) => ErrorKind::Conflict,
            BookingError::Busy(_) => ErrorKind::Busy,
            BookingError::Store(_)
            | BookingError::PaymentStore(_)
            | BookingError::Settlement(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout(occurrence_id) => BookingError::Busy(occurrence_id),
            other => BookingError::Store(other),
        }
    }
}

impl From<CouponError> for BookingError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Store(inner) => BookingError::PaymentStore(inner),
            other => BookingError::Coupon(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_becomes_busy() {
        let err = BookingError::from(StoreError::LockTimeout(4));
        assert!(matches!(err, BookingError::Busy(4)));
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn coupon_rejections_are_conflicts_but_store_failures_are_internal() {
        assert_eq!(
            BookingError::from(CouponError::Expired).kind(),
            ErrorKind::Conflict
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = BookingError::from(CouponError::Store(PaymentStoreError::Io(io)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn minimum_amount_message_shows_two_decimals() {
        let err = CouponError::MinimumAmountNotMet {
            minimum: Decimal::new(50, 0),
        };
        assert_eq!(err.to_string(), "Coupon requires minimum amount 50.00.");
    }
}
