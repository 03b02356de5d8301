pub mod booking;
pub mod card;
pub mod occurrence;
pub mod payment;
pub mod seats;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use card::{CardAccount, CardDetails, Coupon, CouponKind, PaymentMockData};
pub use occurrence::{Occurrence, OccurrenceStatus};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use seats::SeatSet;
