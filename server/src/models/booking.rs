use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::seats::SeatSet;

/// Placeholder stored until the row id is known.
pub const PENDING_TICKET_NUMBER: &str = "PENDING";

/// `Confirmed -> Cancelled` is the only transition; `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(BookingStatus::Confirmed),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub occurrence_id: i64,
    pub customer_id: i64,
    pub quantity: i32,
    pub seats_occupied: SeatSet,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub ticket_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

/// Values for a booking row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub occurrence_id: i64,
    pub customer_id: i64,
    pub quantity: i32,
    pub seats_occupied: SeatSet,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Human-facing reference, e.g. `EM-2026-000042`.
pub fn ticket_number(year: i32, booking_id: i64) -> String {
    format!("EM-{}-{:06}", year, booking_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_number_pads_id_to_six_digits() {
        assert_eq!(ticket_number(2026, 42), "EM-2026-000042");
        assert_eq!(ticket_number(2027, 1_234_567), "EM-2027-1234567");
    }

    #[test]
    fn status_parses_column_text() {
        assert_eq!("Confirmed".parse(), Ok(BookingStatus::Confirmed));
        assert_eq!("Cancelled".parse(), Ok(BookingStatus::Cancelled));
        assert!("Refunded".parse::<BookingStatus>().is_err());
    }
}
