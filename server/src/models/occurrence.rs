use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::seats::SeatSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl OccurrenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceStatus::Scheduled => "Scheduled",
            OccurrenceStatus::Cancelled => "Cancelled",
            OccurrenceStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccurrenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(OccurrenceStatus::Scheduled),
            "Cancelled" => Ok(OccurrenceStatus::Cancelled),
            "Completed" => Ok(OccurrenceStatus::Completed),
            other => Err(format!("unknown occurrence status '{}'", other)),
        }
    }
}

/// One scheduled instance of an event at a venue.
///
/// `seated` mirrors the venue's seating flag and is read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub id: i64,
    pub event_id: i64,
    pub venue_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub price: Decimal,
    pub remaining_capacity: i32,
    pub seats_occupied: SeatSet,
    pub status: OccurrenceStatus,
    pub seated: bool,
}

impl Occurrence {
    /// Start instant. Occurrence date and time are UTC throughout the system.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == OccurrenceStatus::Scheduled
    }
}
