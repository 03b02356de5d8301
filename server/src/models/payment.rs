use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(PaymentStatus::Success),
            "Failed" => Ok(PaymentStatus::Failed),
            "Refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

/// Append-only money movement for a booking. Charges are positive, refunds
/// are separate rows with a negative amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub card: Option<String>,
    pub status: PaymentStatus,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: i64,
    pub amount: Decimal,
    pub card: Option<String>,
    pub status: PaymentStatus,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}
