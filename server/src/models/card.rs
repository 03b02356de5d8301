//! Records of the mock payment processor: cards with balances and coupons.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMockData {
    #[serde(default)]
    pub card_details: Vec<CardAccount>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardAccount {
    pub name_on_card: String,
    pub card_number: String,
    pub exp: String,
    pub cvv: String,
    pub postal_code: String,
    pub amount_balance: Decimal,
}

/// Card fields as typed by the customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub name_on_card: String,
    pub card_number: String,
    pub exp: String,
    pub cvv: String,
    pub postal_code: String,
}

impl CardDetails {
    /// `**** **** **** 1234 exp 08/29`
    pub fn masked(&self) -> String {
        mask_card(self.card_number.trim(), self.exp.trim())
    }
}

impl CardAccount {
    pub fn matches(&self, card: &CardDetails) -> bool {
        self.name_on_card
            .trim()
            .eq_ignore_ascii_case(card.name_on_card.trim())
            && self.card_number == card.card_number.trim()
            && self.exp == card.exp.trim()
            && self.cvv == card.cvv.trim()
            && normalize_postal(&self.postal_code) == normalize_postal(&card.postal_code)
    }
}

pub fn mask_card(card_number: &str, exp: &str) -> String {
    let digits: Vec<char> = card_number.chars().collect();
    let last4: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** **** **** {} exp {}", last4, exp)
}

fn normalize_postal(postal: &str) -> String {
    postal
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponKind {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    /// Kept as text so a misconfigured store surfaces as a coupon error
    /// rather than failing to load.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Decimal,
    pub min_amount: Decimal,
    pub is_active: bool,
    pub expires_at: NaiveDate,
}

impl Coupon {
    pub fn kind(&self) -> Option<CouponKind> {
        let kind = self.kind.trim();
        if kind.eq_ignore_ascii_case("percent") {
            Some(CouponKind::Percent)
        } else if kind.eq_ignore_ascii_case("fixed") {
            Some(CouponKind::Fixed)
        } else {
            None
        }
    }
}
