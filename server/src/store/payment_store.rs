//! The mock payment processor: a JSON file of cards and coupons.
//!
//! Every access goes through one async mutex, so a balance check followed by
//! a debit can never interleave with another debit of the same card. Writes
//! land in a temp file that is renamed over the original.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{CardDetails, Coupon, PaymentMockData};

#[derive(Debug, Error)]
pub enum PaymentStoreError {
    #[error("payment store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("payment store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of matching a card against the store.
///
/// `NoMatch` deliberately does not say which field was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardCheck {
    Approved,
    NoMatch,
    InsufficientBalance,
}

#[async_trait]
pub trait CardLedger: Send + Sync {
    /// Checks the card and its balance without changing anything.
    async fn verify(&self, card: &CardDetails, amount: Decimal)
        -> Result<CardCheck, PaymentStoreError>;

    /// Re-checks and deducts `amount` in one step. Nothing changes unless the
    /// result is [`CardCheck::Approved`].
    async fn try_debit(
        &self,
        card: &CardDetails,
        amount: Decimal,
    ) -> Result<CardCheck, PaymentStoreError>;

    /// Adds `amount` back to the card. Returns `false` if no card matched.
    async fn credit(&self, card: &CardDetails, amount: Decimal) -> Result<bool, PaymentStoreError>;
}

#[async_trait]
pub trait CouponSource: Send + Sync {
    /// Case-insensitive lookup by code.
    async fn find_coupon(&self, code: &str) -> Result<Option<Coupon>, PaymentStoreError>;
}

pub struct JsonPaymentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPaymentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents of the store.
    pub async fn snapshot(&self) -> Result<PaymentMockData, PaymentStoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn read(&self) -> Result<PaymentMockData, PaymentStoreError> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn write(&self, data: &PaymentMockData) -> Result<(), PaymentStoreError> {
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn check(data: &PaymentMockData, card: &CardDetails, amount: Decimal) -> (CardCheck, Option<usize>) {
    match data.card_details.iter().position(|c| c.matches(card)) {
        None => (CardCheck::NoMatch, None),
        Some(idx) if data.card_details[idx].amount_balance < amount => {
            (CardCheck::InsufficientBalance, Some(idx))
        }
        Some(idx) => (CardCheck::Approved, Some(idx)),
    }
}

#[async_trait]
impl CardLedger for JsonPaymentStore {
    async fn verify(
        &self,
        card: &CardDetails,
        amount: Decimal,
    ) -> Result<CardCheck, PaymentStoreError> {
        let _guard = self.lock.lock().await;
        let data = self.read().await?;
        Ok(check(&data, card, amount).0)
    }

    async fn try_debit(
        &self,
        card: &CardDetails,
        amount: Decimal,
    ) -> Result<CardCheck, PaymentStoreError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;

        let (outcome, idx) = check(&data, card, amount);
        if let (CardCheck::Approved, Some(idx)) = (outcome, idx) {
            data.card_details[idx].amount_balance -= amount;
            self.write(&data).await?;
            debug!(card = %card.masked(), %amount, "Card debited");
        }

        Ok(outcome)
    }

    async fn credit(&self, card: &CardDetails, amount: Decimal) -> Result<bool, PaymentStoreError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;

        let Some(account) = data.card_details.iter_mut().find(|c| c.matches(card)) else {
            warn!(card = %card.masked(), "Credit skipped, card not found");
            return Ok(false);
        };
        account.amount_balance += amount;
        self.write(&data).await?;
        debug!(card = %card.masked(), %amount, "Card credited");

        Ok(true)
    }
}

#[async_trait]
impl CouponSource for JsonPaymentStore {
    async fn find_coupon(&self, code: &str) -> Result<Option<Coupon>, PaymentStoreError> {
        let _guard = self.lock.lock().await;
        let data = self.read().await?;
        let code = code.trim();

        Ok(data
            .coupons
            .into_iter()
            .find(|c| c.code.trim().eq_ignore_ascii_case(code)))
    }
}
