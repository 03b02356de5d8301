use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::seats;
use crate::models::{
    Booking, CardDetails, NewPayment, Occurrence, Payment, PaymentStatus, SeatSet,
};
use crate::services::bookings::create_in;
use crate::services::clock::Clock;
use crate::services::coordinator::{OccurrenceLock, TransactionCoordinator};
use crate::services::coupons::{CouponEvaluator, CouponQuote};
use crate::services::error::{BookingError, CouponError};
use crate::store::{BookingStore, CardCheck, CardLedger, StoreTx};

pub const MAX_TICKETS_PER_PURCHASE: i32 = 10;

#[derive(Debug, Clone)]
pub struct FinalizeBooking {
    pub occurrence_id: i64,
    pub quantity: i32,
    pub seats: Vec<String>,
    pub card: CardDetails,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FinalizedBooking {
    pub booking: Booking,
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub is_valid: bool,
    pub message: String,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_expiry(value: &str) -> bool {
    let Some((month, year)) = value.split_once('/') else {
        return false;
    };
    if !is_digits(month, 2) || !is_digits(year, 2) {
        return false;
    }
    matches!(month.parse::<u8>(), Ok(1..=12))
}

/// Shape checks on the purchase request. No store is consulted.
pub fn validate_finalize_input(request: &FinalizeBooking) -> Result<(), BookingError> {
    if request.occurrence_id <= 0 {
        return Err(BookingError::invalid("OccurrenceId is required."));
    }
    if !(1..=MAX_TICKETS_PER_PURCHASE).contains(&request.quantity) {
        return Err(BookingError::invalid(format!(
            "Quantity must be between 1 and {}.",
            MAX_TICKETS_PER_PURCHASE
        )));
    }

    let card = &request.card;
    if card.name_on_card.trim().is_empty() {
        return Err(BookingError::invalid("Name on card is required."));
    }
    if !is_digits(card.card_number.trim(), 14) {
        return Err(BookingError::invalid("Card number must be 14 digits."));
    }
    if !is_expiry(card.exp.trim()) {
        return Err(BookingError::invalid("Expiry must be in MM/YY format."));
    }
    if !is_digits(card.cvv.trim(), 3) {
        return Err(BookingError::invalid("CVV must be 3 digits."));
    }
    if card.postal_code.trim().is_empty() {
        return Err(BookingError::invalid("Postal code is required."));
    }
    Ok(())
}

fn coupon_code(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|code| !code.is_empty())
}

/// Debits the card, records the payment and commits.
///
/// Runs on its own task, so a dropped request cannot stop between the debit
/// and either the commit or the credit that reverses it.
async fn settle<T: StoreTx + 'static>(
    cards: Arc<dyn CardLedger>,
    mut lock: OccurrenceLock<T>,
    card: CardDetails,
    payment: NewPayment,
) -> Result<(Payment, Occurrence), BookingError> {
    let amount = payment.amount;

    // The balance may have moved since `verify`; the debit re-checks it.
    match cards.try_debit(&card, amount).await? {
        CardCheck::Approved => {}
        CardCheck::NoMatch => return Err(BookingError::CardNotFound),
        CardCheck::InsufficientBalance => return Err(BookingError::InsufficientBalance),
    }

    let payment = match lock.tx().insert_payment(payment).await {
        Ok(payment) => payment,
        Err(err) => {
            drop(lock);
            compensate(cards.as_ref(), &card, amount).await;
            return Err(err.into());
        }
    };
    match lock.commit().await {
        Ok(occurrence) => Ok((payment, occurrence)),
        Err(err) => {
            compensate(cards.as_ref(), &card, amount).await;
            Err(err)
        }
    }
}

async fn compensate(cards: &dyn CardLedger, card: &CardDetails, amount: Decimal) {
    match cards.credit(card, amount).await {
        Ok(true) => warn!(card = %card.masked(), %amount, "Debit reversed after failed commit"),
        Ok(false) => error!(
            card = %card.masked(),
            %amount,
            "Debit could not be reversed, card no longer in store"
        ),
        Err(err) => error!(
            card = %card.masked(),
            %amount,
            error = %err,
            "Debit could not be reversed"
        ),
    }
}

/// Charges the mock card and records booking and payment together.
pub struct PaymentService<S> {
    coordinator: TransactionCoordinator<S>,
    cards: Arc<dyn CardLedger>,
    coupons: CouponEvaluator,
    clock: Arc<dyn Clock>,
}

impl<S: BookingStore> PaymentService<S> {
    pub fn new(
        coordinator: TransactionCoordinator<S>,
        cards: Arc<dyn CardLedger>,
        coupons: CouponEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coordinator,
            cards,
            coupons,
            clock,
        }
    }

    /// `price × quantity`, reduced by the coupon when one is given.
    pub async fn quote(
        &self,
        price: Decimal,
        quantity: i32,
        coupon_code: Option<&str>,
    ) -> Result<CouponQuote, BookingError> {
        let amount = price * Decimal::from(quantity);
        match coupon_code {
            Some(code) => Ok(self.coupons.apply(code, amount).await?),
            None => Ok(CouponQuote {
                original_amount: amount,
                discount: Decimal::ZERO,
                final_amount: amount,
            }),
        }
    }

    /// Reports whether a coupon applies to `amount`. Rejections are part of
    /// the answer, not an error.
    pub async fn validate_coupon(
        &self,
        code: &str,
        amount: Decimal,
    ) -> Result<CouponValidation, BookingError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(BookingError::invalid("Coupon code is required."));
        }
        if amount < Decimal::ZERO {
            return Err(BookingError::invalid("Amount must not be negative."));
        }

        match self.coupons.apply(code, amount).await {
            Ok(quote) => Ok(CouponValidation {
                is_valid: true,
                message: "Coupon applied.".to_string(),
                original_amount: quote.original_amount,
                discount_amount: quote.discount,
                final_amount: quote.final_amount,
            }),
            Err(CouponError::Store(err)) => Err(err.into()),
            Err(rejected) => Ok(CouponValidation {
                is_valid: false,
                message: rejected.to_string(),
                original_amount: amount,
                discount_amount: Decimal::ZERO,
                final_amount: amount,
            }),
        }
    }

    /// Validates, quotes, charges and books in one unit.
    ///
    /// The card is debited only after capacity and seats are reserved inside
    /// the occurrence lock, and the booking and payment rows only become
    /// visible on commit. From the debit on, settlement runs to completion even
    /// if this future is dropped; if the commit fails the amount is credited
    /// back.
    pub async fn finalize_booking(
        &self,
        customer_id: i64,
        request: FinalizeBooking,
    ) -> Result<FinalizedBooking, BookingError> {
        validate_finalize_input(&request)?;
        let code = coupon_code(request.coupon_code.as_deref());
        let requested: SeatSet = seats::normalize(&request.seats).into_iter().collect();

        let occurrence = self
            .coordinator
            .store()
            .find_occurrence(request.occurrence_id)
            .await?
            .ok_or(BookingError::NotFound("Event occurrence"))?;
        let mut quote = self.quote(occurrence.price, request.quantity, code).await?;

        let mut lock = self.coordinator.lock_occurrence(request.occurrence_id).await?;
        lock.ensure_bookable(request.quantity)?;
        if lock.occurrence().price != occurrence.price {
            quote = self
                .quote(lock.occurrence().price, request.quantity, code)
                .await?;
        }
        let amount = quote.final_amount;

        match self.cards.verify(&request.card, amount).await? {
            CardCheck::Approved => {}
            CardCheck::NoMatch => return Err(BookingError::CardNotFound),
            CardCheck::InsufficientBalance => return Err(BookingError::InsufficientBalance),
        }

        let now = self.clock.now();
        let booking = create_in(
            &mut lock,
            customer_id,
            request.quantity,
            &requested,
            amount,
            now,
        )
        .await?;

        let settlement = tokio::spawn(settle(
            Arc::clone(&self.cards),
            lock,
            request.card.clone(),
            NewPayment {
                booking_id: booking.id,
                amount,
                card: Some(request.card.masked()),
                status: PaymentStatus::Success,
                details: Some("Approved".to_string()),
                created_at: now,
            },
        ));
        let (payment, occurrence) = settlement.await??;

        info!(
            booking_id = booking.id,
            payment_id = payment.id,
            occurrence_id = occurrence.id,
            customer_id,
            quantity = booking.quantity,
            original = %quote.original_amount,
            discount = %quote.discount,
            amount = %amount,
            card = %request.card.masked(),
            remaining_capacity = occurrence.remaining_capacity,
            "Booking finalized"
        );
        Ok(FinalizedBooking { booking, payment })
    }

    /// Most recent payment row for one of the customer's bookings.
    pub async fn latest_payment(
        &self,
        customer_id: i64,
        booking_id: i64,
    ) -> Result<Payment, BookingError> {
        let store = self.coordinator.store();
        let booking = store
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound("Booking"))?;
        if booking.customer_id != customer_id {
            return Err(BookingError::Forbidden("booking"));
        }

        store
            .payments_for_booking(booking_id)
            .await?
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound("Payment"))
    }
}
