#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::sync::Notify;

use eventmaster_server::config::Config;
use eventmaster_server::models::{
    Booking, CardDetails, NewBooking, NewPayment, Occurrence, OccurrenceStatus, Payment, SeatSet,
};
use eventmaster_server::services::{Clock, FixedClock};
use eventmaster_server::state::AppState;
use eventmaster_server::store::memory::MemoryTx;
use eventmaster_server::store::{
    BookingStore, JsonPaymentStore, MemoryStore, StoreError, StoreTx,
};

pub const CUSTOMER: i64 = 7;
pub const OTHER_CUSTOMER: i64 = 8;
pub const EVENT: i64 = 100;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub struct Harness {
    pub store: MemoryStore,
    pub payment_store: Arc<JsonPaymentStore>,
    pub clock: Arc<FixedClock>,
    pub state: AppState<MemoryStore>,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payment.json");
        std::fs::copy(
            concat!(env!("CARGO_MANIFEST_DIR"), "/data/payment.json"),
            &path,
        )
        .unwrap();

        let store = MemoryStore::new();
        let payment_store = Arc::new(JsonPaymentStore::new(path));
        let clock = Arc::new(FixedClock::new(now()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::clone(&payment_store),
            dyn_clock,
            &config,
        );

        Self {
            store,
            payment_store,
            clock,
            state,
            _dir: dir,
        }
    }

    pub fn add(&self, occurrence: Occurrence) -> Occurrence {
        self.store.insert_occurrence(occurrence.clone());
        occurrence
    }

    pub async fn occurrence(&self, id: i64) -> Occurrence {
        self.store.find_occurrence(id).await.unwrap().unwrap()
    }

    pub async fn balance(&self, card_number: &str) -> Decimal {
        self.payment_store
            .snapshot()
            .await
            .unwrap()
            .card_details
            .into_iter()
            .find(|c| c.card_number == card_number)
            .unwrap()
            .amount_balance
    }

    /// `remaining_capacity + Σ quantity of live bookings`.
    pub async fn accounted_capacity(&self, occurrence_id: i64) -> i32 {
        let held: i32 = self
            .store
            .bookings_for_occurrence(occurrence_id)
            .await
            .unwrap()
            .iter()
            .filter(|b| !b.is_cancelled())
            .map(|b| b.quantity)
            .sum();
        self.occurrence(occurrence_id).await.remaining_capacity + held
    }

    /// No two live bookings on the occurrence share a seat.
    pub async fn live_seats_are_disjoint(&self, occurrence_id: i64) -> bool {
        let live: Vec<SeatSet> = self
            .store
            .bookings_for_occurrence(occurrence_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| !b.is_cancelled())
            .map(|b| b.seats_occupied)
            .collect();
        live.iter()
            .enumerate()
            .all(|(i, a)| live[i + 1..].iter().all(|b| a.is_disjoint(b)))
    }

    /// Services over `store`, sharing this harness's payment store and clock.
    pub fn state_over<S: BookingStore>(&self, store: S) -> AppState<S> {
        let clock: Arc<dyn Clock> = self.clock.clone();
        AppState::new(
            Arc::new(store),
            Arc::clone(&self.payment_store),
            clock,
            &Config::default(),
        )
    }
}

/// What [`FaultyStore`] does once a payment is being recorded.
#[derive(Debug, Clone)]
pub enum Fault {
    FailPaymentInsert,
    FailCommit,
    /// Signals `entered` when the commit starts, then waits `delay`.
    StallCommit {
        entered: Arc<Notify>,
        delay: std::time::Duration,
    },
}

/// A [`MemoryStore`] whose transactions misbehave at settlement time.
#[derive(Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore, fault: Fault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl BookingStore for FaultyStore {
    type Tx = FaultyTx;

    async fn lock_occurrence(
        &self,
        occurrence_id: i64,
        timeout: std::time::Duration,
    ) -> Result<Option<(FaultyTx, Occurrence)>, StoreError> {
        let locked = self.inner.lock_occurrence(occurrence_id, timeout).await?;
        Ok(locked.map(|(inner, occurrence)| {
            (
                FaultyTx {
                    inner,
                    fault: self.fault.clone(),
                },
                occurrence,
            )
        }))
    }

    async fn find_occurrence(&self, occurrence_id: i64) -> Result<Option<Occurrence>, StoreError> {
        self.inner.find_occurrence(occurrence_id).await
    }

    async fn scheduled_occurrences_after(
        &self,
        event_id: i64,
        after: NaiveDate,
    ) -> Result<Vec<i64>, StoreError> {
        self.inner.scheduled_occurrences_after(event_id, after).await
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        self.inner.find_booking(booking_id).await
    }

    async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_for_customer(customer_id).await
    }

    async fn bookings_for_occurrence(&self, occurrence_id: i64) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_for_occurrence(occurrence_id).await
    }

    async fn payments_for_booking(&self, booking_id: i64) -> Result<Vec<Payment>, StoreError> {
        self.inner.payments_for_booking(booking_id).await
    }
}

pub struct FaultyTx {
    inner: MemoryTx,
    fault: Fault,
}

#[async_trait]
impl StoreTx for FaultyTx {
    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StoreError> {
        self.inner.save_occurrence(occurrence).await
    }

    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        self.inner.lock_booking(booking_id).await
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, StoreError> {
        self.inner.insert_booking(booking).await
    }

    async fn assign_ticket_number(
        &mut self,
        booking_id: i64,
        ticket_number: &str,
    ) -> Result<(), StoreError> {
        self.inner.assign_ticket_number(booking_id, ticket_number).await
    }

    async fn mark_booking_cancelled(
        &mut self,
        booking_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.mark_booking_cancelled(booking_id, at).await
    }

    async fn last_successful_payment(
        &mut self,
        booking_id: i64,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.last_successful_payment(booking_id).await
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError> {
        if let Fault::FailPaymentInsert = self.fault {
            return Err(StoreError::Corrupt("payments table unavailable".to_string()));
        }
        self.inner.insert_payment(payment).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        match self.fault {
            Fault::FailCommit => Err(StoreError::Corrupt("connection reset".to_string())),
            Fault::StallCommit { entered, delay } => {
                entered.notify_one();
                tokio::time::sleep(delay).await;
                self.inner.commit().await
            }
            Fault::FailPaymentInsert => self.inner.commit().await,
        }
    }
}

/// Unseated, priced at 25.00, one month after [`now`].
pub fn occurrence(id: i64, capacity: i32) -> Occurrence {
    Occurrence {
        id,
        event_id: EVENT,
        venue_id: 1,
        date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        price: money(2500),
        remaining_capacity: capacity,
        seats_occupied: SeatSet::new(),
        status: OccurrenceStatus::Scheduled,
        seated: false,
    }
}

pub fn seated(id: i64, capacity: i32, occupied: &[&str]) -> Occurrence {
    Occurrence {
        seated: true,
        seats_occupied: occupied.iter().collect(),
        ..occurrence(id, capacity)
    }
}

pub fn starting_in(id: i64, capacity: i32, hours: i64) -> Occurrence {
    let start = (now() + Duration::hours(hours)).naive_utc();
    Occurrence {
        date: start.date(),
        time: start.time(),
        ..occurrence(id, capacity)
    }
}

pub fn jane_card() -> CardDetails {
    CardDetails {
        name_on_card: "jane doe".to_string(),
        card_number: "41111111111111".to_string(),
        exp: "08/29".to_string(),
        cvv: "123".to_string(),
        postal_code: "m5v2t6".to_string(),
    }
}

pub fn sam_card() -> CardDetails {
    CardDetails {
        name_on_card: "Sam Lee".to_string(),
        card_number: "55555555554444".to_string(),
        exp: "11/28".to_string(),
        cvv: "456".to_string(),
        postal_code: "V6B 1A1".to_string(),
    }
}
