use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};

use crate::models::booking::PENDING_TICKET_NUMBER;
use crate::models::seats;
use crate::models::{Booking, NewBooking, NewPayment, Occurrence, Payment, PaymentStatus};
use crate::store::{BookingStore, StoreError, StoreTx};

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

const OCCURRENCE_COLUMNS: &str = r#"
    o.occurrence_id, o.event_id, o.venue_id, o.date, o.time, o.price,
    o.remaining_capacity, o.seats_occupied, o.status, v.seating
"#;

const BOOKING_COLUMNS: &str = r#"
    booking_id, occurrence_id, customer_id, quantity, seats_occupied, status,
    total_amount, ticket_number, created_at, updated_at
"#;

const PAYMENT_COLUMNS: &str = "payment_id, booking_id, amount, card, status, details, created_at";

#[derive(Debug, FromRow)]
struct OccurrenceRow {
    occurrence_id: i64,
    event_id: i64,
    venue_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    price: Decimal,
    remaining_capacity: i32,
    seats_occupied: Option<String>,
    status: String,
    seating: bool,
}

impl TryFrom<OccurrenceRow> for Occurrence {
    type Error = StoreError;

    fn try_from(row: OccurrenceRow) -> Result<Self, Self::Error> {
        Ok(Occurrence {
            id: row.occurrence_id,
            event_id: row.event_id,
            venue_id: row.venue_id,
            date: row.date,
            time: row.time,
            price: row.price,
            remaining_capacity: row.remaining_capacity,
            seats_occupied: seats::parse(row.seats_occupied.as_deref()),
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            seated: row.seating,
        })
    }
}

#[derive(Debug, FromRow)]
struct BookingRow {
    booking_id: i64,
    occurrence_id: i64,
    customer_id: i64,
    quantity: i32,
    seats_occupied: Option<String>,
    status: String,
    total_amount: Decimal,
    ticket_number: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.booking_id,
            occurrence_id: row.occurrence_id,
            customer_id: row.customer_id,
            quantity: row.quantity,
            seats_occupied: seats::parse(row.seats_occupied.as_deref()),
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            total_amount: row.total_amount,
            ticket_number: row.ticket_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: i64,
    booking_id: i64,
    amount: Decimal,
    card: Option<String>,
    status: String,
    details: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.payment_id,
            booking_id: row.booking_id,
            amount: row.amount,
            card: row.card,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn lock_error(err: sqlx::Error, occurrence_id: i64) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return StoreError::LockTimeout(occurrence_id);
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

#[async_trait]
impl BookingStore for PgStore {
    type Tx = PgTx;

    async fn lock_occurrence(
        &self,
        occurrence_id: i64,
        timeout: Duration,
    ) -> Result<Option<(PgTx, Occurrence)>, StoreError> {
        // Postgres defaults to READ COMMITTED; the row lock below is what
        // serializes bookings on the same occurrence.
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, OccurrenceRow>(&format!(
            "SELECT {} FROM event_occurrences o \
             JOIN venues v ON v.venue_id = o.venue_id \
             WHERE o.occurrence_id = $1 \
             FOR UPDATE OF o",
            OCCURRENCE_COLUMNS
        ))
        .bind(occurrence_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| lock_error(e, occurrence_id))?;

        match row {
            Some(row) => Ok(Some((PgTx { tx }, Occurrence::try_from(row)?))),
            None => Ok(None),
        }
    }

    async fn find_occurrence(&self, occurrence_id: i64) -> Result<Option<Occurrence>, StoreError> {
        let row = sqlx::query_as::<_, OccurrenceRow>(&format!(
            "SELECT {} FROM event_occurrences o \
             JOIN venues v ON v.venue_id = o.venue_id \
             WHERE o.occurrence_id = $1",
            OCCURRENCE_COLUMNS
        ))
        .bind(occurrence_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Occurrence::try_from).transpose()
    }

    async fn scheduled_occurrences_after(
        &self,
        event_id: i64,
        after: NaiveDate,
    ) -> Result<Vec<i64>, StoreError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT occurrence_id FROM event_occurrences
            WHERE event_id = $1 AND status = 'Scheduled' AND date > $2
            ORDER BY occurrence_id
            "#,
        )
        .bind(event_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn bookings_for_customer(&self, customer_id: i64) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE customer_id = $1 \
             ORDER BY created_at DESC, booking_id DESC",
            BOOKING_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn bookings_for_occurrence(&self, occurrence_id: i64) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE occurrence_id = $1 ORDER BY booking_id",
            BOOKING_COLUMNS
        ))
        .bind(occurrence_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn payments_for_booking(&self, booking_id: i64) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE booking_id = $1 \
             ORDER BY created_at DESC, payment_id DESC",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

/// Open Postgres transaction holding the occurrence row lock.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn save_occurrence(&mut self, occurrence: &Occurrence) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE event_occurrences
            SET remaining_capacity = $2,
                seats_occupied = $3,
                status = $4,
                updated_at = NOW()
            WHERE occurrence_id = $1
            "#,
        )
        .bind(occurrence.id)
        .bind(occurrence.remaining_capacity)
        .bind(seats::serialize(&occurrence.seats_occupied))
        .bind(occurrence.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn lock_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings \
             (occurrence_id, customer_id, quantity, seats_occupied, status, \
              total_amount, ticket_number, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'Confirmed', $5, $6, $7, $7) \
             RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(booking.occurrence_id)
        .bind(booking.customer_id)
        .bind(booking.quantity)
        .bind(seats::serialize(&booking.seats_occupied))
        .bind(booking.total_amount)
        .bind(PENDING_TICKET_NUMBER)
        .bind(booking.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Booking::try_from(row)
    }

    async fn assign_ticket_number(
        &mut self,
        booking_id: i64,
        ticket_number: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET ticket_number = $2 WHERE booking_id = $1")
            .bind(booking_id)
            .bind(ticket_number)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn mark_booking_cancelled(
        &mut self,
        booking_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bookings SET status = 'Cancelled', updated_at = $2 WHERE booking_id = $1",
        )
        .bind(booking_id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn last_successful_payment(
        &mut self,
        booking_id: i64,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE booking_id = $1 AND status = $2 \
             ORDER BY created_at DESC, payment_id DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id)
        .bind(PaymentStatus::Success.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO payments (booking_id, amount, card, status, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(payment.card)
        .bind(payment.status.as_str())
        .bind(payment.details)
        .bind(payment.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Payment::try_from(row)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
