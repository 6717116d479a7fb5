use async_trait::async_trait;
use uuid::Uuid;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use chrono::{DateTime, Utc};
use delite_catalog::{Experience, SlotKey};
use delite_promo::PromoCode;
use delite_shared::Masked;
use delite_core::{
    Booking, BookingRepository, BookingTransaction, BookingUnitOfWork, InsertError, StoreError,
};
use crate::database::db_error;
use crate::{catalog_repo, promo_repo};

const REFERENCE_CONSTRAINT: &str = "bookings_reference_id_key";

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    experience_id: Uuid,
    experience_title: String,
    customer_name: String,
    customer_email: String,
    selected_date: String,
    selected_time: String,
    quantity: i32,
    base_price: i64,
    subtotal: i64,
    taxes: i64,
    discount: i64,
    promo_code: Option<String>,
    total: i64,
    status: String,
    reference_id: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |e: delite_core::CoreError| StoreError::Corrupt(format!("booking {}: {}", row.reference_id, e));

        Ok(Booking {
            id: row.id,
            experience_id: row.experience_id,
            experience_title: row.experience_title,
            customer_name: row.customer_name,
            customer_email: Masked(row.customer_email),
            selected_date: row.selected_date,
            selected_time: row.selected_time,
            quantity: u32::try_from(row.quantity)
                .map_err(|_| StoreError::Corrupt(format!("booking {}: negative quantity", row.reference_id)))?,
            base_price: row.base_price,
            subtotal: row.subtotal,
            taxes: row.taxes,
            discount: row.discount,
            promo_code: row.promo_code,
            total: row.total,
            status: row.status.parse().map_err(corrupt)?,
            payment_status: row.payment_status.parse().map_err(corrupt)?,
            reference_id: row.reference_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert inside a savepoint so a reference collision leaves the enclosing
/// transaction usable for the retry.
pub(crate) async fn insert_booking(conn: &mut PgConnection, booking: &Booking) -> Result<(), InsertError> {
    sqlx::query("SAVEPOINT booking_insert")
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    let quantity = i32::try_from(booking.quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {} out of range", booking.quantity)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO bookings (id, experience_id, experience_title, customer_name, customer_email,
                              selected_date, selected_time, quantity, base_price, subtotal, taxes,
                              discount, promo_code, total, status, reference_id, payment_status,
                              created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
    )
    .bind(booking.id)
    .bind(booking.experience_id)
    .bind(&booking.experience_title)
    .bind(&booking.customer_name)
    .bind(booking.customer_email.expose())
    .bind(&booking.selected_date)
    .bind(&booking.selected_time)
    .bind(quantity)
    .bind(booking.base_price)
    .bind(booking.subtotal)
    .bind(booking.taxes)
    .bind(booking.discount)
    .bind(&booking.promo_code)
    .bind(booking.total)
    .bind(booking.status.as_str())
    .bind(&booking.reference_id)
    .bind(booking.payment_status.as_str())
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => {
            sqlx::query("RELEASE SAVEPOINT booking_insert")
                .execute(&mut *conn)
                .await
                .map_err(db_error)?;
            Ok(())
        }
        Err(e) => {
            sqlx::query("ROLLBACK TO SAVEPOINT booking_insert")
                .execute(&mut *conn)
                .await
                .map_err(db_error)?;

            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() && db_err.constraint() == Some(REFERENCE_CONSTRAINT) {
                    return Err(InsertError::DuplicateReference(booking.reference_id.clone()));
                }
            }
            Err(InsertError::Store(db_error(e)))
        }
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn find_by_reference(&self, reference_id: &str) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
            SELECT id, experience_id, experience_title, customer_name, customer_email, selected_date,
                   selected_time, quantity, base_price, subtotal, taxes, discount, promo_code, total,
                   status, reference_id, payment_status, created_at, updated_at
            FROM bookings WHERE reference_id = $1
            "#,
        )
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Booking::try_from).transpose()
    }
}

/// Opens one database transaction per booking
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingUnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn BookingTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgBookingTransaction { tx }))
    }
}

/// Dropping without commit rolls the database transaction back.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTransaction for PgBookingTransaction {
    async fn find_experience(&mut self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        catalog_repo::load_experience(&mut self.tx, id).await
    }

    async fn decrement_slot(&mut self, key: &SlotKey, quantity: u32) -> Result<bool, StoreError> {
        catalog_repo::decrement_slot(&mut self.tx, key, quantity).await
    }

    async fn find_promo(&mut self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        promo_repo::find_promo(&mut self.tx, code).await
    }

    async fn record_promo_usage(&mut self, code: &str) -> Result<bool, StoreError> {
        promo_repo::record_usage(&mut self.tx, code).await
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), InsertError> {
        insert_booking(&mut self.tx, booking).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(db_error)
    }
}
