use async_trait::async_trait;
use uuid::Uuid;
use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use delite_promo::{normalize_code, DiscountType, PromoCode};
use delite_core::repository::{PromoRepository, StoreError};
use crate::database::db_error;

pub struct StorePromoRepository {
    pool: PgPool,
}

impl StorePromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PromoRow {
    id: Uuid,
    code: String,
    description: String,
    discount_type: String,
    discount_value: f64,
    min_order_value: i64,
    max_discount: Option<i64>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    usage_limit: Option<i64>,
    used_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

const PROMO_COLUMNS: &str = "id, code, description, discount_type, discount_value, min_order_value, \
     max_discount, valid_from, valid_until, usage_limit, used_count, is_active, created_at";

impl TryFrom<PromoRow> for PromoCode {
    type Error = StoreError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        let discount_type = DiscountType::parse(&row.discount_type).ok_or_else(|| {
            StoreError::Corrupt(format!("promo {} has discount type '{}'", row.code, row.discount_type))
        })?;

        Ok(PromoCode {
            id: row.id,
            code: row.code,
            description: row.description,
            discount_type,
            discount_value: row.discount_value,
            min_order_value: row.min_order_value,
            max_discount: row.max_discount,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

pub(crate) async fn find_promo(conn: &mut PgConnection, code: &str) -> Result<Option<PromoCode>, StoreError> {
    let row: Option<PromoRow> =
        sqlx::query_as(&format!("SELECT {} FROM promo_codes WHERE code = $1", PROMO_COLUMNS))
            .bind(normalize_code(code))
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error)?;

    row.map(PromoCode::try_from).transpose()
}

/// Count one use unless the limit is already reached
pub(crate) async fn record_usage(conn: &mut PgConnection, code: &str) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE promo_codes
        SET used_count = used_count + 1
        WHERE code = $1 AND (usage_limit IS NULL OR used_count < usage_limit)
        "#,
    )
    .bind(normalize_code(code))
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_promo(conn: &mut PgConnection, promo: &PromoCode) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO promo_codes (id, code, description, discount_type, discount_value, min_order_value,
                                 max_discount, valid_from, valid_until, usage_limit, used_count, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(promo.id)
    .bind(normalize_code(&promo.code))
    .bind(&promo.description)
    .bind(promo.discount_type.as_str())
    .bind(promo.discount_value)
    .bind(promo.min_order_value)
    .bind(promo.max_discount)
    .bind(promo.valid_from)
    .bind(promo.valid_until)
    .bind(promo.usage_limit)
    .bind(promo.used_count)
    .bind(promo.is_active)
    .bind(promo.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(())
}

#[async_trait]
impl PromoRepository for StorePromoRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        find_promo(&mut conn, code).await
    }

    async fn list_active(&self) -> Result<Vec<PromoCode>, StoreError> {
        let rows: Vec<PromoRow> = sqlx::query_as(&format!(
            "SELECT {} FROM promo_codes WHERE is_active ORDER BY created_at DESC",
            PROMO_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(PromoCode::try_from).collect()
    }
}
