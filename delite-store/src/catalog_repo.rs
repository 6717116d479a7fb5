use async_trait::async_trait;
use uuid::Uuid;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use delite_catalog::{DateAvailability, Experience, ExperienceQuery, SlotKey, TimeSlot};
use delite_core::repository::{ExperienceRepository, StoreError};
use crate::database::db_error;

pub struct StoreExperienceRepository {
    pool: PgPool,
}

impl StoreExperienceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ExperienceRow {
    id: Uuid,
    title: String,
    location: String,
    description: String,
    price: i64,
    image: String,
    images: Vec<String>,
    about: String,
    minimum_age: i32,
    duration: String,
    includes: Vec<String>,
    requirements: Vec<String>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    experience_id: Uuid,
    slot_date: String,
    slot_time: String,
    available_slots: i32,
    max_slots: i32,
}

const EXPERIENCE_COLUMNS: &str = "id, title, location, description, price, image, images, about, \
     minimum_age, duration, includes, requirements, is_active, created_at";

impl ExperienceRow {
    fn into_experience(self, available_dates: Vec<DateAvailability>) -> Experience {
        Experience {
            id: self.id,
            title: self.title,
            location: self.location,
            description: self.description,
            price: self.price,
            image: self.image,
            images: self.images,
            available_dates,
            about: self.about,
            minimum_age: self.minimum_age,
            duration: self.duration,
            includes: self.includes,
            requirements: self.requirements,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// Rebuild the nested date -> slots shape from rows ordered by position
fn group_slots(rows: impl IntoIterator<Item = SlotRow>) -> Vec<DateAvailability> {
    let mut dates: Vec<DateAvailability> = Vec::new();

    for row in rows {
        let slot = TimeSlot {
            time: row.slot_time,
            available_slots: row.available_slots,
            max_slots: row.max_slots,
        };
        let existing = dates.iter().position(|d| d.date == row.slot_date);
        match existing {
            Some(index) => dates[index].time_slots.push(slot),
            None => dates.push(DateAvailability {
                date: row.slot_date,
                time_slots: vec![slot],
            }),
        }
    }

    dates
}

pub(crate) async fn load_experience(conn: &mut PgConnection, id: Uuid) -> Result<Option<Experience>, StoreError> {
    let row: Option<ExperienceRow> =
        sqlx::query_as(&format!("SELECT {} FROM experiences WHERE id = $1", EXPERIENCE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let slots: Vec<SlotRow> = sqlx::query_as(
        "SELECT experience_id, slot_date, slot_time, available_slots, max_slots \
         FROM experience_time_slots WHERE experience_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(Some(row.into_experience(group_slots(slots))))
}

/// Conditional decrement: applied iff exactly one slot row had enough capacity
pub(crate) async fn decrement_slot(conn: &mut PgConnection, key: &SlotKey, quantity: u32) -> Result<bool, StoreError> {
    let Ok(quantity) = i32::try_from(quantity) else {
        return Ok(false);
    };

    let result = sqlx::query(
        r#"
        UPDATE experience_time_slots
        SET available_slots = available_slots - $4
        WHERE experience_id = $1 AND slot_date = $2 AND slot_time = $3 AND available_slots >= $4
        "#,
    )
    .bind(key.experience_id)
    .bind(&key.date)
    .bind(&key.time)
    .bind(quantity)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn insert_experience(conn: &mut PgConnection, experience: &Experience) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO experiences (id, title, location, description, price, image, images, about,
                                 minimum_age, duration, includes, requirements, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(experience.id)
    .bind(&experience.title)
    .bind(&experience.location)
    .bind(&experience.description)
    .bind(experience.price)
    .bind(&experience.image)
    .bind(&experience.images)
    .bind(&experience.about)
    .bind(experience.minimum_age)
    .bind(&experience.duration)
    .bind(&experience.includes)
    .bind(&experience.requirements)
    .bind(experience.is_active)
    .bind(experience.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    for (position, (key, slot)) in experience.slot_entries().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO experience_time_slots (experience_id, slot_date, slot_time, position, available_slots, max_slots)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(key.experience_id)
        .bind(&key.date)
        .bind(&key.time)
        .bind(position as i32)
        .bind(slot.available_slots)
        .bind(slot.max_slots)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }

    Ok(())
}

#[async_trait]
impl ExperienceRepository for StoreExperienceRepository {
    async fn find_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        load_experience(&mut conn, id).await
    }

    async fn list_experiences(&self, query: &ExperienceQuery) -> Result<Vec<Experience>, StoreError> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        let location = query
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows: Vec<ExperienceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM experiences
            WHERE is_active
              AND ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1 OR location ILIKE $1)
              AND ($2::TEXT IS NULL OR location ILIKE $2)
            ORDER BY created_at DESC
            "#,
            EXPERIENCE_COLUMNS
        ))
        .bind(search)
        .bind(location)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let slot_rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT experience_id, slot_date, slot_time, available_slots, max_slots \
             FROM experience_time_slots WHERE experience_id = ANY($1) ORDER BY experience_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut slots_by_experience: HashMap<Uuid, Vec<SlotRow>> = HashMap::new();
        for row in slot_rows {
            slots_by_experience.entry(row.experience_id).or_default().push(row);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let slots = slots_by_experience.remove(&row.id).unwrap_or_default();
                row.into_experience(group_slots(slots))
            })
            .collect())
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
