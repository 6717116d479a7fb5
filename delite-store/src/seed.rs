use serde::Deserialize;
use std::path::Path;
use tracing::info;
use delite_catalog::Experience;
use delite_promo::PromoCode;
use delite_core::StoreError;
use crate::catalog_repo::insert_experience;
use crate::database::{db_error, DbClient};
use crate::memory::MemoryStore;
use crate::promo_repo::insert_promo;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Seed rejected: {0}")]
    Store(#[from] StoreError),
}

/// Catalog and promo codes loaded into an empty store at startup.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedData {
    pub experiences: Vec<Experience>,
    pub promo_codes: Vec<PromoCode>,
}

impl SeedData {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub fn seed_memory(store: &MemoryStore, seed: SeedData) -> Result<(), SeedError> {
    let experiences = seed.experiences.len();
    let promos = seed.promo_codes.len();

    for experience in seed.experiences {
        store.add_experience(experience)?;
    }
    for promo in seed.promo_codes {
        store.add_promo(promo)?;
    }

    info!(
        "Seeded {} experiences and {} promo codes ({} currently valid)",
        experiences,
        promos,
        store.valid_promo_count()?
    );
    Ok(())
}

/// Seeds only a fresh database; an existing catalog is left untouched.
pub async fn seed_postgres(db: &DbClient, seed: SeedData) -> Result<bool, SeedError> {
    let mut tx = db.pool.begin().await.map_err(db_error)?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM experiences")
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
    if existing > 0 {
        info!("Catalog already holds {} experiences, skipping seed", existing);
        return Ok(false);
    }

    for experience in &seed.experiences {
        experience
            .validate()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        insert_experience(&mut tx, experience).await?;
    }
    for promo in &seed.promo_codes {
        insert_promo(&mut tx, promo).await?;
    }

    tx.commit().await.map_err(db_error)?;
    info!(
        "Seeded {} experiences and {} promo codes",
        seed.experiences.len(),
        seed.promo_codes.len()
    );
    Ok(true)
}
