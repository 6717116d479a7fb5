pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod promo_repo;
pub mod redis_repo;
pub mod seed;

use std::sync::Arc;
use tracing::{info, warn};
use delite_core::{BookingRepository, BookingUnitOfWork, ExperienceRepository, PromoRepository, StoreError};

pub use app_config::{Config, StorageBackend, StorageConfig};
pub use booking_repo::{PgUnitOfWork, StoreBookingRepository};
pub use catalog_repo::StoreExperienceRepository;
pub use database::DbClient;
pub use events::LogEventPublisher;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::MemoryStore;
pub use promo_repo::StorePromoRepository;
pub use redis_repo::RedisClient;
pub use seed::{SeedData, SeedError};

/// Repositories handed to the API layer, all backed by the same store.
#[derive(Clone)]
pub struct Storage {
    pub experiences: Arc<dyn ExperienceRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub unit_of_work: Arc<dyn BookingUnitOfWork>,
}

impl Storage {
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            experiences: Arc::new(store.clone()),
            promos: Arc::new(store.clone()),
            bookings: Arc::new(store.clone()),
            unit_of_work: Arc::new(store),
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        Self {
            experiences: Arc::new(StoreExperienceRepository::new(db.pool.clone())),
            promos: Arc::new(StorePromoRepository::new(db.pool.clone())),
            bookings: Arc::new(StoreBookingRepository::new(db.pool.clone())),
            unit_of_work: Arc::new(PgUnitOfWork::new(db.pool.clone())),
        }
    }

    /// Build the configured backend, migrating and seeding it as requested.
    pub async fn connect(config: &StorageConfig) -> Result<Self, SeedError> {
        match config.backend {
            StorageBackend::Memory => {
                let store = MemoryStore::new();
                match &config.seed_path {
                    Some(path) => seed::seed_memory(&store, SeedData::load(path).await?)?,
                    None => warn!("No seed file configured, starting with an empty catalog"),
                }
                info!("Using in-memory storage");
                Ok(Self::memory(store))
            }
            StorageBackend::Postgres => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    StoreError::Database("storage.database_url is required for the postgres backend".into())
                })?;
                let db = DbClient::new(url, config)
                    .await
                    .map_err(database::db_error)?;

                if config.run_migrations {
                    db.migrate()
                        .await
                        .map_err(|e| StoreError::Database(e.to_string()))?;
                }
                if let Some(path) = &config.seed_path {
                    seed::seed_postgres(&db, SeedData::load(path).await?).await?;
                }
                info!("Using PostgreSQL storage");
                Ok(Self::postgres(&db))
            }
        }
    }
}
