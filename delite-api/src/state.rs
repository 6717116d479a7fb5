use std::sync::Arc;
use delite_core::{BookingRepository, ExperienceRepository, PromoRepository};
use delite_order::BookingCoordinator;
use delite_store::RedisClient;

/// Fixed-window limits applied per client address
#[derive(Clone, Copy, Debug)]
pub struct RateLimitSettings {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BookingCoordinator>,
    pub experiences: Arc<dyn ExperienceRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitSettings,
}
