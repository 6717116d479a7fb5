use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use delite_api::{app, AppState, RateLimitSettings};
use delite_catalog::{PricingConfig, PricingEngine};
use delite_core::EventPublisher;
use delite_order::{BookingCoordinator, PaymentOrchestrator, SimulatedPaymentAdapter};
use delite_store::{Config, LogEventPublisher, RedisClient, Storage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "delite_api=debug,delite_order=debug,delite_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Delite API on port {}", config.server.port);

    let storage = Storage::connect(&config.storage)
        .await
        .context("Failed to initialise storage")?;

    let events = event_publisher(&config)?;
    let payments = PaymentOrchestrator::new(Arc::new(SimulatedPaymentAdapter), config.business_rules.currency.clone());
    let pricing = PricingEngine::new(PricingConfig {
        tax_rate: config.business_rules.tax_rate,
    });
    let mut coordinator = BookingCoordinator::new(storage.unit_of_work.clone(), pricing, payments, events)
        .with_reference_attempts(config.business_rules.reference_attempts);
    if let Some(kafka) = &config.kafka {
        coordinator = coordinator.with_event_topic(kafka.topic.clone());
    }

    let (redis, rate_limit) = match &config.redis {
        Some(redis_config) => {
            let client = RedisClient::new(&redis_config.url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!(
                "Rate limiting enabled: {} requests per {}s",
                redis_config.requests_per_window,
                redis_config.window_seconds
            );
            (
                Some(Arc::new(client)),
                RateLimitSettings {
                    requests_per_window: redis_config.requests_per_window,
                    window_seconds: redis_config.window_seconds,
                },
            )
        }
        None => (
            None,
            RateLimitSettings {
                requests_per_window: 0,
                window_seconds: 0,
            },
        ),
    };

    let app_state = AppState {
        coordinator: Arc::new(coordinator),
        experiences: storage.experiences,
        promos: storage.promos,
        bookings: storage.bookings,
        redis,
        rate_limit,
    };

    let app = app(app_state, &config.server.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}

#[cfg(feature = "kafka")]
fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match &config.kafka {
        Some(kafka) => {
            let producer = delite_store::EventProducer::new(&kafka.brokers)
                .context("Failed to create Kafka producer")?;
            tracing::info!("Publishing booking events to Kafka at {}", kafka.brokers);
            Ok(Arc::new(producer))
        }
        None => Ok(Arc::new(LogEventPublisher)),
    }
}

#[cfg(not(feature = "kafka"))]
fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if config.kafka.is_some() {
        tracing::warn!("Kafka is configured but this build lacks the `kafka` feature; logging events instead");
    }
    Ok(Arc::new(LogEventPublisher))
}
