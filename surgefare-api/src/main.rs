use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use surgefare_api::{app, worker, AppState, AuthConfig, Repositories};
use surgefare_core::events::{EventPublisher, TracingEventPublisher};
use surgefare_core::ticket::LinkTicketIssuer;
use surgefare_store::app_config::{Config, StorageBackend};
use surgefare_store::{DbClient, InMemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surgefare_api=debug,surgefare_catalog=debug,surgefare_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting surgefare on port {}", config.server.port);

    let (repos, pricing_rules) = match config.storage.backend {
        StorageBackend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .context("storage.backend = \"postgres\" requires a [database] section")?;
            let db = DbClient::new(&db_config.url, db_config.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await?;
            let rules = db.fetch_pricing_rules(config.pricing.clone()).await?;
            (Repositories::postgres(&db), rules)
        }
        StorageBackend::Memory => {
            let store = match &config.storage.fixtures {
                Some(path) => InMemoryStore::from_fixtures(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to load fixtures {}: {}", path, e))?,
                None => InMemoryStore::new(),
            };
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (Repositories::in_memory(Arc::new(store)), config.pricing.clone())
        }
    };
    tracing::info!("Pricing rules: {:?}", pricing_rules);

    let issuer = Arc::new(LinkTicketIssuer::new(&config.ticketing.base_url, &config.ticketing.folder));
    let app_state = AppState::new(
        repos,
        issuer,
        event_publisher(&config)?,
        &pricing_rules,
        &config.booking,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    );

    worker::spawn_ledger_retention(
        app_state.retention.clone(),
        pricing_rules.purge_interval(),
    );
    worker::spawn_hold_sweeper(
        app_state.sweeper.clone(),
        config.booking.sweep_interval(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(feature = "kafka")]
fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match &config.kafka {
        Some(kafka) => Ok(Arc::new(surgefare_store::KafkaEventPublisher::new(&kafka.brokers)?)),
        None => Ok(Arc::new(TracingEventPublisher)),
    }
}

#[cfg(not(feature = "kafka"))]
fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if config.kafka.is_some() {
        tracing::warn!("[kafka] configured but built without the `kafka` feature; events go to the log");
    }
    Ok(Arc::new(TracingEventPublisher))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
