//! CampusNet realtime API server

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campusnet_api::{
    config::{Config, StoreBackend},
    routes::create_router,
    store::{ChatStore, MemoryStore, PgStore, RelationshipStore, RetryingStore},
    AppState,
};
use campusnet_shared::{create_pool, run_migrations};

type Stores = (Arc<dyn ChatStore>, Arc<dyn RelationshipStore>);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campusnet_api=info,tower_http=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    let policy = config.retry_policy();

    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let pool = create_pool(url, config.database_max_connections, policy.timeout)
                .await
                .context("Failed to connect to database")?;
            run_migrations(&pool).await.context("Failed to run migrations")?;
            tracing::info!("Database connected and migrated");

            let store = Arc::new(RetryingStore::new(PgStore::new(pool), policy));
            let chat_store: Arc<dyn ChatStore> = store.clone();
            let relationship_store: Arc<dyn RelationshipStore> = store;
            Ok((chat_store, relationship_store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(RetryingStore::new(MemoryStore::new(), policy));
            let chat_store: Arc<dyn ChatStore> = store.clone();
            let relationship_store: Arc<dyn RelationshipStore> = store;
            Ok((chat_store, relationship_store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        bind_address = %config.bind_address,
        backend = ?config.store_backend,
        "Configuration loaded"
    );

    let (chat_store, relationship_store) = build_stores(&config).await?;
    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, chat_store, relationship_store);
    let ws_state = state.ws_state.clone();

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "CampusNet API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    ws_state.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}
