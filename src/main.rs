use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use funnel::analytics::{AnalyticsRecorder, EnvironmentSniffer, TrackerRegistry};
use funnel::api::{create_admin_router, create_funnel_router, FunnelState};
use funnel::config::{Config, DatabaseBackend};
use funnel::prelander::ConfigResolver;
use funnel::storage::{CachedStorage, PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(SqliteStorage::new(&config.database.url, 5).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(PostgresStorage::new(&config.database.url).await?)
        }
    };

    // Initialize database
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    // Wrap the content read path in a TTL cache
    let storage: Arc<dyn Storage> = Arc::new(CachedStorage::new(
        Arc::clone(&storage),
        config.cache.max_entries,
        config.cache.ttl_secs,
    ));

    // Tracking services
    let sniffer = EnvironmentSniffer::new(&config.tracking)?;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let resolver = ConfigResolver::new(Arc::clone(&storage));
    let trackers = TrackerRegistry::new(
        Arc::clone(&storage),
        Duration::from_secs(config.tracking.heartbeat_secs),
    );

    let funnel_state = Arc::new(FunnelState {
        storage: Arc::clone(&storage),
        recorder,
        resolver,
        sniffer,
        trackers: Arc::clone(&trackers),
        tracking: config.tracking.clone(),
    });

    // Create routers
    let funnel_router = create_funnel_router(funnel_state);
    let admin_router = create_admin_router(Arc::clone(&storage));

    // Start funnel server
    let funnel_addr = format!(
        "{}:{}",
        config.funnel_server.host, config.funnel_server.port
    );
    let funnel_listener = tokio::net::TcpListener::bind(&funnel_addr).await?;
    info!("🚀 Funnel server listening on http://{}", funnel_addr);

    // Start admin server
    let admin_addr = format!("{}:{}", config.admin_server.host, config.admin_server.port);
    let admin_listener = tokio::net::TcpListener::bind(&admin_addr).await?;
    info!("🚀 Admin server listening on http://{}", admin_addr);

    // Run both servers concurrently
    tokio::try_join!(
        axum::serve(
            funnel_listener,
            funnel_router.into_make_service_with_connect_info::<SocketAddr>(),
        ),
        axum::serve(admin_listener, admin_router),
    )?;

    Ok(())
}
