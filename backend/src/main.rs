//! Line Trace - Manufacturing BOM & Lot Traceability Server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use line_trace_backend::config::CatalogMode;
use line_trace_backend::services::{CatalogService, ItemDirectory, MirrorDirectory};
use line_trace_backend::{create_app, db, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "line_trace_backend=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Line Trace Server");
    tracing::info!("Environment: {}", config.environment);

    // Open the database and bring the schema up to date
    tracing::info!("Initializing storage at {}", config.database.url);
    let db_pool = db::initialize(&config.database).await?;
    tracing::info!("Storage ready");

    // Development sample catalog
    if config.sample_data && config.environment != "production" {
        db::seed::load_sample_data(&db_pool).await?;
    }

    // Select the item directory implementation
    let directory: Arc<dyn ItemDirectory> = match config.catalog.mode {
        CatalogMode::Local => Arc::new(CatalogService::new(db_pool.clone())),
        CatalogMode::Mirror => Arc::new(MirrorDirectory::new(db_pool.clone())),
    };
    tracing::info!("Catalog mode: {:?}", config.catalog.mode);

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        directory,
        write_lock: Arc::new(Mutex::new(())),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
