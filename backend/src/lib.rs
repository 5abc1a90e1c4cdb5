//! Line Trace - Manufacturing BOM & Lot Traceability Platform
//!
//! Tracks manufactured-goods composition (bill of materials) and physical
//! production lots with full forward/backward genealogy through the
//! fishing-line manufacturing pipeline.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

use services::ItemDirectory;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<Config>,
    /// Item reads go through here; local catalog or product-master mirror
    pub directory: Arc<dyn ItemDirectory>,
    /// Serializes read-modify-write critical sections (lot ids, balances)
    pub write_lock: Arc<Mutex<()>>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Line Trace - BOM & Lot Traceability API v1.0"
}
