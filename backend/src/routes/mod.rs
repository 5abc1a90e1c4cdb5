//! Route definitions for the Line Trace platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Item catalog and BOM graph
        .nest("/items", item_routes())
        .route("/bom/components", post(handlers::add_bom_component))
        // Lot ledger and genealogy
        .nest("/lots", lot_routes())
        // Inventory audit
        .route("/inventory/audit", get(handlers::audit_balances))
        // Reference data
        .nest("/reference", reference_routes())
        // External product-master sync
        .route("/sync/product-master", post(handlers::sync_product_master))
}

/// Item catalog routes
fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::register_item))
        .route("/:item_id", get(handlers::get_item))
        .route("/:item_id/components", get(handlers::get_direct_components))
        .route("/:item_id/bom-tree", get(handlers::get_bom_tree))
        .route("/:item_id/lots", get(handlers::get_lots_by_item))
}

/// Lot management routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route("/:lot_id", get(handlers::get_lot))
        .route("/:lot_id/cancel", post(handlers::cancel_lot))
        .route("/:lot_id/transactions", get(handlers::get_lot_transactions))
        .route("/:lot_id/adjust", post(handlers::adjust_lot))
        .route("/:lot_id/genealogy", get(handlers::trace_genealogy))
        .route("/:lot_id/consume", post(handlers::consume_lot))
        .route("/:lot_id/candidates", get(handlers::get_candidate_parents))
}

/// Reference data routes
fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/processes", get(handlers::list_process_steps))
        .route("/quality-grades", get(handlers::list_quality_grades))
}
