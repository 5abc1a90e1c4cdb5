//! Product-master sync HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::services::MirrorService;
use crate::AppState;

/// Copy the external product master into the local catalog
pub async fn sync_product_master(State(state): State<AppState>) -> impl IntoResponse {
    let service = MirrorService::new(state.db.clone());

    match service.sync_to_catalog().await {
        Ok(copied) => (
            StatusCode::OK,
            Json(serde_json::json!({ "copied": copied })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
