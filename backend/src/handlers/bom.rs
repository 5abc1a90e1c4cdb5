//! BOM graph HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::bom::{AddComponentInput, DEFAULT_MAX_DEPTH};
use crate::services::{BomService, ItemDirectory};
use crate::AppState;

/// Query parameters for BOM expansion
#[derive(Debug, Deserialize)]
pub struct ExpandParams {
    pub max_depth: Option<u32>,
}

/// Add a BOM component edge
pub async fn add_bom_component(
    State(state): State<AppState>,
    Json(input): Json<AddComponentInput>,
) -> impl IntoResponse {
    let service = BomService::new(state.db.clone(), state.directory.clone());

    let parent = input.parent_item_id.clone();
    let component = input.component_item_id.clone();
    match service.add_component(input).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "parent_item_id": parent,
                "component_item_id": component,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Direct components of an item
pub async fn get_direct_components(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> impl IntoResponse {
    // Surface a missing parent as 404 rather than an empty list
    match state.directory.find_item(&item_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return AppError::NotFound(format!("Item '{}'", item_id)).into_response(),
        Err(e) => return e.into_response(),
    }

    let service = BomService::new(state.db.clone(), state.directory.clone());
    match service.direct_components(&item_id).await {
        Ok(components) => (
            StatusCode::OK,
            Json(serde_json::json!({ "components": components })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Expand the multi-level BOM below an item
pub async fn get_bom_tree(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(params): Query<ExpandParams>,
) -> impl IntoResponse {
    // The depth cap is a cycle safety net; callers cannot raise it
    let max_depth = params.max_depth.unwrap_or(DEFAULT_MAX_DEPTH).min(DEFAULT_MAX_DEPTH);

    let service = BomService::new(state.db.clone(), state.directory.clone());
    match service.expand(&item_id, max_depth).await {
        Ok(tree) => (StatusCode::OK, Json(tree)).into_response(),
        Err(e) => e.into_response(),
    }
}
