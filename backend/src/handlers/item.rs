//! Item catalog HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use shared::{ItemStage, PipelineOrder};

use crate::error::AppError;
use crate::services::catalog::{ItemQuery, RegisterItemInput};
use crate::services::{CatalogService, ItemDirectory};
use crate::AppState;

/// Query parameters for the item listing
#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    /// Pipeline stage filter; "all" or absent lists every stage
    pub item_type: Option<String>,
    /// "downstream" (default) or "upstream"
    pub order: Option<String>,
    pub search: Option<String>,
}

fn parse_item_query(params: &ListItemsParams) -> Result<ItemQuery, AppError> {
    let item_type = match params.item_type.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(ItemStage::from_str(raw).ok_or_else(|| {
            AppError::ValidationError(format!("unknown item type '{}'", raw))
        })?),
    };
    let order = match params.order.as_deref() {
        None => PipelineOrder::default(),
        Some(raw) => PipelineOrder::from_str(raw)
            .ok_or_else(|| AppError::ValidationError(format!("unknown order '{}'", raw)))?,
    };
    Ok(ItemQuery {
        item_type,
        order,
        search: params.search.clone(),
    })
}

/// List items with stage statistics
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListItemsParams>,
) -> impl IntoResponse {
    let query = match parse_item_query(&params) {
        Ok(query) => query,
        Err(e) => return e.into_response(),
    };

    let items = match state.directory.list_items(&query).await {
        Ok(items) => items,
        Err(e) => return e.into_response(),
    };

    // Stage statistics always cover the whole catalog
    let all_items = match state.directory.list_items(&ItemQuery::default()).await {
        Ok(items) => items,
        Err(e) => return e.into_response(),
    };
    let stats = CatalogService::stage_statistics(&all_items);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "items": items,
            "total_count": items.len(),
            "stage_statistics": stats,
        })),
    )
        .into_response()
}

/// Register a new item
pub async fn register_item(
    State(state): State<AppState>,
    Json(input): Json<RegisterItemInput>,
) -> impl IntoResponse {
    let service = CatalogService::new(state.db.clone());

    match service.register_item(input).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a single item
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> impl IntoResponse {
    match state.directory.find_item(&item_id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => AppError::NotFound(format!("Item '{}'", item_id)).into_response(),
        Err(e) => e.into_response(),
    }
}
