//! Lot genealogy HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared::{GenealogyNode, TraceDirection};

use crate::error::AppError;
use crate::services::genealogy::{ConsumeInput, DEFAULT_TRACE_DEPTH};
use crate::services::GenealogyService;
use crate::AppState;

/// Query parameters for genealogy traversal
#[derive(Debug, Deserialize)]
pub struct TraceParams {
    /// "forward", "backward", or absent for both
    pub direction: Option<String>,
    pub max_depth: Option<u32>,
}

/// Consumption request: the path lot is the child being consumed
#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub parent_lot_id: String,
    pub consumed_quantity: f64,
    pub usage_type: Option<String>,
    pub consumption_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TraceResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<GenealogyNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward: Option<GenealogyNode>,
}

/// Trace a lot's genealogy in one or both directions
pub async fn trace_genealogy(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
    Query(params): Query<TraceParams>,
) -> impl IntoResponse {
    let max_depth = params
        .max_depth
        .unwrap_or(DEFAULT_TRACE_DEPTH)
        .min(DEFAULT_TRACE_DEPTH);
    let service = GenealogyService::new(state.db.clone(), state.write_lock.clone());

    let direction = match params.direction.as_deref() {
        None => None,
        Some(raw) => match TraceDirection::from_str(raw) {
            Some(direction) => Some(direction),
            None => {
                return AppError::ValidationError(format!("unknown direction '{}'", raw))
                    .into_response()
            }
        },
    };

    let mut response = TraceResponse {
        forward: None,
        backward: None,
    };

    if direction.map_or(true, |d| d == TraceDirection::Forward) {
        match service
            .trace(&lot_id, TraceDirection::Forward, max_depth)
            .await
        {
            Ok(tree) => response.forward = Some(tree),
            Err(e) => return e.into_response(),
        }
    }
    if direction.map_or(true, |d| d == TraceDirection::Backward) {
        match service
            .trace(&lot_id, TraceDirection::Backward, max_depth)
            .await
        {
            Ok(tree) => response.backward = Some(tree),
            Err(e) => return e.into_response(),
        }
    }

    (StatusCode::OK, Json(response)).into_response()
}

/// Consume the lot into a downstream parent lot
pub async fn consume_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
    Json(request): Json<ConsumeRequest>,
) -> impl IntoResponse {
    let service = GenealogyService::new(state.db.clone(), state.write_lock.clone());

    let input = ConsumeInput {
        parent_lot_id: request.parent_lot_id,
        child_lot_id: lot_id,
        consumed_quantity: request.consumed_quantity,
        usage_type: request
            .usage_type
            .unwrap_or_else(|| "Main Material".to_string()),
        consumption_date: request.consumption_date,
        notes: request.notes,
    };

    match service.consume(input).await {
        Ok(edge) => (StatusCode::CREATED, Json(edge)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Candidate parent lots the lot could be consumed into
pub async fn get_candidate_parents(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> impl IntoResponse {
    let service = GenealogyService::new(state.db.clone(), state.write_lock.clone());

    match service.candidate_parents(&lot_id).await {
        Ok(lots) => (
            StatusCode::OK,
            Json(serde_json::json!({ "candidates": lots })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
