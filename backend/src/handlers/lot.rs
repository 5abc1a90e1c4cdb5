//! Lot management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use shared::{
    GenealogyEdge, InventoryTransaction, ItemStage, LotDetail, LotStatus,
};

use crate::error::AppError;
use crate::services::lot::{CreateLotInput, LotListQuery};
use crate::services::{GenealogyService, InventoryService, LotService};
use crate::AppState;

/// Query parameters for the lot overview
#[derive(Debug, Deserialize)]
pub struct ListLotsParams {
    pub status: Option<String>,
    pub process: Option<String>,
    pub item_type: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for lots of one item
#[derive(Debug, Deserialize)]
pub struct LotsByItemParams {
    pub status: Option<String>,
}

/// Full lot view: the lot plus its ledger and genealogy edges
#[derive(Debug, Serialize)]
pub struct LotDetailsResponse {
    #[serde(flatten)]
    pub lot: LotDetail,
    pub transactions: Vec<InventoryTransaction>,
    /// Edges where this lot is the parent: what went into it
    pub consumed_materials: Vec<GenealogyEdge>,
    /// Edges where this lot is the child: where it went
    pub used_in_lots: Vec<GenealogyEdge>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<LotStatus>, AppError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(raw) => LotStatus::from_str(raw)
            .map(Some)
            .ok_or_else(|| AppError::ValidationError(format!("unknown lot status '{}'", raw))),
    }
}

/// List lots with filters and summary counts
pub async fn list_lots(
    State(state): State<AppState>,
    Query(params): Query<ListLotsParams>,
) -> impl IntoResponse {
    let status = match parse_status(params.status.as_deref()) {
        Ok(status) => status,
        Err(e) => return e.into_response(),
    };
    let item_type = match params.item_type.as_deref() {
        None | Some("all") => None,
        Some(raw) => match ItemStage::from_str(raw) {
            Some(stage) => Some(stage),
            None => {
                return AppError::ValidationError(format!("unknown item type '{}'", raw))
                    .into_response()
            }
        },
    };

    let service = LotService::new(state.db.clone(), state.write_lock.clone());
    let query = LotListQuery {
        status,
        process_code: params.process.filter(|p| p != "all"),
        item_type,
        search: params.search,
        limit: params.limit,
    };

    match service.list_lots(&query).await {
        Ok(lots) => {
            let active = lots
                .iter()
                .filter(|l| l.lot.lot_status == LotStatus::Active)
                .count();
            let consumed = lots
                .iter()
                .filter(|l| l.lot.lot_status == LotStatus::Consumed)
                .count();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "lots": lots,
                    "total_lots": lots.len(),
                    "active_lots": active,
                    "consumed_lots": consumed,
                })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Create a new lot
pub async fn create_lot(
    State(state): State<AppState>,
    Json(input): Json<CreateLotInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone(), state.write_lock.clone());

    match service.create_lot(input).await {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a lot with its ledger and genealogy edges
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> impl IntoResponse {
    let lots = LotService::new(state.db.clone(), state.write_lock.clone());
    let inventory = InventoryService::new(state.db.clone(), state.write_lock.clone());
    let genealogy = GenealogyService::new(state.db.clone(), state.write_lock.clone());

    let lot = match lots.get_lot(&lot_id).await {
        Ok(lot) => lot,
        Err(e) => return e.into_response(),
    };
    let transactions = match inventory.transactions_for_lot(&lot_id).await {
        Ok(transactions) => transactions,
        Err(e) => return e.into_response(),
    };
    let consumed_materials = match genealogy.consumed_materials(&lot_id).await {
        Ok(edges) => edges,
        Err(e) => return e.into_response(),
    };
    let used_in_lots = match genealogy.consumers(&lot_id).await {
        Ok(edges) => edges,
        Err(e) => return e.into_response(),
    };

    (
        StatusCode::OK,
        Json(LotDetailsResponse {
            lot,
            transactions,
            consumed_materials,
            used_in_lots,
        }),
    )
        .into_response()
}

/// List lots of one item
pub async fn get_lots_by_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(params): Query<LotsByItemParams>,
) -> impl IntoResponse {
    let status = match parse_status(params.status.as_deref()) {
        Ok(status) => status,
        Err(e) => return e.into_response(),
    };

    let service = LotService::new(state.db.clone(), state.write_lock.clone());
    match service.list_lots_by_item(&item_id, status).await {
        Ok(lots) => (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Administratively cancel a lot
pub async fn cancel_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone(), state.write_lock.clone());

    match service.cancel_lot(&lot_id).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}
