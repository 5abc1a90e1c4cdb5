//! Inventory ledger HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::services::inventory::AdjustInput;
use crate::services::InventoryService;
use crate::AppState;

/// Adjustment request for a lot
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub quantity_change: f64,
    pub transaction_date: Option<NaiveDate>,
    pub operator_id: Option<String>,
    pub notes: Option<String>,
}

/// Ledger rows and reconstructed balance for a lot
pub async fn get_lot_transactions(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone(), state.write_lock.clone());

    let transactions = match service.transactions_for_lot(&lot_id).await {
        Ok(transactions) => transactions,
        Err(e) => return e.into_response(),
    };
    let balance = match service.balance(&lot_id).await {
        Ok(balance) => balance,
        Err(e) => return e.into_response(),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "transactions": transactions,
            "balance": balance,
        })),
    )
        .into_response()
}

/// Manually adjust a lot's stock
pub async fn adjust_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<String>,
    Json(request): Json<AdjustRequest>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone(), state.write_lock.clone());

    let input = AdjustInput {
        lot_id,
        quantity_change: request.quantity_change,
        transaction_date: request.transaction_date,
        operator_id: request.operator_id,
        notes: request.notes,
    };

    match service.adjust(input).await {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Report lots whose cached balance has drifted from the ledger
pub async fn audit_balances(State(state): State<AppState>) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone(), state.write_lock.clone());

    match service.audit_balances().await {
        Ok(drifted) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": if drifted.is_empty() { "consistent" } else { "drift_detected" },
                "drifted_lots": drifted,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
