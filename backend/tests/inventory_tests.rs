//! Inventory ledger tests
//!
//! Covers the append-only ledger invariant, manual adjustments, and the
//! consistency between the ledger and the cached lot balance.

mod common;

use line_trace_backend::error::AppError;
use line_trace_backend::services::genealogy::ConsumeInput;
use line_trace_backend::services::inventory::AdjustInput;
use shared::{ItemStage, LotStatus, TransactionType};

use common::{may_day, TestApp};

fn adjust_input(lot_id: &str, change: f64) -> AdjustInput {
    AdjustInput {
        lot_id: lot_id.to_string(),
        quantity_change: change,
        transaction_date: None,
        operator_id: Some("OP001".to_string()),
        notes: Some("棚卸差異".to_string()),
    }
}

async fn stocked_app() -> (TestApp, String, String) {
    let app = TestApp::new().await;
    app.register_item("RAW_001", "原糸", ItemStage::RawYarn, "KG")
        .await;
    app.register_item("BRAID_001", "製紐糸", ItemStage::BraidedThread, "M")
        .await;
    let raw = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    let braid = app.create_lot("BRAID_001", "S", 500.0, may_day()).await;
    (app, raw.lot_id, braid.lot_id)
}

#[tokio::test]
async fn every_ledger_row_preserves_the_running_balance() {
    let (app, raw, braid) = stocked_app().await;

    app.genealogy
        .consume(ConsumeInput {
            parent_lot_id: braid.clone(),
            child_lot_id: raw.clone(),
            consumed_quantity: 30.0,
            usage_type: "Main Material".to_string(),
            consumption_date: None,
            notes: None,
        })
        .await
        .unwrap();
    app.inventory.adjust(adjust_input(&raw, -5.0)).await.unwrap();
    app.inventory.adjust(adjust_input(&raw, 2.5)).await.unwrap();

    let transactions = app.inventory.transactions_for_lot(&raw).await.unwrap();
    assert_eq!(transactions.len(), 4);
    for t in &transactions {
        assert_eq!(t.quantity_after, t.quantity_before + t.quantity_change);
    }

    // Ledger sum matches the cached balance exactly
    let balance = app.inventory.balance(&raw).await.unwrap();
    assert_eq!(balance.total_in, 102.5);
    assert_eq!(balance.total_out, 35.0);
    assert_eq!(balance.balance, 67.5);

    let lot = app.lots.get_lot(&raw).await.unwrap();
    assert_eq!(lot.lot.current_quantity, 67.5);

    assert!(app.inventory.audit_balances().await.unwrap().is_empty());
}

#[tokio::test]
async fn adjustments_cannot_take_the_balance_negative() {
    let (app, raw, _) = stocked_app().await;

    let err = app
        .inventory
        .adjust(adjust_input(&raw, -150.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientQuantity(_)));

    // Zero-change adjustments are meaningless and rejected
    let err = app
        .inventory
        .adjust(adjust_input(&raw, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let lot = app.lots.get_lot(&raw).await.unwrap();
    assert_eq!(lot.lot.current_quantity, 100.0);
    assert_eq!(
        app.inventory.transactions_for_lot(&raw).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn adjusting_to_zero_closes_the_lot() {
    let (app, raw, _) = stocked_app().await;

    let adjustment = app
        .inventory
        .adjust(adjust_input(&raw, -100.0))
        .await
        .unwrap();
    assert_eq!(adjustment.transaction_type, TransactionType::Adjustment);
    assert_eq!(adjustment.quantity_after, 0.0);

    let lot = app.lots.get_lot(&raw).await.unwrap();
    assert_eq!(lot.lot.lot_status, LotStatus::Consumed);

    // Terminal lots accept no further adjustments
    let err = app
        .inventory
        .adjust(adjust_input(&raw, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn ledger_reads_validate_the_lot() {
    let (app, _, _) = stocked_app().await;

    let err = app
        .inventory
        .transactions_for_lot("2505Z999")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app.inventory.balance("2505Z999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn transactions_come_newest_first() {
    let (app, raw, _) = stocked_app().await;

    app.inventory
        .adjust(AdjustInput {
            lot_id: raw.clone(),
            quantity_change: -1.0,
            transaction_date: Some(may_day().succ_opt().unwrap()),
            operator_id: None,
            notes: None,
        })
        .await
        .unwrap();

    let transactions = app.inventory.transactions_for_lot(&raw).await.unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].transaction_type, TransactionType::Adjustment);
    assert_eq!(transactions[1].transaction_type, TransactionType::Receipt);
}

#[tokio::test]
async fn audit_flags_drifted_projections() {
    let (app, raw, _) = stocked_app().await;

    // Corrupt the cached balance behind the ledger's back
    sqlx::query("UPDATE lots SET current_quantity = 42.0 WHERE lot_id = ?1")
        .bind(&raw)
        .execute(&app.pool)
        .await
        .unwrap();

    let drifted = app.inventory.audit_balances().await.unwrap();
    assert_eq!(drifted, vec![raw]);
}
