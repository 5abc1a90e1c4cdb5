//! Lot ledger tests
//!
//! Covers lot-id generation, atomic creation with its RECEIPT row, joined
//! reads, listings, and the administrative lifecycle.

mod common;

use chrono::NaiveDate;
use proptest::prelude::*;

use line_trace_backend::error::AppError;
use line_trace_backend::services::lot::{CreateLotInput, LotListQuery};
use shared::{
    format_lot_id, validate_lot_id_format, ItemStage, LotStatus, TransactionType,
};

use common::{may_day, TestApp};

async fn yarn_app() -> TestApp {
    let app = TestApp::new().await;
    app.register_item("RAW_001", "ナイロン原糸 150D", ItemStage::RawYarn, "KG")
        .await;
    app
}

#[tokio::test]
async fn lot_ids_increment_within_their_bucket() {
    let app = yarn_app().await;

    // Three creations in sequence take the next three sequence numbers
    let first = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    let second = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    let third = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    assert_eq!(first.lot_id, "2505P001");
    assert_eq!(second.lot_id, "2505P002");
    assert_eq!(third.lot_id, "2505P003");

    // The preview call reports the next id without claiming it
    let next = app.lots.generate_lot_id("P", may_day()).await.unwrap();
    assert_eq!(next, "2505P004");
    let next_again = app.lots.generate_lot_id("P", may_day()).await.unwrap();
    assert_eq!(next_again, "2505P004");
}

#[tokio::test]
async fn buckets_are_independent_per_month_and_process() {
    let app = yarn_app().await;

    let may_p = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    let may_w = app.create_lot("RAW_001", "W", 100.0, may_day()).await;
    let june = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let june_p = app.create_lot("RAW_001", "P", 100.0, june).await;

    assert_eq!(may_p.lot_id, "2505P001");
    assert_eq!(may_w.lot_id, "2505W001");
    assert_eq!(june_p.lot_id, "2506P001");
}

#[tokio::test]
async fn creation_writes_lot_and_receipt_atomically() {
    let app = yarn_app().await;

    let lot = app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    assert_eq!(lot.current_quantity, 100.0);
    assert_eq!(lot.lot_status, LotStatus::Active);
    assert_eq!(lot.quality_grade, "A");

    let transactions = app
        .inventory
        .transactions_for_lot(&lot.lot_id)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1);
    let receipt = &transactions[0];
    assert_eq!(receipt.transaction_type, TransactionType::Receipt);
    assert_eq!(receipt.quantity_before, 0.0);
    assert_eq!(receipt.quantity_change, 100.0);
    assert_eq!(receipt.quantity_after, 100.0);
}

#[tokio::test]
async fn actual_quantity_overrides_planned_for_the_balance() {
    let app = yarn_app().await;

    let lot = app
        .lots
        .create_lot(CreateLotInput {
            item_id: "RAW_001".to_string(),
            process_code: "P".to_string(),
            planned_quantity: 500.0,
            production_date: Some(may_day()),
            actual_quantity: Some(498.5),
            quality_grade: Some("B".to_string()),
            equipment_id: Some("延伸機No.2".to_string()),
            operator_id: Some("OP001".to_string()),
            location: Some("原材料倉庫A-01".to_string()),
            measured_length: None,
            measured_weight: Some(498.5),
            measurement_notes: None,
        })
        .await
        .unwrap();

    assert_eq!(lot.current_quantity, 498.5);
    assert_eq!(lot.quality_grade, "B");

    let receipt = &app
        .inventory
        .transactions_for_lot(&lot.lot_id)
        .await
        .unwrap()[0];
    assert_eq!(receipt.quantity_change, 498.5);
    assert_eq!(receipt.location.as_deref(), Some("原材料倉庫A-01"));
}

#[tokio::test]
async fn creation_validates_item_process_and_grade() {
    let app = yarn_app().await;

    let base = |item: &str, process: &str, grade: Option<&str>| CreateLotInput {
        item_id: item.to_string(),
        process_code: process.to_string(),
        planned_quantity: 100.0,
        production_date: Some(may_day()),
        actual_quantity: None,
        quality_grade: grade.map(String::from),
        equipment_id: None,
        operator_id: None,
        location: None,
        measured_length: None,
        measured_weight: None,
        measurement_notes: None,
    };

    let err = app
        .lots
        .create_lot(base("GHOST", "P", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .lots
        .create_lot(base("RAW_001", "X", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = app
        .lots
        .create_lot(base("RAW_001", "P", Some("Z")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn lot_detail_joins_reference_data() {
    let app = yarn_app().await;
    let lot = app.create_lot("RAW_001", "P", 100.0, may_day()).await;

    let detail = app.lots.get_lot(&lot.lot_id).await.unwrap();
    assert_eq!(detail.item_name, "ナイロン原糸 150D");
    assert_eq!(detail.item_type, ItemStage::RawYarn);
    assert_eq!(detail.unit_of_measure, "KG");
    assert_eq!(detail.process_name, "Pre-Stretch");
    assert_eq!(detail.process_level, 1);
    assert_eq!(detail.grade_name.as_deref(), Some("Grade A"));

    let err = app.lots.get_lot("2505Z999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn lots_by_item_come_newest_first() {
    let app = yarn_app().await;
    let early = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    let old = app.create_lot("RAW_001", "P", 100.0, early).await;
    let new = app.create_lot("RAW_001", "P", 100.0, may_day()).await;

    let lots = app.lots.list_lots_by_item("RAW_001", None).await.unwrap();
    let ids: Vec<&str> = lots.iter().map(|l| l.lot.lot_id.as_str()).collect();
    assert_eq!(ids, [new.lot_id.as_str(), old.lot_id.as_str()]);
}

#[tokio::test]
async fn lot_overview_respects_limit_and_filters() {
    let app = yarn_app().await;
    app.register_item("BRAID_001", "製紐糸", ItemStage::BraidedThread, "M")
        .await;
    for _ in 0..3 {
        app.create_lot("RAW_001", "P", 100.0, may_day()).await;
    }
    app.create_lot("BRAID_001", "S", 50.0, may_day()).await;

    let all = app
        .lots
        .list_lots(&Default::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let limited = app
        .lots
        .list_lots(&LotListQuery {
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let braids = app
        .lots
        .list_lots(&LotListQuery {
            item_type: Some(ItemStage::BraidedThread),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(braids.len(), 1);
    assert_eq!(braids[0].lot.process_code, "S");
}

#[tokio::test]
async fn cancelled_lots_are_terminal() {
    let app = yarn_app().await;
    let lot = app.create_lot("RAW_001", "P", 100.0, may_day()).await;

    let cancelled = app.lots.cancel_lot(&lot.lot_id).await.unwrap();
    assert_eq!(cancelled.lot.lot_status, LotStatus::Cancelled);

    let err = app.lots.cancel_lot(&lot.lot_id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Every id the formatter produces passes the format validator
    #[test]
    fn prop_formatted_lot_ids_are_valid(
        year in 2020i32..=2099i32,
        month in 1u32..=12u32,
        process in "[A-Z]",
        sequence in 1u32..=999u32,
    ) {
        let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let lot_id = format_lot_id(date, &process, sequence);
        prop_assert!(validate_lot_id_format(&lot_id).is_ok());
    }

    /// Ids are unique within a bucket exactly when sequences differ
    #[test]
    fn prop_lot_ids_unique_per_sequence(
        seq1 in 1u32..=999u32,
        seq2 in 1u32..=999u32,
    ) {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let id1 = format_lot_id(date, "P", seq1);
        let id2 = format_lot_id(date, "P", seq2);
        if seq1 == seq2 {
            prop_assert_eq!(id1, id2);
        } else {
            prop_assert_ne!(id1, id2);
        }
    }

    /// Buckets never collide across months or processes
    #[test]
    fn prop_lot_ids_differ_across_buckets(
        month1 in 1u32..=12u32,
        month2 in 1u32..=12u32,
        sequence in 1u32..=999u32,
    ) {
        let date1 = NaiveDate::from_ymd_opt(2025, month1, 1).unwrap();
        let date2 = NaiveDate::from_ymd_opt(2025, month2, 1).unwrap();
        let id1 = format_lot_id(date1, "P", sequence);
        let id2 = format_lot_id(date2, "W", sequence);
        prop_assert_ne!(id1, id2);
    }
}
