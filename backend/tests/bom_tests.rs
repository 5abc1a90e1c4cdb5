//! BOM graph tests
//!
//! Covers edge validation, cycle prevention, and multi-level expansion
//! including the depth cap and broken-reference tolerance.

mod common;

use line_trace_backend::error::AppError;
use line_trace_backend::services::bom::AddComponentInput;
use shared::ItemStage;

use common::TestApp;

fn edge_input(parent: &str, component: &str, quantity: f64, usage: &str) -> AddComponentInput {
    AddComponentInput {
        parent_item_id: parent.to_string(),
        component_item_id: component.to_string(),
        quantity,
        usage_type: usage.to_string(),
    }
}

async fn chain_app() -> TestApp {
    // A (finished) -> B (braided) -> C (stretch) -> D (raw)
    let app = TestApp::new().await;
    app.register_item("A", "完成品A", ItemStage::FinishedProduct, "個")
        .await;
    app.register_item("B", "製紐糸B", ItemStage::BraidedThread, "M")
        .await;
    app.register_item("C", "PS糸C", ItemStage::StretchThread, "M")
        .await;
    app.register_item("D", "原糸D", ItemStage::RawYarn, "KG")
        .await;
    app.bom
        .add_component(edge_input("A", "B", 100.0, "Main Material"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("B", "C", 8.0, "Main Braid Thread"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("C", "D", 0.8, "Main Material"))
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn direct_components_return_exact_edge_data() {
    let app = chain_app().await;

    let components = app.bom.direct_components("B").await.unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].item.item_id, "C");
    assert_eq!(components[0].quantity, 8.0);
    assert_eq!(components[0].usage_type, "Main Braid Thread");
}

#[tokio::test]
async fn same_pair_can_carry_two_roles() {
    let app = TestApp::new().await;
    app.register_item("P", "完成品", ItemStage::FinishedProduct, "個")
        .await;
    app.register_item("X", "梱包資材", ItemStage::PackagingMaterial, "個")
        .await;

    app.bom
        .add_component(edge_input("P", "X", 1.0, "Container"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("P", "X", 2.0, "Packaging"))
        .await
        .unwrap();

    let components = app.bom.direct_components("P").await.unwrap();
    assert_eq!(components.len(), 2);
    // Ordered by usage type
    assert_eq!(components[0].usage_type, "Container");
    assert_eq!(components[1].usage_type, "Packaging");
}

#[tokio::test]
async fn self_reference_is_rejected() {
    let app = TestApp::new().await;
    app.register_item("A", "アイテム", ItemStage::RawYarn, "KG")
        .await;

    let err = app
        .bom
        .add_component(edge_input("A", "A", 1.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn unknown_endpoints_are_rejected() {
    let app = TestApp::new().await;
    app.register_item("A", "アイテム", ItemStage::RawYarn, "KG")
        .await;

    let err = app
        .bom
        .add_component(edge_input("A", "GHOST", 1.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .bom
        .add_component(edge_input("GHOST", "A", 1.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_edge_is_rejected() {
    let app = chain_app().await;

    let err = app
        .bom
        .add_component(edge_input("A", "B", 50.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(_)));
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let app = chain_app().await;

    for quantity in [0.0, -1.0, f64::NAN] {
        let err = app
            .bom
            .add_component(edge_input("A", "D", quantity, "Main Material"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

#[tokio::test]
async fn cycles_are_rejected_at_insertion() {
    let app = chain_app().await;

    // Direct back-edge
    let err = app
        .bom
        .add_component(edge_input("B", "A", 1.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CircularReference(_)));

    // Transitive back-edge: D already sits below A
    let err = app
        .bom
        .add_component(edge_input("D", "A", 1.0, "Main Material"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CircularReference(_)));
}

#[tokio::test]
async fn shared_component_is_not_a_cycle() {
    let app = chain_app().await;
    app.register_item("CORE", "芯糸", ItemStage::CoreThread, "M")
        .await;

    // CORE used by both B and C: a diamond, not a cycle
    app.bom
        .add_component(edge_input("B", "CORE", 1.0, "Core Thread"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("C", "CORE", 1.0, "Core Thread"))
        .await
        .unwrap();
}

#[tokio::test]
async fn expand_depth_zero_returns_single_node() {
    let app = chain_app().await;

    let tree = app.bom.expand("A", 0).await.unwrap();
    assert_eq!(tree.item.item_id, "A");
    assert!(tree.components.is_empty());
}

#[tokio::test]
async fn expand_nests_chain_three_levels_deep() {
    let app = chain_app().await;

    let tree = app.bom.expand("A", 10).await.unwrap();
    assert_eq!(tree.item.item_id, "A");
    assert_eq!(tree.components.len(), 1);

    let b = &tree.components[0];
    assert_eq!(b.item.item_id, "B");
    assert_eq!(b.quantity, 100.0);

    let c = &b.components[0];
    assert_eq!(c.item.item_id, "C");
    assert_eq!(c.quantity, 8.0);

    let d = &c.components[0];
    assert_eq!(d.item.item_id, "D");
    assert_eq!(d.quantity, 0.8);
    assert!(d.components.is_empty());

    assert_eq!(tree.depth(), 3);
}

#[tokio::test]
async fn expand_is_idempotent_for_a_fixed_graph() {
    let app = chain_app().await;

    let first = app.bom.expand("A", 10).await.unwrap();
    let second = app.bom.expand("A", 10).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn expand_truncates_at_max_depth() {
    let app = chain_app().await;

    let tree = app.bom.expand("A", 1).await.unwrap();
    let b = &tree.components[0];
    assert_eq!(b.item.item_id, "B");
    // C exists in the graph but lies beyond the cap
    assert!(b.components.is_empty());
}

#[tokio::test]
async fn expand_keeps_independent_quantity_context_per_branch() {
    let app = TestApp::new().await;
    app.register_item("P1", "完成品1", ItemStage::FinishedProduct, "個")
        .await;
    app.register_item("P2", "完成品2", ItemStage::FinishedProduct, "個")
        .await;
    app.register_item("ROOT", "巻き取り糸", ItemStage::WoundThread, "M")
        .await;
    app.register_item("SHARED", "原糸", ItemStage::RawYarn, "KG")
        .await;

    app.bom
        .add_component(edge_input("ROOT", "P1", 1.0, "Container"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("ROOT", "P2", 2.0, "Container"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("P1", "SHARED", 3.0, "Main Material"))
        .await
        .unwrap();
    app.bom
        .add_component(edge_input("P2", "SHARED", 7.0, "Main Material"))
        .await
        .unwrap();

    let tree = app.bom.expand("ROOT", 10).await.unwrap();
    assert_eq!(tree.node_count(), 5);

    // SHARED appears twice, each time with its own quantity
    let quantities: Vec<f64> = tree
        .components
        .iter()
        .flat_map(|branch| branch.components.iter().map(|c| c.quantity))
        .collect();
    assert_eq!(quantities, [3.0, 7.0]);
}

#[tokio::test]
async fn broken_reference_drops_the_branch_not_the_tree() {
    let app = chain_app().await;

    // Simulate a bad master row: the item behind edge B -> C disappears
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&app.pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM items WHERE item_id = 'C'")
        .execute(&app.pool)
        .await
        .unwrap();

    let tree = app.bom.expand("A", 10).await.unwrap();
    assert_eq!(tree.item.item_id, "A");
    let b = &tree.components[0];
    assert_eq!(b.item.item_id, "B");
    // The C branch is gone, the rest of the tree survived
    assert!(b.components.is_empty());
}

#[tokio::test]
async fn missing_root_is_not_found() {
    let app = TestApp::new().await;

    let err = app.bom.expand("GHOST", 10).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// Register a braided thread and its yarn, wire them up, expand
#[tokio::test]
async fn braid_line_end_to_end() {
    let app = TestApp::new().await;
    app.register_item("YARN_001", "原糸", ItemStage::RawYarn, "KG")
        .await;
    app.register_item("BRAID_001", "製紐糸", ItemStage::BraidedThread, "M")
        .await;
    app.bom
        .add_component(edge_input("BRAID_001", "YARN_001", 8.0, "Main Braid Thread"))
        .await
        .unwrap();

    let tree = app.bom.expand("BRAID_001", 10).await.unwrap();
    assert_eq!(tree.item.item_id, "BRAID_001");
    assert_eq!(tree.components.len(), 1);
    let branch = &tree.components[0];
    assert_eq!(branch.quantity, 8.0);
    assert_eq!(branch.usage_type, "Main Braid Thread");
    assert_eq!(branch.item.item_id, "YARN_001");
    assert!(branch.components.is_empty());
}
