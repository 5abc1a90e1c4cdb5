//! Development sample data
//!
//! Seeds a small fishing-line catalog and its BOM so a fresh development
//! database has something to browse. Runs only when the items table is
//! empty, and never in production (the caller gates on configuration).

use std::sync::Arc;

use sqlx::SqlitePool;

use shared::{ItemAttributes, ItemStage};

use crate::error::AppResult;
use crate::services::bom::AddComponentInput;
use crate::services::catalog::RegisterItemInput;
use crate::services::{BomService, CatalogService};

struct SampleItem {
    item_id: &'static str,
    item_name: &'static str,
    item_type: ItemStage,
    unit: &'static str,
    material_type: Option<&'static str>,
    denier: Option<i64>,
}

const SAMPLE_ITEMS: &[SampleItem] = &[
    SampleItem {
        item_id: "PRODUCT_001",
        item_name: "ハイパワーライン 8号 100m",
        item_type: ItemStage::FinishedProduct,
        unit: "個",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "BRAID_001",
        item_name: "X8編み糸 グレード1",
        item_type: ItemStage::BraidedThread,
        unit: "M",
        material_type: Some("PE"),
        denier: None,
    },
    SampleItem {
        item_id: "BRAID_002",
        item_name: "X4編み糸 グレード2",
        item_type: ItemStage::BraidedThread,
        unit: "M",
        material_type: Some("PE"),
        denier: None,
    },
    SampleItem {
        item_id: "PS_001",
        item_name: "PS糸 6号",
        item_type: ItemStage::StretchThread,
        unit: "M",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "PS_002",
        item_name: "PS糸 8号",
        item_type: ItemStage::StretchThread,
        unit: "M",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "DYE_001",
        item_name: "染色糸 ブルー",
        item_type: ItemStage::DyedThread,
        unit: "M",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "RAW_001",
        item_name: "ナイロン原糸 150D",
        item_type: ItemStage::RawYarn,
        unit: "KG",
        material_type: Some("ナイロン"),
        denier: Some(150),
    },
    SampleItem {
        item_id: "RAW_002",
        item_name: "ナイロン原糸 200D",
        item_type: ItemStage::RawYarn,
        unit: "KG",
        material_type: Some("ナイロン"),
        denier: Some(200),
    },
    SampleItem {
        item_id: "CORE_001",
        item_name: "芯糸 6号",
        item_type: ItemStage::CoreThread,
        unit: "M",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "MOLD_001",
        item_name: "100m用スプール",
        item_type: ItemStage::MoldedPart,
        unit: "個",
        material_type: None,
        denier: None,
    },
    SampleItem {
        item_id: "PKG_001",
        item_name: "ブリスターパック 100m用",
        item_type: ItemStage::PackagingMaterial,
        unit: "個",
        material_type: None,
        denier: None,
    },
];

const SAMPLE_BOM: &[(&str, &str, f64, &str)] = &[
    ("PRODUCT_001", "BRAID_001", 100.0, "Main Material"),
    ("PRODUCT_001", "MOLD_001", 1.0, "Container"),
    ("PRODUCT_001", "PKG_001", 1.0, "Packaging"),
    ("BRAID_001", "PS_001", 8.0, "Main Braid Thread"),
    ("BRAID_001", "CORE_001", 1.0, "Core Thread"),
    ("BRAID_002", "PS_002", 4.0, "Main Braid Thread"),
    ("BRAID_002", "CORE_001", 1.0, "Core Thread"),
    ("PS_001", "RAW_001", 0.8, "Main Material"),
    ("PS_002", "RAW_002", 0.8, "Main Material"),
];

/// Seed the development catalog if the database is empty
pub async fn load_sample_data(pool: &SqlitePool) -> AppResult<()> {
    let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await?;
    if item_count > 0 {
        tracing::debug!("Catalog already populated, skipping sample data");
        return Ok(());
    }

    let catalog = CatalogService::new(pool.clone());
    let bom = BomService::new(pool.clone(), Arc::new(catalog.clone()));

    for sample in SAMPLE_ITEMS {
        catalog
            .register_item(RegisterItemInput {
                item_id: sample.item_id.to_string(),
                item_name: sample.item_name.to_string(),
                item_type: sample.item_type,
                unit_of_measure: sample.unit.to_string(),
                attributes: ItemAttributes {
                    material_type: sample.material_type.map(String::from),
                    denier: sample.denier,
                    ..Default::default()
                },
            })
            .await?;
    }

    for (parent, component, quantity, usage) in SAMPLE_BOM {
        bom.add_component(AddComponentInput {
            parent_item_id: parent.to_string(),
            component_item_id: component.to_string(),
            quantity: *quantity,
            usage_type: usage.to_string(),
        })
        .await?;
    }

    tracing::info!(
        items = SAMPLE_ITEMS.len(),
        bom_edges = SAMPLE_BOM.len(),
        "Seeded development sample data"
    );

    Ok(())
}
