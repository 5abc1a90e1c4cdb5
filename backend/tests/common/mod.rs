//! Shared test harness backed by an in-memory SQLite database

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use line_trace_backend::config::DatabaseConfig;
use line_trace_backend::db;
use line_trace_backend::services::catalog::RegisterItemInput;
use line_trace_backend::services::lot::CreateLotInput;
use line_trace_backend::services::{
    BomService, CatalogService, GenealogyService, InventoryService, LotService,
};
use shared::{ItemAttributes, ItemStage, Lot};

/// Every service wired to one fresh in-memory database
pub struct TestApp {
    pub pool: SqlitePool,
    pub catalog: CatalogService,
    pub bom: BomService,
    pub lots: LotService,
    pub genealogy: GenealogyService,
    pub inventory: InventoryService,
}

impl TestApp {
    /// Construct a new test application with fresh database state
    pub async fn new() -> Self {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let pool = db::initialize(&config)
            .await
            .expect("failed to create test database");

        let write_lock = Arc::new(Mutex::new(()));
        let catalog = CatalogService::new(pool.clone());
        let bom = BomService::new(pool.clone(), Arc::new(catalog.clone()));
        let lots = LotService::new(pool.clone(), write_lock.clone());
        let genealogy = GenealogyService::new(pool.clone(), write_lock.clone());
        let inventory = InventoryService::new(pool.clone(), write_lock);

        Self {
            pool,
            catalog,
            bom,
            lots,
            genealogy,
            inventory,
        }
    }

    /// Register an item with no extra attributes
    pub async fn register_item(&self, item_id: &str, name: &str, stage: ItemStage, unit: &str) {
        self.catalog
            .register_item(RegisterItemInput {
                item_id: item_id.to_string(),
                item_name: name.to_string(),
                item_type: stage,
                unit_of_measure: unit.to_string(),
                attributes: ItemAttributes::default(),
            })
            .await
            .expect("item registration failed");
    }

    /// Create a lot with the defaults tests care about
    pub async fn create_lot(
        &self,
        item_id: &str,
        process_code: &str,
        planned_quantity: f64,
        production_date: NaiveDate,
    ) -> Lot {
        self.lots
            .create_lot(CreateLotInput {
                item_id: item_id.to_string(),
                process_code: process_code.to_string(),
                planned_quantity,
                production_date: Some(production_date),
                actual_quantity: None,
                quality_grade: None,
                equipment_id: None,
                operator_id: None,
                location: None,
                measured_length: None,
                measured_weight: None,
                measurement_notes: None,
            })
            .await
            .expect("lot creation failed")
    }
}

/// 2025-05-01, the production date most tests pin
pub fn may_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
}
