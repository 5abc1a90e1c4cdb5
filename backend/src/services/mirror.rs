//! External product-master mirror
//!
//! The factory's product catalog lives in an upstream ERP and is mirrored
//! into the `product_master` table by an external job. From the graph
//! engine's perspective a mirrored product is just an item with a
//! provenance tag; this module provides the read-through directory over the
//! mirror and the on-demand copy into the local catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use shared::{Item, ItemAttributes, ItemStage};

use crate::error::{AppError, AppResult};
use crate::services::catalog::{CatalogService, ItemDirectory, ItemQuery};

/// Provenance tag on items copied from the mirror
pub const MIRROR_SOURCE: &str = "product_master";

/// Read-through item directory: mirror first, local catalog as fallback
#[derive(Clone)]
pub struct MirrorDirectory {
    db: SqlitePool,
    fallback: CatalogService,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    product_code: String,
    product_name: String,
    product_type: String,
    unit_of_measure: String,
    series_name: Option<String>,
    yarn_composition: Option<String>,
    color: Option<String>,
    length_m: Option<f64>,
    updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "product_code, product_name, product_type, unit_of_measure, \
     series_name, yarn_composition, color, length_m, updated_at";

impl ProductRow {
    fn into_item(self) -> AppResult<Item> {
        let item_type = ItemStage::from_str(&self.product_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown product type '{}' on mirror row {}",
                self.product_type,
                self.product_code
            ))
        })?;

        let mut additional = std::collections::BTreeMap::new();
        if let Some(series) = &self.series_name {
            additional.insert("series_name".to_string(), serde_json::json!(series));
        }
        if let Some(composition) = &self.yarn_composition {
            additional.insert(
                "yarn_composition".to_string(),
                serde_json::json!(composition),
            );
        }

        Ok(Item {
            item_id: self.product_code,
            item_name: self.product_name,
            item_type,
            unit_of_measure: self.unit_of_measure,
            attributes: ItemAttributes {
                color: self.color,
                length_m: self.length_m,
                additional,
                ..Default::default()
            },
            source_system: Some(MIRROR_SOURCE.to_string()),
            created_at: self.updated_at,
        })
    }
}

impl MirrorDirectory {
    /// Create a new MirrorDirectory instance
    pub fn new(db: SqlitePool) -> Self {
        let fallback = CatalogService::new(db.clone());
        Self { db, fallback }
    }
}

#[async_trait]
impl ItemDirectory for MirrorDirectory {
    async fn find_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_master WHERE product_code = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into_item()?)),
            None => self.fallback.find_item(item_id).await,
        }
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_master"
        ))
        .fetch_all(&self.db)
        .await?;

        if rows.is_empty() {
            return self.fallback.list_items(query).await;
        }

        let mirrored = rows
            .into_iter()
            .map(ProductRow::into_item)
            .collect::<AppResult<Vec<_>>>()?;

        // Local-only items still show up; mirror rows shadow same-id locals
        let mut items = mirrored;
        let local = self.fallback.list_items(&ItemQuery::default()).await?;
        for item in local {
            if !items.iter().any(|m| m.item_id == item.item_id) {
                items.push(item);
            }
        }

        let filtered = ItemQuery {
            item_type: query.item_type,
            order: query.order,
            search: query.search.clone(),
        };
        Ok(apply_query(items, &filtered))
    }
}

/// Apply stage filter, search, and pipeline ordering to an item set
fn apply_query(mut items: Vec<Item>, query: &ItemQuery) -> Vec<Item> {
    if let Some(stage) = query.item_type {
        items.retain(|i| i.item_type == stage);
    }
    if let Some(needle) = query.search.as_deref() {
        let needle = needle.to_uppercase();
        items.retain(|i| i.item_name.to_uppercase().contains(&needle));
    }
    match query.order {
        shared::PipelineOrder::Downstream => items.sort_by(|a, b| {
            (a.item_type.rank(), &a.item_name).cmp(&(b.item_type.rank(), &b.item_name))
        }),
        shared::PipelineOrder::Upstream => items.sort_by(|a, b| {
            (std::cmp::Reverse(a.item_type.rank()), &a.item_name)
                .cmp(&(std::cmp::Reverse(b.item_type.rank()), &b.item_name))
        }),
    }
    items
}

/// On-demand copy of the mirror into the local catalog
#[derive(Clone)]
pub struct MirrorService {
    db: SqlitePool,
}

impl MirrorService {
    /// Create a new MirrorService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Upsert every mirror row into `items`, tagged with its provenance
    ///
    /// Returns the number of rows copied. Safe to run repeatedly.
    pub async fn sync_to_catalog(&self) -> AppResult<u64> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product_master"
        ))
        .fetch_all(&self.db)
        .await?;

        let mut tx = self.db.begin().await?;
        let mut copied = 0u64;

        for row in rows {
            let item = row.into_item()?;
            let additional_json = if item.attributes.additional.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&item.attributes.additional).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("mirror attribute map: {}", e))
                })?)
            };

            sqlx::query(
                r#"
                INSERT INTO items (
                    item_id, item_name, item_type, unit_of_measure,
                    color, length_m, additional_attributes, source_system, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (item_id) DO UPDATE SET
                    item_name = excluded.item_name,
                    item_type = excluded.item_type,
                    unit_of_measure = excluded.unit_of_measure,
                    color = excluded.color,
                    length_m = excluded.length_m,
                    additional_attributes = excluded.additional_attributes,
                    source_system = excluded.source_system
                "#,
            )
            .bind(&item.item_id)
            .bind(&item.item_name)
            .bind(item.item_type.as_str())
            .bind(&item.unit_of_measure)
            .bind(&item.attributes.color)
            .bind(item.attributes.length_m)
            .bind(&additional_json)
            .bind(MIRROR_SOURCE)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            copied += 1;
        }

        tx.commit().await?;

        tracing::info!(copied, "Synced product master into catalog");

        Ok(copied)
    }
}
