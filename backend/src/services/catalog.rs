//! Item catalog service
//!
//! The catalog is a flat registry of manufacturing item types. Reads go
//! through the [`ItemDirectory`] trait so the backing source can be swapped
//! between the local authoritative table and the external product-master
//! mirror without the graph services noticing.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use shared::{validate_identifier, Item, ItemAttributes, ItemStage, PipelineOrder, TwistDirection};

use crate::error::{AppError, AppResult};

/// Read surface over item types
#[async_trait]
pub trait ItemDirectory: Send + Sync {
    /// Look up a single item; `None` when the id is unknown
    async fn find_item(&self, item_id: &str) -> AppResult<Option<Item>>;

    /// List items matching the query, in pipeline-rank order
    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>>;
}

/// Filter and ordering for item listings
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub item_type: Option<ItemStage>,
    pub order: PipelineOrder,
    pub search: Option<String>,
}

/// Item count per pipeline stage
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageCount {
    pub stage: ItemStage,
    pub count: usize,
}

/// Input for registering an item
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterItemInput {
    #[validate(length(min = 1, max = 64))]
    pub item_id: String,
    #[validate(length(min = 1, max = 200))]
    pub item_name: String,
    pub item_type: ItemStage,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    #[serde(default)]
    pub attributes: ItemAttributes,
}

/// Local-authoritative catalog over the `items` table
#[derive(Clone)]
pub struct CatalogService {
    db: SqlitePool,
}

/// Raw `items` row shared by the catalog and the BOM join queries
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub item_id: String,
    pub item_name: String,
    pub item_type: String,
    pub unit_of_measure: String,
    pub material_type: Option<String>,
    pub denier: Option<i64>,
    pub ps_ratio: Option<f64>,
    pub braid_structure: Option<String>,
    pub has_core: Option<bool>,
    pub color: Option<String>,
    pub length_m: Option<f64>,
    pub twist_type: Option<String>,
    pub knit_type: Option<String>,
    pub additional_attributes: Option<String>,
    pub source_system: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ItemRow {
    pub(crate) fn into_item(self) -> AppResult<Item> {
        let item_type = ItemStage::from_str(&self.item_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown item stage '{}' on item {}",
                self.item_type,
                self.item_id
            ))
        })?;

        let additional = match self.additional_attributes.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "corrupt attribute map on item {}: {}",
                    self.item_id,
                    e
                ))
            })?,
            None => Default::default(),
        };

        Ok(Item {
            item_id: self.item_id,
            item_name: self.item_name,
            item_type,
            unit_of_measure: self.unit_of_measure,
            attributes: ItemAttributes {
                material_type: self.material_type,
                denier: self.denier,
                ps_ratio: self.ps_ratio,
                braid_structure: self.braid_structure,
                has_core: self.has_core,
                color: self.color,
                length_m: self.length_m,
                twist_type: self.twist_type.as_deref().and_then(TwistDirection::from_str),
                knit_type: self.knit_type,
                additional,
            },
            source_system: self.source_system,
            created_at: self.created_at,
        })
    }
}

pub(crate) const ITEM_COLUMNS: &str = "item_id, item_name, item_type, unit_of_measure, \
     material_type, denier, ps_ratio, braid_structure, has_core, color, length_m, \
     twist_type, knit_type, additional_attributes, source_system, created_at";

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new item type
    ///
    /// Items are immutable after registration apart from attribute
    /// correction; they are never deleted, since BOM edges and lots keep
    /// referencing them.
    pub async fn register_item(&self, input: RegisterItemInput) -> AppResult<Item> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_identifier(&input.item_id).map_err(|msg| AppError::Validation {
            field: "item_id".to_string(),
            message: msg.to_string(),
            message_ja: "アイテムIDが正しくありません。".to_string(),
        })?;

        let additional_json = if input.attributes.additional.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&input.attributes.additional).map_err(|e| {
                AppError::ValidationError(format!("attribute map is not serializable: {e}"))
            })?)
        };

        // Uniqueness check and insert share one transaction
        let mut tx = self.db.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?1)")
                .bind(&input.item_id)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(AppError::DuplicateEntry("item_id".to_string()));
        }

        let created_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO items (
                item_id, item_name, item_type, unit_of_measure,
                material_type, denier, ps_ratio, braid_structure,
                has_core, color, length_m, twist_type, knit_type,
                additional_attributes, source_system, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&input.item_id)
        .bind(&input.item_name)
        .bind(input.item_type.as_str())
        .bind(&input.unit_of_measure)
        .bind(&input.attributes.material_type)
        .bind(input.attributes.denier)
        .bind(input.attributes.ps_ratio)
        .bind(&input.attributes.braid_structure)
        .bind(input.attributes.has_core)
        .bind(&input.attributes.color)
        .bind(input.attributes.length_m)
        .bind(input.attributes.twist_type.map(|t| t.as_str()))
        .bind(&input.attributes.knit_type)
        .bind(&additional_json)
        .bind(Option::<String>::None)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(item_id = %input.item_id, "Registered item");

        Ok(Item {
            item_id: input.item_id,
            item_name: input.item_name,
            item_type: input.item_type,
            unit_of_measure: input.unit_of_measure,
            attributes: input.attributes,
            source_system: None,
            created_at,
        })
    }

    /// Get an item by id, failing when it does not exist
    pub async fn get_item(&self, item_id: &str) -> AppResult<Item> {
        self.find_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item '{}'", item_id)))
    }

    /// Item counts per pipeline stage, in display order
    pub fn stage_statistics(items: &[Item]) -> Vec<StageCount> {
        ItemStage::ALL
            .iter()
            .map(|stage| StageCount {
                stage: *stage,
                count: items.iter().filter(|i| i.item_type == *stage).count(),
            })
            .collect()
    }
}

#[async_trait]
impl ItemDirectory for CatalogService {
    async fn find_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(ItemRow::into_item).transpose()
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let rows = match query.item_type {
            Some(stage) => {
                sqlx::query_as::<_, ItemRow>(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE item_type = ?1"
                ))
                .bind(stage.as_str())
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, ItemRow>(&format!("SELECT {ITEM_COLUMNS} FROM items"))
                    .fetch_all(&self.db)
                    .await?
            }
        };

        let mut items = rows
            .into_iter()
            .map(ItemRow::into_item)
            .collect::<AppResult<Vec<_>>>()?;

        if let Some(needle) = query.search.as_deref() {
            items.retain(|item| matches_search(item, needle));
        }

        sort_items(&mut items, query.order);
        Ok(items)
    }
}

/// Case-insensitive search across the fields operators actually scan for
fn matches_search(item: &Item, needle: &str) -> bool {
    let needle = needle.to_uppercase();
    let mut haystack = vec![item.item_name.clone()];
    if let Some(color) = &item.attributes.color {
        haystack.push(color.clone());
    }
    if let Some(material) = &item.attributes.material_type {
        haystack.push(material.clone());
    }
    for value in item.attributes.additional.values() {
        if let Some(s) = value.as_str() {
            haystack.push(s.to_string());
        }
    }
    haystack.join(" ").to_uppercase().contains(&needle)
}

fn sort_items(items: &mut [Item], order: PipelineOrder) {
    match order {
        PipelineOrder::Downstream => {
            items.sort_by(|a, b| {
                (a.item_type.rank(), &a.item_name).cmp(&(b.item_type.rank(), &b.item_name))
            });
        }
        PipelineOrder::Upstream => {
            items.sort_by(|a, b| {
                (Reverse(a.item_type.rank()), &a.item_name)
                    .cmp(&(Reverse(b.item_type.rank()), &b.item_name))
            });
        }
    }
}
