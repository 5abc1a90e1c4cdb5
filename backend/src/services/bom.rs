//! BOM graph service
//!
//! Maintains the directed acyclic recipe graph over item types and expands
//! it into component trees. Edge insertion keeps the graph acyclic; the
//! expansion depth cap is only a safety net on top of that.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_recursion::async_recursion;
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use shared::{validate_quantity, BomBranch, BomComponent, BomNode};

use crate::error::{AppError, AppResult};
use crate::services::catalog::{ItemDirectory, ItemRow};

/// Default expansion depth cap
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// BOM graph service
#[derive(Clone)]
pub struct BomService {
    db: SqlitePool,
    directory: Arc<dyn ItemDirectory>,
}

/// Input for adding a BOM edge
#[derive(Debug, Deserialize, Validate)]
pub struct AddComponentInput {
    #[validate(length(min = 1, max = 64))]
    pub parent_item_id: String,
    #[validate(length(min = 1, max = 64))]
    pub component_item_id: String,
    pub quantity: f64,
    #[validate(length(min = 1, max = 50))]
    pub usage_type: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ComponentRow {
    quantity: f64,
    usage_type: String,
    #[sqlx(flatten)]
    item: ItemRow,
}

impl BomService {
    /// Create a new BomService instance
    pub fn new(db: SqlitePool, directory: Arc<dyn ItemDirectory>) -> Self {
        Self { db, directory }
    }

    /// Add a component edge to the BOM graph
    pub async fn add_component(&self, input: AddComponentInput) -> AppResult<()> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_ja: "数量は正の数値で入力してください。".to_string(),
        })?;

        if input.parent_item_id == input.component_item_id {
            return Err(AppError::Validation {
                field: "component_item_id".to_string(),
                message: "Parent and component items cannot be the same".to_string(),
                message_ja: "親アイテムと構成部品アイテムは同じにできません。".to_string(),
            });
        }

        // Endpoint, duplicate, and cycle checks run in the same transaction
        // as the insert
        let mut tx = self.db.begin().await?;

        for (field, item_id) in [
            ("parent_item_id", &input.parent_item_id),
            ("component_item_id", &input.component_item_id),
        ] {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?1)")
                    .bind(item_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                tracing::warn!(field, item_id = %item_id, "BOM edge references unknown item");
                return Err(AppError::NotFound(format!("Item '{}'", item_id)));
            }
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bom_components \
             WHERE parent_item_id = ?1 AND component_item_id = ?2 AND usage_type = ?3)",
        )
        .bind(&input.parent_item_id)
        .bind(&input.component_item_id)
        .bind(&input.usage_type)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::DuplicateEntry("bom_component".to_string()));
        }

        let edges: Vec<(String, String)> =
            sqlx::query_as("SELECT parent_item_id, component_item_id FROM bom_components")
                .fetch_all(&mut *tx)
                .await?;
        if creates_cycle(&edges, &input.parent_item_id, &input.component_item_id) {
            return Err(AppError::CircularReference(format!(
                "'{}' already contains '{}' somewhere below it",
                input.component_item_id, input.parent_item_id
            )));
        }

        sqlx::query(
            "INSERT INTO bom_components \
             (parent_item_id, component_item_id, quantity, usage_type, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&input.parent_item_id)
        .bind(&input.component_item_id)
        .bind(input.quantity)
        .bind(&input.usage_type)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            parent = %input.parent_item_id,
            component = %input.component_item_id,
            quantity = input.quantity,
            usage = %input.usage_type,
            "Added BOM edge"
        );

        Ok(())
    }

    /// Direct components of a parent item, ordered by usage then name
    pub async fn direct_components(&self, parent_item_id: &str) -> AppResult<Vec<BomComponent>> {
        let rows = sqlx::query_as::<_, ComponentRow>(
            r#"
            SELECT bc.quantity, bc.usage_type, i.*
            FROM bom_components bc
            JOIN items i ON i.item_id = bc.component_item_id
            WHERE bc.parent_item_id = ?1
            ORDER BY bc.usage_type, i.item_name
            "#,
        )
        .bind(parent_item_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(BomComponent {
                    quantity: row.quantity,
                    usage_type: row.usage_type,
                    item: row.item.into_item()?,
                })
            })
            .collect()
    }

    /// Expand the multi-level BOM below an item into a tree
    ///
    /// Expansion is best-effort: a component whose item record has gone
    /// missing drops that branch and keeps the rest of the tree, so one bad
    /// product-master row cannot blank the whole view.
    pub async fn expand(&self, root_item_id: &str, max_depth: u32) -> AppResult<BomNode> {
        self.expand_node(root_item_id, 0, max_depth)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item '{}'", root_item_id)))
    }

    #[async_recursion]
    async fn expand_node(
        &self,
        item_id: &str,
        depth: u32,
        max_depth: u32,
    ) -> AppResult<Option<BomNode>> {
        let item = match self.directory.find_item(item_id).await? {
            Some(item) => item,
            None => return Ok(None),
        };

        if depth >= max_depth {
            return Ok(Some(BomNode {
                item,
                components: Vec::new(),
            }));
        }

        let mut components = Vec::new();
        for entry in self.direct_components(item_id).await? {
            if let Some(sub) = self
                .expand_node(&entry.item.item_id, depth + 1, max_depth)
                .await?
            {
                components.push(BomBranch {
                    quantity: entry.quantity,
                    usage_type: entry.usage_type,
                    item: sub.item,
                    components: sub.components,
                });
            }
        }

        Ok(Some(BomNode { item, components }))
    }
}

/// Would inserting the edge parent -> component close a cycle?
///
/// True when the parent is already reachable from the component by following
/// existing parent -> component edges downward.
fn creates_cycle(edges: &[(String, String)], parent: &str, component: &str) -> bool {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for (p, c) in edges {
        children.entry(p.as_str()).or_default().push(c.as_str());
    }

    let mut stack = vec![component];
    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == parent {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = children.get(current) {
            stack.extend(next.iter().copied());
        }
    }
    false
}
