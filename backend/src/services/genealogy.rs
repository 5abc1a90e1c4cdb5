//! Lot genealogy service
//!
//! Records which lots were physically consumed into which, and walks the
//! resulting graph in both directions. An edge always moves stock: edge
//! insert, CONSUMPTION ledger row, and balance update are one transaction.

use std::collections::HashSet;
use std::sync::Arc;

use async_recursion::async_recursion;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use shared::{
    validate_quantity, GenealogyEdge, GenealogyLink, GenealogyNode, LotDetail, LotStatus,
    TraceDirection, TransactionType,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{insert_transaction, NewTransaction};
use crate::services::lot::{fetch_lot_detail, LotDetailRow, LOT_DETAIL_SELECT};

/// Default traversal depth cap
pub const DEFAULT_TRACE_DEPTH: u32 = 10;

/// Lot genealogy service
#[derive(Clone)]
pub struct GenealogyService {
    db: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

/// Input for consuming a child lot into a parent lot
#[derive(Debug, Deserialize, Validate)]
pub struct ConsumeInput {
    #[validate(length(min = 1, max = 16))]
    pub parent_lot_id: String,
    #[validate(length(min = 1, max = 16))]
    pub child_lot_id: String,
    pub consumed_quantity: f64,
    #[validate(length(min = 1, max = 50))]
    pub usage_type: String,
    pub consumption_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct EdgeRow {
    id: String,
    parent_lot_id: String,
    child_lot_id: String,
    consumed_quantity: f64,
    consumption_rate: f64,
    process_code: String,
    consumption_date: NaiveDate,
    usage_type: String,
    notes: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

impl EdgeRow {
    fn into_edge(self) -> GenealogyEdge {
        GenealogyEdge {
            id: self.id,
            parent_lot_id: self.parent_lot_id,
            child_lot_id: self.child_lot_id,
            consumed_quantity: self.consumed_quantity,
            consumption_rate: self.consumption_rate,
            process_code: self.process_code,
            consumption_date: self.consumption_date,
            usage_type: self.usage_type,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

const EDGE_COLUMNS: &str = "id, parent_lot_id, child_lot_id, consumed_quantity, \
     consumption_rate, process_code, consumption_date, usage_type, notes, created_at";

impl GenealogyService {
    /// Create a new GenealogyService instance
    pub fn new(db: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        Self { db, write_lock }
    }

    /// Record that material from the child lot went into the parent lot
    ///
    /// Atomically: read the child's balance, fix the consumption rate,
    /// insert the edge, append the CONSUMPTION ledger row, and decrement
    /// the child's balance. A lot that reaches zero closes as `consumed`.
    pub async fn consume(&self, input: ConsumeInput) -> AppResult<GenealogyEdge> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_quantity(input.consumed_quantity).map_err(|msg| AppError::Validation {
            field: "consumed_quantity".to_string(),
            message: msg.to_string(),
            message_ja: "消費数量は正の数値で入力してください。".to_string(),
        })?;
        if input.parent_lot_id == input.child_lot_id {
            return Err(AppError::Validation {
                field: "child_lot_id".to_string(),
                message: "A lot cannot be consumed into itself".to_string(),
                message_ja: "同一ロットへの投入はできません。".to_string(),
            });
        }

        // Balance read through balance update form one critical section
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let parent: Option<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT l.process_code, p.process_level, l.lot_status
            FROM lots l
            JOIN process_steps p ON p.process_code = l.process_code
            WHERE l.lot_id = ?1
            "#,
        )
        .bind(&input.parent_lot_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (parent_process, parent_level, _parent_status) = parent.ok_or_else(|| {
            AppError::NotFound(format!("Parent lot '{}'", input.parent_lot_id))
        })?;

        let child: Option<(f64, i64, String)> = sqlx::query_as(
            r#"
            SELECT l.current_quantity, p.process_level, l.lot_status
            FROM lots l
            JOIN process_steps p ON p.process_code = l.process_code
            WHERE l.lot_id = ?1
            "#,
        )
        .bind(&input.child_lot_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (balance, child_level, child_status) = child.ok_or_else(|| {
            AppError::NotFound(format!("Child lot '{}'", input.child_lot_id))
        })?;

        let child_status = LotStatus::from_str(&child_status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown lot status '{}'", child_status))
        })?;
        if child_status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is {} and cannot be consumed",
                input.child_lot_id, child_status
            )));
        }

        // Material only flows downstream
        if parent_level <= child_level {
            return Err(AppError::Validation {
                field: "parent_lot_id".to_string(),
                message: format!(
                    "parent lot {} is not downstream of child lot {}",
                    input.parent_lot_id, input.child_lot_id
                ),
                message_ja: "投入先ロットはより後工程のロットである必要があります。".to_string(),
            });
        }

        if input.consumed_quantity > balance {
            return Err(AppError::InsufficientQuantity(format!(
                "lot {} holds {}, cannot consume {}",
                input.child_lot_id, balance, input.consumed_quantity
            )));
        }

        let consumption_rate = if balance > 0.0 {
            input.consumed_quantity * 100.0 / balance
        } else {
            0.0
        };
        let consumption_date = input
            .consumption_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let edge_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO lot_genealogy (
                id, parent_lot_id, child_lot_id, consumed_quantity,
                consumption_rate, process_code, consumption_date,
                usage_type, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&edge_id)
        .bind(&input.parent_lot_id)
        .bind(&input.child_lot_id)
        .bind(input.consumed_quantity)
        .bind(consumption_rate)
        .bind(&parent_process)
        .bind(consumption_date)
        .bind(&input.usage_type)
        .bind(&input.notes)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let ledger_note = format!("consumed into {}", input.parent_lot_id);
        insert_transaction(
            &mut tx,
            NewTransaction {
                lot_id: &input.child_lot_id,
                transaction_type: TransactionType::Consumption,
                quantity_before: balance,
                quantity_change: -input.consumed_quantity,
                location: None,
                operator_id: None,
                equipment_id: None,
                transaction_date: consumption_date,
                notes: Some(ledger_note.as_str()),
            },
        )
        .await?;

        let new_balance = balance - input.consumed_quantity;
        let new_status = if new_balance <= 0.0 {
            LotStatus::Consumed
        } else {
            LotStatus::Active
        };
        sqlx::query("UPDATE lots SET current_quantity = ?1, lot_status = ?2 WHERE lot_id = ?3")
            .bind(new_balance)
            .bind(new_status.as_str())
            .bind(&input.child_lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            parent = %input.parent_lot_id,
            child = %input.child_lot_id,
            consumed = input.consumed_quantity,
            rate = consumption_rate,
            "Recorded lot consumption"
        );

        Ok(GenealogyEdge {
            id: edge_id,
            parent_lot_id: input.parent_lot_id,
            child_lot_id: input.child_lot_id,
            consumed_quantity: input.consumed_quantity,
            consumption_rate,
            process_code: parent_process,
            consumption_date,
            usage_type: input.usage_type,
            notes: input.notes,
            created_at,
        })
    }

    /// Walk the genealogy graph from a lot
    ///
    /// Forward answers "what did this lot become", backward answers "what
    /// went into this lot". Cycles cannot be written through `consume`, but
    /// recorded production data may still contain them, so each path keeps
    /// a visited set and a depth cap.
    pub async fn trace(
        &self,
        lot_id: &str,
        direction: TraceDirection,
        max_depth: u32,
    ) -> AppResult<GenealogyNode> {
        let visited = HashSet::new();
        self.build_node(lot_id, direction, &visited, 0, max_depth, None)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lot '{}'", lot_id)))
    }

    #[async_recursion]
    async fn build_node(
        &self,
        lot_id: &str,
        direction: TraceDirection,
        visited: &HashSet<String>,
        depth: u32,
        max_depth: u32,
        edge: Option<GenealogyLink>,
    ) -> AppResult<Option<GenealogyNode>> {
        if depth >= max_depth || visited.contains(lot_id) {
            return Ok(None);
        }

        let lot = match fetch_lot_detail(&self.db, lot_id).await? {
            Some(detail) => detail,
            None => return Ok(None),
        };

        // Each sibling branch walks with its own copy of the path set
        let mut visited = visited.clone();
        visited.insert(lot_id.to_string());

        let sql = match direction {
            TraceDirection::Forward => format!(
                "SELECT {EDGE_COLUMNS} FROM lot_genealogy \
                 WHERE child_lot_id = ?1 ORDER BY created_at"
            ),
            TraceDirection::Backward => format!(
                "SELECT {EDGE_COLUMNS} FROM lot_genealogy \
                 WHERE parent_lot_id = ?1 ORDER BY created_at"
            ),
        };
        let edges = sqlx::query_as::<_, EdgeRow>(&sql)
            .bind(lot_id)
            .fetch_all(&self.db)
            .await?;

        let mut children = Vec::new();
        for row in edges {
            let next_id = match direction {
                TraceDirection::Forward => row.parent_lot_id.clone(),
                TraceDirection::Backward => row.child_lot_id.clone(),
            };
            let link = GenealogyLink {
                consumed_quantity: row.consumed_quantity,
                consumption_rate: row.consumption_rate,
                usage_type: row.usage_type.clone(),
                consumption_date: row.consumption_date,
            };
            if let Some(node) = self
                .build_node(&next_id, direction, &visited, depth + 1, max_depth, Some(link))
                .await?
            {
                children.push(node);
            }
        }

        Ok(Some(GenealogyNode {
            lot,
            edge,
            children,
        }))
    }

    /// Edges where the lot is the parent: the material that went into it
    pub async fn consumed_materials(&self, parent_lot_id: &str) -> AppResult<Vec<GenealogyEdge>> {
        let rows = sqlx::query_as::<_, EdgeRow>(&format!(
            "SELECT {EDGE_COLUMNS} FROM lot_genealogy \
             WHERE parent_lot_id = ?1 ORDER BY consumption_date DESC, created_at DESC"
        ))
        .bind(parent_lot_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(EdgeRow::into_edge).collect())
    }

    /// Edges where the lot is the child: the lots it was consumed into
    pub async fn consumers(&self, child_lot_id: &str) -> AppResult<Vec<GenealogyEdge>> {
        let rows = sqlx::query_as::<_, EdgeRow>(&format!(
            "SELECT {EDGE_COLUMNS} FROM lot_genealogy \
             WHERE child_lot_id = ?1 ORDER BY consumption_date DESC, created_at DESC"
        ))
        .bind(child_lot_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(EdgeRow::into_edge).collect())
    }

    /// Active downstream lots the given lot could be consumed into
    pub async fn candidate_parents(&self, child_lot_id: &str) -> AppResult<Vec<LotDetail>> {
        let child_level: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT p.process_level
            FROM lots l
            JOIN process_steps p ON p.process_code = l.process_code
            WHERE l.lot_id = ?1
            "#,
        )
        .bind(child_lot_id)
        .fetch_optional(&self.db)
        .await?;
        let child_level =
            child_level.ok_or_else(|| AppError::NotFound(format!("Lot '{}'", child_lot_id)))?;

        let rows = sqlx::query_as::<_, LotDetailRow>(&format!(
            "{LOT_DETAIL_SELECT} \
             WHERE l.lot_status = 'active' AND p.process_level > ?1 AND l.current_quantity > 0 \
             ORDER BY p.process_level, l.production_date DESC"
        ))
        .bind(child_level)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LotDetailRow::into_detail).collect()
    }
}
