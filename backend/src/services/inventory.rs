//! Inventory ledger service
//!
//! Every quantity movement on a lot leaves an append-only ledger row with
//! `quantity_after = quantity_before + quantity_change`. The lot's
//! `current_quantity` is a denormalized projection of this ledger; both are
//! always written in the same transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use shared::{InventoryBalance, InventoryTransaction, LotStatus, TransactionType};

use crate::error::{AppError, AppResult};

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryService {
    db: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustInput {
    #[validate(length(min = 1, max = 16))]
    pub lot_id: String,
    /// Signed change; negative values remove stock
    pub quantity_change: f64,
    pub transaction_date: Option<NaiveDate>,
    pub operator_id: Option<String>,
    pub notes: Option<String>,
}

/// A ledger row to append, used by every service that moves stock
#[derive(Debug)]
pub(crate) struct NewTransaction<'a> {
    pub lot_id: &'a str,
    pub transaction_type: TransactionType,
    pub quantity_before: f64,
    pub quantity_change: f64,
    pub location: Option<&'a str>,
    pub operator_id: Option<&'a str>,
    pub equipment_id: Option<&'a str>,
    pub transaction_date: NaiveDate,
    pub notes: Option<&'a str>,
}

/// Append a ledger row inside the caller's transaction
///
/// `quantity_after` is derived here so the ledger invariant has a single
/// writer.
pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    txn: NewTransaction<'_>,
) -> AppResult<InventoryTransaction> {
    let id = Uuid::new_v4().to_string();
    let quantity_after = txn.quantity_before + txn.quantity_change;
    let created_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            id, lot_id, transaction_type, quantity_before, quantity_change,
            quantity_after, location, operator_id, equipment_id,
            transaction_date, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&id)
    .bind(txn.lot_id)
    .bind(txn.transaction_type.as_str())
    .bind(txn.quantity_before)
    .bind(txn.quantity_change)
    .bind(quantity_after)
    .bind(txn.location)
    .bind(txn.operator_id)
    .bind(txn.equipment_id)
    .bind(txn.transaction_date)
    .bind(txn.notes)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(InventoryTransaction {
        id,
        lot_id: txn.lot_id.to_string(),
        transaction_type: txn.transaction_type,
        quantity_before: txn.quantity_before,
        quantity_change: txn.quantity_change,
        quantity_after,
        location: txn.location.map(String::from),
        operator_id: txn.operator_id.map(String::from),
        equipment_id: txn.equipment_id.map(String::from),
        transaction_date: txn.transaction_date,
        notes: txn.notes.map(String::from),
        created_at,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    lot_id: String,
    transaction_type: String,
    quantity_before: f64,
    quantity_change: f64,
    quantity_after: f64,
    location: Option<String>,
    operator_id: Option<String>,
    equipment_id: Option<String>,
    transaction_date: NaiveDate,
    notes: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> AppResult<InventoryTransaction> {
        let transaction_type = TransactionType::from_str(&self.transaction_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown transaction type '{}' on row {}",
                self.transaction_type,
                self.id
            ))
        })?;
        Ok(InventoryTransaction {
            id: self.id,
            lot_id: self.lot_id,
            transaction_type,
            quantity_before: self.quantity_before,
            quantity_change: self.quantity_change,
            quantity_after: self.quantity_after,
            location: self.location,
            operator_id: self.operator_id,
            equipment_id: self.equipment_id,
            transaction_date: self.transaction_date,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        Self { db, write_lock }
    }

    /// Ledger rows for a lot, newest first
    pub async fn transactions_for_lot(&self, lot_id: &str) -> AppResult<Vec<InventoryTransaction>> {
        let lot_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lots WHERE lot_id = ?1)")
                .bind(lot_id)
                .fetch_one(&self.db)
                .await?;
        if !lot_exists {
            return Err(AppError::NotFound(format!("Lot '{}'", lot_id)));
        }

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, lot_id, transaction_type, quantity_before, quantity_change,
                   quantity_after, location, operator_id, equipment_id,
                   transaction_date, notes, created_at
            FROM inventory_transactions
            WHERE lot_id = ?1
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(TransactionRow::into_transaction)
            .collect()
    }

    /// Reconstruct a lot's balance from its ledger rows
    pub async fn balance(&self, lot_id: &str) -> AppResult<InventoryBalance> {
        let row: Option<(f64, f64)> = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN quantity_change > 0 THEN quantity_change ELSE 0.0 END), 0.0),
                COALESCE(SUM(CASE WHEN quantity_change < 0 THEN -quantity_change ELSE 0.0 END), 0.0)
            FROM inventory_transactions
            WHERE lot_id = ?1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?;

        let lot_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lots WHERE lot_id = ?1)")
                .bind(lot_id)
                .fetch_one(&self.db)
                .await?;
        if !lot_exists {
            return Err(AppError::NotFound(format!("Lot '{}'", lot_id)));
        }

        let (total_in, total_out) = row.unwrap_or((0.0, 0.0));
        Ok(InventoryBalance {
            lot_id: lot_id.to_string(),
            total_in,
            total_out,
            balance: total_in - total_out,
        })
    }

    /// Manually adjust a lot's stock, ledger row included
    pub async fn adjust(&self, input: AdjustInput) -> AppResult<InventoryTransaction> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if !input.quantity_change.is_finite() || input.quantity_change == 0.0 {
            return Err(AppError::Validation {
                field: "quantity_change".to_string(),
                message: "Adjustment must be a non-zero number".to_string(),
                message_ja: "調整数量は0以外の数値で入力してください。".to_string(),
            });
        }

        // Balance read and update must not interleave with other writers
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let lot: Option<(f64, String)> =
            sqlx::query_as("SELECT current_quantity, lot_status FROM lots WHERE lot_id = ?1")
                .bind(&input.lot_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (current_quantity, status) = match lot {
            Some(row) => row,
            None => return Err(AppError::NotFound(format!("Lot '{}'", input.lot_id))),
        };

        let status = LotStatus::from_str(&status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown lot status '{}'", status))
        })?;
        if status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is {} and cannot be adjusted",
                input.lot_id, status
            )));
        }

        let new_balance = current_quantity + input.quantity_change;
        if new_balance < 0.0 {
            return Err(AppError::InsufficientQuantity(format!(
                "lot {} holds {}, adjustment of {} would go negative",
                input.lot_id, current_quantity, input.quantity_change
            )));
        }

        let transaction = insert_transaction(
            &mut tx,
            NewTransaction {
                lot_id: &input.lot_id,
                transaction_type: TransactionType::Adjustment,
                quantity_before: current_quantity,
                quantity_change: input.quantity_change,
                location: None,
                operator_id: input.operator_id.as_deref(),
                equipment_id: None,
                transaction_date: input
                    .transaction_date
                    .unwrap_or_else(|| Utc::now().date_naive()),
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        let new_status = if new_balance == 0.0 {
            LotStatus::Consumed
        } else {
            LotStatus::Active
        };
        sqlx::query("UPDATE lots SET current_quantity = ?1, lot_status = ?2 WHERE lot_id = ?3")
            .bind(new_balance)
            .bind(new_status.as_str())
            .bind(&input.lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lot_id = %input.lot_id,
            change = input.quantity_change,
            balance = new_balance,
            "Adjusted lot stock"
        );

        Ok(transaction)
    }

    /// Verify that every lot's cached balance matches its ledger
    ///
    /// Returns the ids of lots whose projection has drifted. Intended for
    /// operational audits; a healthy database returns an empty list.
    pub async fn audit_balances(&self) -> AppResult<Vec<String>> {
        let rows: Vec<(String, f64, f64)> = sqlx::query_as(
            r#"
            SELECT l.lot_id, l.current_quantity,
                   COALESCE((SELECT SUM(quantity_change) FROM inventory_transactions t
                             WHERE t.lot_id = l.lot_id), 0.0)
            FROM lots l
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut drifted: Vec<String> = rows
            .into_iter()
            .filter(|(_, cached, ledger)| (cached - ledger).abs() > 1e-9)
            .map(|(lot_id, _, _)| lot_id)
            .collect();
        drifted.sort();
        Ok(drifted)
    }
}
