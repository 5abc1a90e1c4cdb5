//! Lot ledger service
//!
//! Lots are concrete, quantity-bounded production batches. Creation writes
//! the lot row and its RECEIPT ledger entry in one transaction; lot-id
//! generation and creation serialize behind the shared write lock because
//! the sequence scan is a read-modify-write.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use validator::Validate;

use shared::{
    format_lot_id, parse_lot_sequence, validate_process_code, validate_quantity, ItemStage, Lot,
    LotDetail, LotStatus, TransactionType,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{insert_transaction, NewTransaction};

/// Lot ledger service
#[derive(Clone)]
pub struct LotService {
    db: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

/// Input for creating a lot
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLotInput {
    #[validate(length(min = 1, max = 64))]
    pub item_id: String,
    #[validate(length(min = 1, max = 1))]
    pub process_code: String,
    pub planned_quantity: f64,
    pub production_date: Option<NaiveDate>,
    pub actual_quantity: Option<f64>,
    /// Defaults to grade "A"
    pub quality_grade: Option<String>,
    pub equipment_id: Option<String>,
    pub operator_id: Option<String>,
    pub location: Option<String>,
    pub measured_length: Option<f64>,
    pub measured_weight: Option<f64>,
    pub measurement_notes: Option<String>,
}

/// Filters for the lot overview listing
#[derive(Debug, Clone, Default)]
pub struct LotListQuery {
    pub status: Option<LotStatus>,
    pub process_code: Option<String>,
    pub item_type: Option<ItemStage>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LotDetailRow {
    lot_id: String,
    item_id: String,
    process_code: String,
    production_date: NaiveDate,
    planned_quantity: f64,
    actual_quantity: Option<f64>,
    current_quantity: f64,
    quality_grade: String,
    lot_status: String,
    equipment_id: Option<String>,
    operator_id: Option<String>,
    location: Option<String>,
    measured_length: Option<f64>,
    measured_weight: Option<f64>,
    measurement_notes: Option<String>,
    created_at: chrono::DateTime<Utc>,
    item_name: String,
    item_type: String,
    unit_of_measure: String,
    process_name: String,
    process_level: i64,
    grade_name: Option<String>,
}

pub(crate) const LOT_DETAIL_SELECT: &str = r#"
    SELECT l.lot_id, l.item_id, l.process_code, l.production_date,
           l.planned_quantity, l.actual_quantity, l.current_quantity,
           l.quality_grade, l.lot_status, l.equipment_id, l.operator_id,
           l.location, l.measured_length, l.measured_weight,
           l.measurement_notes, l.created_at,
           i.item_name, i.item_type, i.unit_of_measure,
           p.process_name, p.process_level,
           q.grade_name
    FROM lots l
    JOIN items i ON i.item_id = l.item_id
    JOIN process_steps p ON p.process_code = l.process_code
    LEFT JOIN quality_grades q ON q.grade_code = l.quality_grade
"#;

impl LotDetailRow {
    pub(crate) fn into_detail(self) -> AppResult<LotDetail> {
        let item_type = ItemStage::from_str(&self.item_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown item stage '{}' on lot {}",
                self.item_type,
                self.lot_id
            ))
        })?;
        let lot_status = LotStatus::from_str(&self.lot_status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "unknown lot status '{}' on lot {}",
                self.lot_status,
                self.lot_id
            ))
        })?;

        Ok(LotDetail {
            lot: Lot {
                lot_id: self.lot_id,
                item_id: self.item_id,
                process_code: self.process_code,
                production_date: self.production_date,
                planned_quantity: self.planned_quantity,
                actual_quantity: self.actual_quantity,
                current_quantity: self.current_quantity,
                quality_grade: self.quality_grade,
                lot_status,
                equipment_id: self.equipment_id,
                operator_id: self.operator_id,
                location: self.location,
                measured_length: self.measured_length,
                measured_weight: self.measured_weight,
                measurement_notes: self.measurement_notes,
                created_at: self.created_at,
            },
            item_name: self.item_name,
            item_type,
            unit_of_measure: self.unit_of_measure,
            process_name: self.process_name,
            process_level: self.process_level,
            grade_name: self.grade_name,
        })
    }
}

/// Fetch a lot joined with its reference data
pub(crate) async fn fetch_lot_detail(
    db: &SqlitePool,
    lot_id: &str,
) -> AppResult<Option<LotDetail>> {
    let row = sqlx::query_as::<_, LotDetailRow>(&format!(
        "{LOT_DETAIL_SELECT} WHERE l.lot_id = ?1"
    ))
    .bind(lot_id)
    .fetch_optional(db)
    .await?;

    row.map(LotDetailRow::into_detail).transpose()
}

/// Next lot id for the (YYMM, process) bucket
///
/// Scans existing ids matching the prefix and takes max sequence + 1. The
/// caller must hold the write lock for the scan-then-insert to be safe.
async fn next_lot_id(
    conn: &mut SqliteConnection,
    process_code: &str,
    production_date: NaiveDate,
) -> AppResult<String> {
    let prefix = format!("{}{}", production_date.format("%y%m"), process_code);

    let existing: Vec<String> = sqlx::query_scalar("SELECT lot_id FROM lots WHERE lot_id LIKE ?1")
        .bind(format!("{prefix}%"))
        .fetch_all(&mut *conn)
        .await?;

    let next = existing
        .iter()
        .filter_map(|id| parse_lot_sequence(id, &prefix))
        .max()
        .unwrap_or(0)
        + 1;

    Ok(format_lot_id(production_date, process_code, next))
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        Self { db, write_lock }
    }

    /// Generate the next lot id without creating a lot
    pub async fn generate_lot_id(
        &self,
        process_code: &str,
        production_date: NaiveDate,
    ) -> AppResult<String> {
        validate_process_code(process_code).map_err(|msg| AppError::Validation {
            field: "process_code".to_string(),
            message: msg.to_string(),
            message_ja: "工程コードが正しくありません。".to_string(),
        })?;

        let _guard = self.write_lock.lock().await;
        let mut conn = self.db.acquire().await?;
        next_lot_id(&mut conn, process_code, production_date).await
    }

    /// Create a lot and its RECEIPT ledger row atomically
    pub async fn create_lot(&self, input: CreateLotInput) -> AppResult<Lot> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_process_code(&input.process_code).map_err(|msg| AppError::Validation {
            field: "process_code".to_string(),
            message: msg.to_string(),
            message_ja: "工程コードが正しくありません。".to_string(),
        })?;
        validate_quantity(input.planned_quantity).map_err(|msg| AppError::Validation {
            field: "planned_quantity".to_string(),
            message: msg.to_string(),
            message_ja: "予定数量は正の数値で入力してください。".to_string(),
        })?;
        if let Some(actual) = input.actual_quantity {
            validate_quantity(actual).map_err(|msg| AppError::Validation {
                field: "actual_quantity".to_string(),
                message: msg.to_string(),
                message_ja: "実績数量は正の数値で入力してください。".to_string(),
            })?;
        }

        let production_date = input
            .production_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let quality_grade = input.quality_grade.clone().unwrap_or_else(|| "A".to_string());

        // Id generation and the two inserts form one critical section
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let item_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?1)")
                .bind(&input.item_id)
                .fetch_one(&mut *tx)
                .await?;
        if !item_exists {
            return Err(AppError::NotFound(format!("Item '{}'", input.item_id)));
        }

        let process_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM process_steps WHERE process_code = ?1)",
        )
        .bind(&input.process_code)
        .fetch_one(&mut *tx)
        .await?;
        if !process_exists {
            return Err(AppError::Validation {
                field: "process_code".to_string(),
                message: format!("Unknown process code '{}'", input.process_code),
                message_ja: format!("工程コード「{}」は登録されていません。", input.process_code),
            });
        }

        let grade_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quality_grades WHERE grade_code = ?1)")
                .bind(&quality_grade)
                .fetch_one(&mut *tx)
                .await?;
        if !grade_exists {
            return Err(AppError::Validation {
                field: "quality_grade".to_string(),
                message: format!("Unknown quality grade '{}'", quality_grade),
                message_ja: format!("品質グレード「{}」は登録されていません。", quality_grade),
            });
        }

        let lot_id = next_lot_id(&mut tx, &input.process_code, production_date).await?;
        let initial_quantity = input.actual_quantity.unwrap_or(input.planned_quantity);
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO lots (
                lot_id, item_id, process_code, production_date,
                planned_quantity, actual_quantity, current_quantity,
                quality_grade, lot_status, equipment_id, operator_id,
                location, measured_length, measured_weight,
                measurement_notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&lot_id)
        .bind(&input.item_id)
        .bind(&input.process_code)
        .bind(production_date)
        .bind(input.planned_quantity)
        .bind(input.actual_quantity)
        .bind(initial_quantity)
        .bind(&quality_grade)
        .bind(LotStatus::Active.as_str())
        .bind(&input.equipment_id)
        .bind(&input.operator_id)
        .bind(&input.location)
        .bind(input.measured_length)
        .bind(input.measured_weight)
        .bind(&input.measurement_notes)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            NewTransaction {
                lot_id: &lot_id,
                transaction_type: TransactionType::Receipt,
                quantity_before: 0.0,
                quantity_change: initial_quantity,
                location: input.location.as_deref(),
                operator_id: input.operator_id.as_deref(),
                equipment_id: input.equipment_id.as_deref(),
                transaction_date: production_date,
                notes: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(lot_id = %lot_id, item_id = %input.item_id, "Created lot");

        Ok(Lot {
            lot_id,
            item_id: input.item_id,
            process_code: input.process_code,
            production_date,
            planned_quantity: input.planned_quantity,
            actual_quantity: input.actual_quantity,
            current_quantity: initial_quantity,
            quality_grade,
            lot_status: LotStatus::Active,
            equipment_id: input.equipment_id,
            operator_id: input.operator_id,
            location: input.location,
            measured_length: input.measured_length,
            measured_weight: input.measured_weight,
            measurement_notes: input.measurement_notes,
            created_at,
        })
    }

    /// Get a lot with its item, process, and grade reference data
    pub async fn get_lot(&self, lot_id: &str) -> AppResult<LotDetail> {
        fetch_lot_detail(&self.db, lot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lot '{}'", lot_id)))
    }

    /// Lots of an item, newest production first
    pub async fn list_lots_by_item(
        &self,
        item_id: &str,
        status: Option<LotStatus>,
    ) -> AppResult<Vec<LotDetail>> {
        let rows = sqlx::query_as::<_, LotDetailRow>(&format!(
            "{LOT_DETAIL_SELECT} WHERE l.item_id = ?1 \
             ORDER BY l.production_date DESC, l.lot_id DESC"
        ))
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        let mut lots = rows
            .into_iter()
            .map(LotDetailRow::into_detail)
            .collect::<AppResult<Vec<_>>>()?;
        if let Some(status) = status {
            lots.retain(|l| l.lot.lot_status == status);
        }
        Ok(lots)
    }

    /// Lot overview, newest creation first, capped at the query limit
    pub async fn list_lots(&self, query: &LotListQuery) -> AppResult<Vec<LotDetail>> {
        let limit = query.limit.unwrap_or(100).clamp(1, 1000);

        let rows = sqlx::query_as::<_, LotDetailRow>(&format!(
            "{LOT_DETAIL_SELECT} ORDER BY l.created_at DESC, l.lot_id DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut lots = rows
            .into_iter()
            .map(LotDetailRow::into_detail)
            .collect::<AppResult<Vec<_>>>()?;

        if let Some(status) = query.status {
            lots.retain(|l| l.lot.lot_status == status);
        }
        if let Some(process) = query.process_code.as_deref() {
            lots.retain(|l| l.lot.process_code == process);
        }
        if let Some(stage) = query.item_type {
            lots.retain(|l| l.item_type == stage);
        }
        if let Some(needle) = query.search.as_deref() {
            let needle = needle.to_uppercase();
            lots.retain(|l| {
                l.lot.lot_id.to_uppercase().contains(&needle)
                    || l.item_name.to_uppercase().contains(&needle)
            });
        }

        Ok(lots)
    }

    /// Administratively cancel an active lot
    pub async fn cancel_lot(&self, lot_id: &str) -> AppResult<LotDetail> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT lot_status FROM lots WHERE lot_id = ?1")
                .bind(lot_id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or_else(|| AppError::NotFound(format!("Lot '{}'", lot_id)))?;
        let status = LotStatus::from_str(&status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown lot status '{}'", status))
        })?;
        if status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "lot {} is already {}",
                lot_id, status
            )));
        }

        sqlx::query("UPDATE lots SET lot_status = ?1 WHERE lot_id = ?2")
            .bind(LotStatus::Cancelled.as_str())
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(lot_id = %lot_id, "Cancelled lot");

        self.get_lot(lot_id).await
    }
}
