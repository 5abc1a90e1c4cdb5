//! Inventory ledger models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An append-only inventory ledger row for a lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: String,
    pub lot_id: String,
    pub transaction_type: TransactionType,
    pub quantity_before: f64,
    /// Signed change; receipts positive, consumptions negative
    pub quantity_change: f64,
    pub quantity_after: f64,
    pub location: Option<String>,
    pub operator_id: Option<String>,
    pub equipment_id: Option<String>,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Types of inventory transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Initial stock-in at lot creation
    Receipt,
    /// Material drawn into a downstream lot
    Consumption,
    /// Manual correction
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receipt => "RECEIPT",
            TransactionType::Consumption => "CONSUMPTION",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RECEIPT" => Some(TransactionType::Receipt),
            "CONSUMPTION" => Some(TransactionType::Consumption),
            "ADJUSTMENT" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }
}

/// Balance reconstructed from a lot's ledger rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryBalance {
    pub lot_id: String,
    pub total_in: f64,
    pub total_out: f64,
    pub balance: f64,
}
