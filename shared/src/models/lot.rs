//! Production lot models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ItemStage;

/// A concrete production batch of one item type at one process step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Lot identifier, e.g. "2505P001" (YYMM + process letter + sequence)
    pub lot_id: String,
    pub item_id: String,
    pub process_code: String,
    pub production_date: NaiveDate,
    pub planned_quantity: f64,
    pub actual_quantity: Option<f64>,
    /// Remaining balance; only ever decreases after creation
    pub current_quantity: f64,
    pub quality_grade: String,
    pub lot_status: LotStatus,
    pub equipment_id: Option<String>,
    pub operator_id: Option<String>,
    pub location: Option<String>,
    pub measured_length: Option<f64>,
    pub measured_weight: Option<f64>,
    pub measurement_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A lot joined with its item, process, and grade reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDetail {
    #[serde(flatten)]
    pub lot: Lot,
    pub item_name: String,
    pub item_type: ItemStage,
    pub unit_of_measure: String,
    pub process_name: String,
    pub process_level: i64,
    pub grade_name: Option<String>,
}

/// Lifecycle status of a lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Active,
    Consumed,
    Cancelled,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Active => "active",
            LotStatus::Consumed => "consumed",
            LotStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LotStatus::Active),
            "consumed" => Some(LotStatus::Consumed),
            "cancelled" => Some(LotStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal lots accept no further mutation
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LotStatus::Active)
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a lot identifier: YYMM prefix, process letter, zero-padded sequence
pub fn format_lot_id(production_date: NaiveDate, process_code: &str, sequence: u32) -> String {
    format!(
        "{}{}{:03}",
        production_date.format("%y%m"),
        process_code,
        sequence
    )
}

/// Split a lot identifier into its (YYMM + process) prefix and sequence
pub fn parse_lot_sequence(lot_id: &str, prefix: &str) -> Option<u32> {
    lot_id.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_id_format() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(format_lot_id(date, "P", 1), "2505P001");
        assert_eq!(format_lot_id(date, "W", 42), "2505W042");
    }

    #[test]
    fn lot_sequence_parsing() {
        assert_eq!(parse_lot_sequence("2505P001", "2505P"), Some(1));
        assert_eq!(parse_lot_sequence("2505P999", "2505P"), Some(999));
        assert_eq!(parse_lot_sequence("2505W001", "2505P"), None);
        assert_eq!(parse_lot_sequence("garbage", "2505P"), None);
    }
}
