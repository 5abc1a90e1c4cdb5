//! Process-step and quality-grade reference models

use serde::{Deserialize, Serialize};

/// A ranked manufacturing process step
///
/// `process_level` orders the pipeline; material flows only towards strictly
/// higher levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    /// Single-letter code, e.g. "P"
    pub process_code: String,
    pub process_name: String,
    pub process_level: i64,
    pub accuracy_type: String,
}

/// A quality grade reference row, used for display joins only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGrade {
    pub grade_code: String,
    pub grade_name: String,
    pub processing_rule: String,
}
