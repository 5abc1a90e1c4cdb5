//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Ordering of a pipeline-ranked item listing
///
/// Different views want the pipeline in different directions: the catalog
/// lists finished goods first, BOM component pickers list raw inputs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineOrder {
    /// Finished product first, raw materials last
    #[default]
    Downstream,
    /// Raw materials first, finished product last
    Upstream,
}

impl PipelineOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "downstream" => Some(PipelineOrder::Downstream),
            "upstream" => Some(PipelineOrder::Upstream),
            _ => None,
        }
    }
}

/// Well-known usage roles for BOM and genealogy edges
///
/// Usage types are free-form tags; this list only feeds selection UIs.
pub const USAGE_TYPES: [&str; 6] = [
    "Main Material",
    "Main Braid Thread",
    "Core Thread",
    "Packaging",
    "Container",
    "Process Material",
];

/// Units of measure the factory records
pub const UNITS: [&str; 6] = ["KG", "M", "個", "枚", "セット", "本"];
