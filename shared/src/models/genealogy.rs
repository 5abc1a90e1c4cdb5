//! Lot genealogy models
//!
//! Genealogy edges record as-built consumption between concrete lots: the
//! parent lot physically incorporates material drawn from the child lot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::LotDetail;

/// A recorded consumption of one lot into another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyEdge {
    pub id: String,
    /// Downstream lot the material went into
    pub parent_lot_id: String,
    /// Upstream lot the material was drawn from
    pub child_lot_id: String,
    pub consumed_quantity: f64,
    /// Share of the child's balance consumed, in percent, fixed at edge
    /// creation time and never recomputed
    pub consumption_rate: f64,
    pub process_code: String,
    pub consumption_date: NaiveDate,
    pub usage_type: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Traversal direction through the genealogy graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceDirection {
    /// What did this lot become: follow edges where the lot is the child
    Forward,
    /// What went into this lot: follow edges where the lot is the parent
    Backward,
}

impl TraceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceDirection::Forward => "forward",
            TraceDirection::Backward => "backward",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(TraceDirection::Forward),
            "backward" => Some(TraceDirection::Backward),
            _ => None,
        }
    }
}

/// A node in a genealogy trace tree
///
/// The root node carries no edge data; every deeper node records the edge
/// that connects it to the node above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyNode {
    pub lot: LotDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<GenealogyLink>,
    pub children: Vec<GenealogyNode>,
}

/// Edge data attached to a non-root genealogy node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyLink {
    pub consumed_quantity: f64,
    pub consumption_rate: f64,
    pub usage_type: String,
    pub consumption_date: NaiveDate,
}
