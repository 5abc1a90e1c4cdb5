//! Item catalog models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A manufacturing item type registered in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Externally assigned identifier (e.g. "BRAID_001")
    pub item_id: String,
    pub item_name: String,
    pub item_type: ItemStage,
    pub unit_of_measure: String,
    pub attributes: ItemAttributes,
    /// Provenance tag for rows mirrored from an external product master
    pub source_system: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pipeline stage of an item type
///
/// Ranks follow the manufacturing pipeline in reverse: the finished product
/// ranks first for display, raw materials and auxiliary inputs last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    FinishedProduct,
    WoundThread,
    PostStretchThread,
    DyedThread,
    BraidedThread,
    StretchThread,
    RawYarn,
    MoldedPart,
    PackagingMaterial,
    CoreThread,
}

impl ItemStage {
    pub const ALL: [ItemStage; 10] = [
        ItemStage::FinishedProduct,
        ItemStage::WoundThread,
        ItemStage::PostStretchThread,
        ItemStage::DyedThread,
        ItemStage::BraidedThread,
        ItemStage::StretchThread,
        ItemStage::RawYarn,
        ItemStage::MoldedPart,
        ItemStage::PackagingMaterial,
        ItemStage::CoreThread,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStage::FinishedProduct => "finished_product",
            ItemStage::WoundThread => "wound_thread",
            ItemStage::PostStretchThread => "post_stretch_thread",
            ItemStage::DyedThread => "dyed_thread",
            ItemStage::BraidedThread => "braided_thread",
            ItemStage::StretchThread => "stretch_thread",
            ItemStage::RawYarn => "raw_yarn",
            ItemStage::MoldedPart => "molded_part",
            ItemStage::PackagingMaterial => "packaging_material",
            ItemStage::CoreThread => "core_thread",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "finished_product" => Some(ItemStage::FinishedProduct),
            "wound_thread" => Some(ItemStage::WoundThread),
            "post_stretch_thread" => Some(ItemStage::PostStretchThread),
            "dyed_thread" => Some(ItemStage::DyedThread),
            "braided_thread" => Some(ItemStage::BraidedThread),
            "stretch_thread" => Some(ItemStage::StretchThread),
            "raw_yarn" => Some(ItemStage::RawYarn),
            "molded_part" => Some(ItemStage::MoldedPart),
            "packaging_material" => Some(ItemStage::PackagingMaterial),
            "core_thread" => Some(ItemStage::CoreThread),
            _ => None,
        }
    }

    /// Display rank in pipeline order, finished product first
    pub fn rank(&self) -> u8 {
        match self {
            ItemStage::FinishedProduct => 0,
            ItemStage::WoundThread => 1,
            ItemStage::PostStretchThread => 2,
            ItemStage::DyedThread => 3,
            ItemStage::BraidedThread => 4,
            ItemStage::StretchThread => 5,
            ItemStage::RawYarn => 6,
            ItemStage::MoldedPart => 7,
            ItemStage::PackagingMaterial => 8,
            ItemStage::CoreThread => 9,
        }
    }

    /// Process step a lot of this item type usually belongs to
    pub fn default_process_code(&self) -> char {
        match self {
            ItemStage::RawYarn | ItemStage::StretchThread | ItemStage::CoreThread => 'P',
            ItemStage::DyedThread | ItemStage::WoundThread => 'W',
            ItemStage::PostStretchThread => 'B',
            ItemStage::BraidedThread => 'S',
            ItemStage::FinishedProduct => 'C',
            ItemStage::MoldedPart => 'F',
            ItemStage::PackagingMaterial => 'E',
        }
    }

    /// Japanese stage name as used on the factory floor
    pub fn name_ja(&self) -> &'static str {
        match self {
            ItemStage::FinishedProduct => "完成品",
            ItemStage::WoundThread => "巻き取り糸",
            ItemStage::PostStretchThread => "後PS糸",
            ItemStage::DyedThread => "染色糸",
            ItemStage::BraidedThread => "製紐糸",
            ItemStage::StretchThread => "PS糸",
            ItemStage::RawYarn => "原糸",
            ItemStage::MoldedPart => "成形品",
            ItemStage::PackagingMaterial => "梱包資材",
            ItemStage::CoreThread => "芯糸",
        }
    }
}

impl std::fmt::Display for ItemStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStage::FinishedProduct => write!(f, "Finished Product"),
            ItemStage::WoundThread => write!(f, "Wound Thread"),
            ItemStage::PostStretchThread => write!(f, "Post-Stretch Thread"),
            ItemStage::DyedThread => write!(f, "Dyed Thread"),
            ItemStage::BraidedThread => write!(f, "Braided Thread"),
            ItemStage::StretchThread => write!(f, "Stretch Thread"),
            ItemStage::RawYarn => write!(f, "Raw Yarn"),
            ItemStage::MoldedPart => write!(f, "Molded Part"),
            ItemStage::PackagingMaterial => write!(f, "Packaging Material"),
            ItemStage::CoreThread => write!(f, "Core Thread"),
        }
    }
}

/// Twist direction of a yarn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwistDirection {
    S,
    Z,
}

impl TwistDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TwistDirection::S => "S",
            TwistDirection::Z => "Z",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "S" => Some(TwistDirection::S),
            "Z" => Some(TwistDirection::Z),
            _ => None,
        }
    }
}

/// Technical attributes of an item
///
/// The fixed fields cover the attributes the factory records for most items;
/// anything else lands in the open `additional` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub material_type: Option<String>,
    pub denier: Option<i64>,
    pub ps_ratio: Option<f64>,
    pub braid_structure: Option<String>,
    pub has_core: Option<bool>,
    pub color: Option<String>,
    pub length_m: Option<f64>,
    pub twist_type: Option<TwistDirection>,
    pub knit_type: Option<String>,
    /// Open attribute map for anything the fixed set does not cover
    #[serde(default)]
    pub additional: BTreeMap<String, serde_json::Value>,
}

impl ItemAttributes {
    pub fn is_empty(&self) -> bool {
        self.material_type.is_none()
            && self.denier.is_none()
            && self.ps_ratio.is_none()
            && self.braid_structure.is_none()
            && self.has_core.is_none()
            && self.color.is_none()
            && self.length_m.is_none()
            && self.twist_type.is_none()
            && self.knit_type.is_none()
            && self.additional.is_empty()
    }
}
