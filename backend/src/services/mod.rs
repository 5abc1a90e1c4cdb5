//! Business logic services for the Line Trace platform

pub mod bom;
pub mod catalog;
pub mod genealogy;
pub mod inventory;
pub mod lot;
pub mod mirror;
pub mod reference;

pub use bom::BomService;
pub use catalog::{CatalogService, ItemDirectory};
pub use genealogy::GenealogyService;
pub use inventory::InventoryService;
pub use lot::LotService;
pub use mirror::{MirrorDirectory, MirrorService};
pub use reference::ReferenceService;
