//! Bill-of-materials models

use serde::{Deserialize, Serialize};

use super::Item;

/// A direct component entry of a parent item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    /// Units of the component consumed per unit of the parent
    pub quantity: f64,
    /// Role of the component (e.g. "Main Material", "Core Thread")
    pub usage_type: String,
    pub item: Item,
}

/// Root node of an expanded multi-level BOM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomNode {
    pub item: Item,
    pub components: Vec<BomBranch>,
}

/// A component branch in an expanded BOM tree
///
/// Carries the edge data (quantity, usage) of the parent relation together
/// with the component's own sub-tree. The same item can appear in several
/// branches with independent quantity context; the expansion is a tree, not
/// a DAG projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomBranch {
    pub quantity: f64,
    pub usage_type: String,
    pub item: Item,
    pub components: Vec<BomBranch>,
}

impl BomNode {
    /// Total number of nodes in the tree, the root included
    pub fn node_count(&self) -> usize {
        fn count(branches: &[BomBranch]) -> usize {
            branches.iter().map(|b| 1 + count(&b.components)).sum()
        }
        1 + count(&self.components)
    }

    /// Depth of the tree; a node with no components has depth 0
    pub fn depth(&self) -> usize {
        fn depth(branches: &[BomBranch]) -> usize {
            branches
                .iter()
                .map(|b| 1 + depth(&b.components))
                .max()
                .unwrap_or(0)
        }
        depth(&self.components)
    }
}
