//! Deep copy of a referenced technology's operation tree.
//!
//! The copy is independent of its source: identities are stripped, every node is
//! moved into the target technology, owned rows get fresh identity, and derived
//! execution state is dropped.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{ComponentData, OperationNode, OperationTree};
use crate::domain::entities::{Field, FieldValue, TechnologyId};
use crate::domain::error::DomainResult;

/// Execution state that a copied component must never inherit.
pub const DERIVED_STATE_FIELDS: [Field; 5] = [
    Field::ProductionCountingQuantities,
    Field::ProductionCountingOperationRuns,
    Field::OperationalTasks,
    Field::OperCompTimeCalculations,
    Field::BarcodeOperationComponents,
];

/// Copies the subtree rooted at `root` into a new tree owned by `target`.
///
/// Pre-order; the copied root has no parent, every other copy points at the copy
/// of its structural parent. The source tree is not touched.
#[instrument(level = "debug", skip(source))]
pub fn copy_subtree(
    source: &OperationTree,
    root: Index,
    target: TechnologyId,
) -> DomainResult<OperationTree> {
    let mut copy = OperationTree::new();
    copy.insert_subtree_from(source, root, None, |data| detached_copy(data, target))?;
    debug!("copied {} components into technology {}", copy.len(), target);
    Ok(copy)
}

/// Copy of one component's data: no identity, owned by `target`, owned rows detached,
/// derived state nulled.
pub fn detached_copy(data: &ComponentData, target: TechnologyId) -> ComponentData {
    let mut copy = data.clone();
    copy.id = None;
    copy.technology = target;

    for (_, value) in copy.attributes.iter_mut() {
        if let FieldValue::HasMany(rows) = value {
            *rows = rows.iter().map(|row| row.detached()).collect();
        }
    }

    for field in DERIVED_STATE_FIELDS {
        copy.attributes.clear(field);
    }
    copy
}

/// Merges the copied root's fields into the component being created.
///
/// Identity and tree position of `target` are kept; everything else is replaced by
/// the copy. Attributes the copy lacks are dropped from `target`.
pub fn merge_copied_fields(target: &mut ComponentData, copy_root: &OperationNode) {
    let copied = &copy_root.data;
    target.technology = copied.technology;
    target.operation = copied.operation;
    target.reference_technology = copied.reference_technology;
    target.attributes = copied.attributes.clone();
}
