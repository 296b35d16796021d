//! Tree builder for turning nested component descriptions into operation trees.

use std::collections::HashSet;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

use crate::domain::arena::{ComponentData, OperationTree};
use crate::domain::entities::{Attributes, EntityId, TechnologyId};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Nested description of an operation component and its descendants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_technology: Option<TechnologyId>,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn with_id(id: u64) -> Self {
        Self {
            id: Some(EntityId(id)),
            ..Self::default()
        }
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    fn to_data(&self, technology: TechnologyId) -> ComponentData {
        ComponentData {
            id: self.id,
            technology,
            operation: self.operation,
            reference_technology: self.reference_technology,
            attributes: self.attributes.clone(),
        }
    }
}

/// Constructs operation trees from nested descriptions.
pub struct TreeBuilder {
    visited_ids: HashSet<EntityId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            visited_ids: HashSet::new(),
        }
    }

    /// Build the tree of `technology` from its root description.
    ///
    /// A persisted identity appearing twice means the description loops back on
    /// itself and is rejected.
    pub fn build(&mut self, technology: TechnologyId, root: &NodeSpec) -> TreeResult<OperationTree> {
        self.visited_ids.clear();

        let mut tree = OperationTree::new();
        let mut stack: Vec<(&NodeSpec, Option<Index>)> = vec![(root, None)];

        while let Some((spec, parent_idx)) = stack.pop() {
            // Cycle detection
            if let Some(id) = spec.id {
                if !self.visited_ids.insert(id) {
                    return Err(DomainError::CycleDetected(id));
                }
            }

            let current_idx = tree.insert_node(spec.to_data(technology), parent_idx)?;

            // Reverse push keeps the declared child order
            for child in spec.children.iter().rev() {
                stack.push((child, Some(current_idx)));
            }
        }

        Ok(tree)
    }

    /// Nested description of `tree`, None for an empty tree.
    pub fn export(tree: &OperationTree) -> Option<NodeSpec> {
        fn describe(tree: &OperationTree, idx: Index) -> Option<NodeSpec> {
            let node = tree.get_node(idx)?;
            Some(NodeSpec {
                id: node.data.id,
                operation: node.data.operation,
                reference_technology: node.data.reference_technology,
                attributes: node.data.attributes.clone(),
                children: node
                    .children
                    .iter()
                    .filter_map(|&child| describe(tree, child))
                    .collect(),
            })
        }

        tree.root().and_then(|root| describe(tree, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_spec_when_building_then_export_returns_same_shape() {
        let spec = NodeSpec::with_id(1)
            .child(NodeSpec::with_id(2).child(NodeSpec::with_id(3)))
            .child(NodeSpec::with_id(4));

        let tree = TreeBuilder::new().build(TechnologyId(1), &spec).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.depth(), 3);
        assert_eq!(TreeBuilder::export(&tree), Some(spec));
    }

    #[test]
    fn given_repeated_identity_when_building_then_reports_cycle() {
        let spec = NodeSpec::with_id(1).child(NodeSpec::with_id(2).child(NodeSpec::with_id(1)));

        let result = TreeBuilder::new().build(TechnologyId(1), &spec);

        assert_eq!(result.unwrap_err(), DomainError::CycleDetected(EntityId(1)));
    }
}
