use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{Attributes, EntityId, TechnologyId};
use crate::domain::error::{DomainError, DomainResult};

/// Data payload for tree nodes representing technology operation components.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentData {
    /// Identity, None until persisted
    pub id: Option<EntityId>,
    /// Owning technology
    pub technology: TechnologyId,
    /// Operation performed by this component
    pub operation: Option<EntityId>,
    /// Technology whose tree is copied below this component on create
    pub reference_technology: Option<TechnologyId>,
    pub attributes: Attributes,
}

impl ComponentData {
    pub fn new(technology: TechnologyId) -> Self {
        Self {
            id: None,
            technology,
            operation: None,
            reference_technology: None,
            attributes: Attributes::new(),
        }
    }
}

impl fmt::Display for ComponentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{}", id)?,
            None => write!(f, "#new")?,
        }
        if let Some(op) = self.operation {
            write!(f, " op={}", op)?;
        }
        Ok(())
    }
}

/// Tree node in the arena-based operation tree.
#[derive(Debug, Clone)]
pub struct OperationNode {
    /// Component data for this node
    pub data: ComponentData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in order
    pub children: Vec<Index>,
}

/// Arena-based tree of one technology's operation components.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Parent links are indices, so the tree has no owning back-references.
#[derive(Debug, Clone)]
pub struct OperationTree {
    /// Arena storage for all tree nodes
    arena: Arena<OperationNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for OperationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Inserts a node below `parent`, or as the root when `parent` is None.
    ///
    /// A tree has exactly one root: inserting a second parentless node fails.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: ComponentData, parent: Option<Index>) -> DomainResult<Index> {
        match parent {
            Some(parent_idx) if !self.arena.contains(parent_idx) => {
                return Err(DomainError::NodeNotFound(format!("{:?}", parent_idx)));
            }
            None if self.root.is_some() => return Err(DomainError::RootAlreadyExists),
            _ => {}
        }

        let node_idx = self.arena.insert(OperationNode {
            data,
            parent,
            children: Vec::new(),
        });

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        Ok(node_idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&OperationNode> {
        self.arena.get(idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut OperationNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Finds the node carrying the persisted identity `id`.
    pub fn find(&self, id: EntityId) -> Option<Index> {
        self.arena
            .iter()
            .find(|(_, node)| node.data.id == Some(id))
            .map(|(idx, _)| idx)
    }

    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order iteration over the subtree rooted at `idx`.
    pub fn iter_from(&self, idx: Index) -> TreeIterator {
        TreeIterator::new(self, Some(idx))
    }

    pub fn iter_postorder(&self) -> PostOrderIterator {
        PostOrderIterator::new(self, self.root)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Collects all leaf nodes (nodes with no children), left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_nodes(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Copies the subtree rooted at `from` in `source` into this tree below `parent`.
    ///
    /// `map` produces the data of each copied node. Parent links of the copies point at
    /// the copied parents. Returns the index of the copied subtree root.
    #[instrument(level = "debug", skip(self, source, map))]
    pub fn insert_subtree_from<F>(
        &mut self,
        source: &OperationTree,
        from: Index,
        parent: Option<Index>,
        mut map: F,
    ) -> DomainResult<Index>
    where
        F: FnMut(&ComponentData) -> ComponentData,
    {
        let top = source
            .get_node(from)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", from)))?;
        let top_idx = self.insert_node(map(&top.data), parent)?;

        let mut stack: Vec<(Index, Index)> = top
            .children
            .iter()
            .rev()
            .map(|&child| (child, top_idx))
            .collect();

        while let Some((source_idx, new_parent)) = stack.pop() {
            let node = source
                .get_node(source_idx)
                .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", source_idx)))?;
            let new_idx = self.insert_node(map(&node.data), Some(new_parent))?;
            // Reverse push keeps the source child order
            for &child in node.children.iter().rev() {
                stack.push((child, new_idx));
            }
        }

        Ok(top_idx)
    }

    /// Replaces the children of `at` with copies of the children of `subtree`'s root.
    #[instrument(level = "debug", skip(self, subtree))]
    pub fn graft_children(&mut self, at: Index, subtree: &OperationTree) -> DomainResult<usize> {
        let existing = self
            .get_node(at)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", at)))?
            .children
            .clone();
        for child in existing {
            self.remove_subtree(child)?;
        }

        let Some(sub_root) = subtree.root().and_then(|r| subtree.get_node(r)) else {
            return Ok(0);
        };

        let before = self.len();
        for &child in &sub_root.children {
            self.insert_subtree_from(subtree, child, Some(at), Clone::clone)?;
        }
        Ok(self.len() - before)
    }

    /// Removes the node at `idx` and all its descendants. Returns the removed data, pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, idx: Index) -> DomainResult<Vec<ComponentData>> {
        let parent = self
            .get_node(idx)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", idx)))?
            .parent;

        match parent {
            Some(parent_idx) => {
                if let Some(p) = self.arena.get_mut(parent_idx) {
                    p.children.retain(|&c| c != idx);
                }
            }
            None => self.root = None,
        }

        let doomed: Vec<Index> = self.iter_from(idx).map(|(i, _)| i).collect();
        Ok(doomed
            .into_iter()
            .filter_map(|i| self.arena.remove(i))
            .map(|node| node.data)
            .collect())
    }
}

pub struct TreeIterator<'a> {
    tree: &'a OperationTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a OperationTree, start: Option<Index>) -> Self {
        Self {
            tree,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a OperationNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a OperationTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a OperationTree, start: Option<Index>) -> Self {
        Self {
            tree,
            stack: start.into_iter().map(|i| (i, false)).collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a OperationNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(id: u64) -> ComponentData {
        ComponentData {
            id: Some(EntityId(id)),
            ..ComponentData::new(TechnologyId(1))
        }
    }

    fn sample() -> (OperationTree, Index) {
        let mut tree = OperationTree::new();
        let root = tree.insert_node(data(1), None).unwrap();
        let a = tree.insert_node(data(2), Some(root)).unwrap();
        tree.insert_node(data(3), Some(a)).unwrap();
        tree.insert_node(data(4), Some(root)).unwrap();
        (tree, root)
    }

    fn ids<'a>(it: impl Iterator<Item = (Index, &'a OperationNode)>) -> Vec<u64> {
        it.map(|(_, n)| n.data.id.unwrap().0).collect()
    }

    #[test]
    fn given_tree_when_iterating_then_preorder_and_postorder_keep_child_order() {
        let (tree, _) = sample();
        assert_eq!(ids(tree.iter()), vec![1, 2, 3, 4]);
        assert_eq!(ids(tree.iter_postorder()), vec![3, 2, 4, 1]);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_nodes().len(), 2);
    }

    #[test]
    fn given_rooted_tree_when_inserting_second_root_then_errors() {
        let (mut tree, _) = sample();
        let result = tree.insert_node(data(9), None);
        assert!(matches!(result, Err(DomainError::RootAlreadyExists)));
    }

    #[test]
    fn given_inner_node_when_removing_subtree_then_descendants_go_too() {
        let (mut tree, root) = sample();
        let a = tree.find(EntityId(2)).unwrap();
        let removed = tree.remove_subtree(a).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get_node(root).unwrap().children.len(), 1);
        assert!(tree.find(EntityId(3)).is_none());
    }

    #[test]
    fn given_subtree_when_grafting_children_then_parents_point_at_target() {
        let (source, _) = sample();
        let mut target = OperationTree::new();
        let at = target.insert_node(data(10), None).unwrap();

        let grafted = target.graft_children(at, &source).unwrap();

        assert_eq!(grafted, 3);
        assert_eq!(ids(target.iter()), vec![10, 2, 3, 4]);
        for (idx, node) in target.iter() {
            if idx != at {
                assert!(node.parent.is_some());
            }
        }
        let firsts = &target.get_node(at).unwrap().children;
        assert!(firsts
            .iter()
            .all(|&c| target.get_node(c).unwrap().parent == Some(at)));
    }
}
