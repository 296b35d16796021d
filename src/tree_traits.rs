/*
Rendering of operation trees for the terminal.
Kept outside the domain so the arena has no display dependency.
 */
use generational_arena::Index;
use termtree::Tree;

use crate::domain::{ComponentData, OperationTree, Technology};

pub trait TreeNodeConvert {
    fn to_tree_string(&self, show_ids: bool) -> Tree<String>;
}

fn label(data: &ComponentData, show_ids: bool) -> String {
    match (show_ids, data.operation) {
        (true, _) => data.to_string(),
        (false, Some(op)) => format!("op={}", op),
        (false, None) => "-".to_string(),
    }
}

impl TreeNodeConvert for OperationTree {
    fn to_tree_string(&self, show_ids: bool) -> Tree<String> {
        fn build_tree(
            arena: &OperationTree,
            node_idx: Index,
            parent_tree: &mut Tree<String>,
            show_ids: bool,
        ) {
            if let Some(node) = arena.get_node(node_idx) {
                for &child_idx in &node.children {
                    if let Some(child) = arena.get_node(child_idx) {
                        let mut child_tree = Tree::new(label(&child.data, show_ids));
                        build_tree(arena, child_idx, &mut child_tree, show_ids);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        match self.root().and_then(|idx| self.get_node(idx).map(|n| (idx, n))) {
            Some((root_idx, root)) => {
                let mut tree = Tree::new(label(&root.data, show_ids));
                build_tree(self, root_idx, &mut tree, show_ids);
                tree
            }
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

impl TreeNodeConvert for Technology {
    fn to_tree_string(&self, show_ids: bool) -> Tree<String> {
        Tree::new(format!("{} (id {})", self.number, self.id))
            .with_leaves([self.operation_components.to_tree_string(show_ids)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityId, NodeSpec, TechnologyId, TreeBuilder};

    #[test]
    fn given_tree_when_rendering_then_lists_nodes_in_order() {
        let mut spec = NodeSpec::with_id(10).child(NodeSpec::with_id(11));
        spec.operation = Some(EntityId(5));
        let tree = TreeBuilder::new().build(TechnologyId(1), &spec).unwrap();

        let rendered = tree.to_tree_string(true).to_string();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "#10 op=5");
        assert!(lines[1].ends_with("#11"));
    }

    #[test]
    fn given_ids_hidden_when_rendering_then_shows_operations_only() {
        let mut spec = NodeSpec::with_id(10);
        spec.operation = Some(EntityId(5));
        let tree = TreeBuilder::new().build(TechnologyId(1), &spec).unwrap();

        assert_eq!(tree.to_tree_string(false).to_string().trim_end(), "op=5");
    }
}
