//! Search filtering over the archive tree.
//!
//! A node is kept when it matches the query directly or when any descendant
//! does; matching folders retain only their matching children. A second
//! pass toggles open every folder on the path to a match.

use std::sync::Arc;

use super::node::TreeNode;

/// Case-insensitive substring match against the node name.
pub fn default_matcher(query: &str, node: &TreeNode) -> bool {
    node.name.to_lowercase().contains(&query.to_lowercase())
}

/// Whether `node` or any of its descendants matches.
pub fn find_node<M>(node: &TreeNode, query: &str, matcher: &M) -> bool
where
    M: Fn(&str, &TreeNode) -> bool,
{
    matcher(query, node)
        || node
            .children
            .iter()
            .any(|child| find_node(child, query, matcher))
}

/// Prunes the tree down to nodes that match or contain a match.
///
/// A directly matching node is returned as-is (subtree shared, no pruning
/// below it), as are leaf nodes. Folders are rebuilt with only the children
/// that contain a match, each recursively filtered.
pub fn filter_tree<M>(node: &Arc<TreeNode>, query: &str, matcher: &M) -> Arc<TreeNode>
where
    M: Fn(&str, &TreeNode) -> bool,
{
    if matcher(query, node) || node.children.is_empty() {
        return Arc::clone(node);
    }
    let children: Vec<Arc<TreeNode>> = node
        .children
        .iter()
        .filter(|child| find_node(child, query, matcher))
        .map(|child| filter_tree(child, query, matcher))
        .collect();
    let mut pruned = (**node).clone();
    pruned.children = children;
    Arc::new(pruned)
}

/// Expands every folder holding at least one matching descendant and
/// collapses folders holding none. Files are returned untouched.
pub fn expand_matches<M>(node: &Arc<TreeNode>, query: &str, matcher: &M) -> Arc<TreeNode>
where
    M: Fn(&str, &TreeNode) -> bool,
{
    if !node.is_folder() {
        return Arc::clone(node);
    }
    if node.children.is_empty() {
        let mut collapsed = (**node).clone();
        collapsed.toggled = false;
        return Arc::new(collapsed);
    }
    let matching: Vec<&Arc<TreeNode>> = node
        .children
        .iter()
        .filter(|child| find_node(child, query, matcher))
        .collect();
    let should_expand = !matching.is_empty();
    let children = if should_expand {
        matching
            .into_iter()
            .map(|child| expand_matches(child, query, matcher))
            .collect()
    } else {
        node.children.clone()
    };
    let mut expanded = (**node).clone();
    expanded.children = children;
    expanded.toggled = should_expand;
    Arc::new(expanded)
}
