//! Owned state for the archive viewer: the fetched tree, its filtered
//! projection, and the single selected node.

use std::sync::Arc;

use super::filter::{default_matcher, expand_matches, filter_tree};
use super::node::{find_by_id, normalize, TreeNode};

/// Viewer state over the archive tree.
///
/// `filtered` is a pruned projection of `tree` under the current search
/// query; when the query is empty it is `None` and callers render the
/// unfiltered tree.
#[derive(Debug, Clone, Default)]
pub struct RecordsState {
    tree: Option<Arc<TreeNode>>,
    filtered: Option<Arc<TreeNode>>,
    search_query: String,
    active_id: Option<String>,
}

impl RecordsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> Option<&Arc<TreeNode>> {
        self.tree.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// The tree the viewer should render: the filtered projection when a
    /// search is active, the full tree otherwise.
    pub fn display_tree(&self) -> Option<&Arc<TreeNode>> {
        self.filtered.as_ref().or(self.tree.as_ref())
    }

    /// The currently selected node, if any.
    pub fn active(&self) -> Option<&Arc<TreeNode>> {
        let id = self.active_id.as_deref()?;
        find_by_id(self.display_tree()?, id)
    }

    /// Installs a freshly fetched tree and reapplies the current search.
    pub fn set_tree(&mut self, root: TreeNode) {
        self.tree = Some(normalize(root));
        self.refilter();
    }

    /// Updates the search query and recomputes the filtered projection.
    pub fn search(&mut self, query: &str) {
        self.search_query = query.trim().to_string();
        self.refilter();
    }

    /// Marks exactly one node as active, clearing any previous selection.
    /// Folders additionally get their expansion set to `toggle`. Unaffected
    /// subtrees are shared between the old and new tree.
    pub fn set_active(&mut self, target_id: &str, toggle: bool) {
        if let Some(tree) = &self.tree {
            self.tree = Some(set_active_node(tree, target_id, toggle));
        }
        if let Some(filtered) = &self.filtered {
            self.filtered = Some(set_active_node(filtered, target_id, toggle));
        }
        self.active_id = Some(target_id.to_string());
    }

    pub fn reset(&mut self) {
        self.tree = None;
        self.filtered = None;
        self.search_query.clear();
        self.active_id = None;
    }

    fn refilter(&mut self) {
        if self.search_query.is_empty() {
            self.filtered = None;
            return;
        }
        self.filtered = self.tree.as_ref().map(|tree| {
            let pruned = filter_tree(tree, &self.search_query, &default_matcher);
            expand_matches(&pruned, &self.search_query, &default_matcher)
        });
    }
}

/// Returns a tree in which only the target node is active. The path from
/// the root to every changed node is freshly allocated; everything else is
/// returned by reference.
fn set_active_node(node: &Arc<TreeNode>, target_id: &str, toggle: bool) -> Arc<TreeNode> {
    let children: Vec<Arc<TreeNode>> = node
        .children
        .iter()
        .map(|child| set_active_node(child, target_id, toggle))
        .collect();
    let children_changed = children
        .iter()
        .zip(&node.children)
        .any(|(new, old)| !Arc::ptr_eq(new, old));

    if node.id == target_id {
        let mut selected = (**node).clone();
        selected.active = true;
        if selected.is_folder() {
            selected.toggled = toggle;
        }
        selected.children = children;
        Arc::new(selected)
    } else if node.active {
        let mut cleared = (**node).clone();
        cleared.active = false;
        cleared.children = children;
        Arc::new(cleared)
    } else if children_changed {
        let mut rebuilt = (**node).clone();
        rebuilt.children = children;
        Arc::new(rebuilt)
    } else {
        Arc::clone(node)
    }
}
