//! Archive tree nodes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Whether a node is a file or a folder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    File,
    Folder,
}

/// One file or folder in the archive.
///
/// Children are held behind `Arc` so tree transforms can share unmodified
/// subtrees by reference instead of deep-copying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNode {
    /// Unique across the whole tree; `set_active` relies on this.
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    /// File size in bytes; 0 for folders.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Last modification, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modtime: Option<i64>,
    /// Expanded in the viewer.
    #[serde(default)]
    pub toggled: bool,
    /// Selected in the viewer. At most one node per tree.
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub children: Vec<Arc<TreeNode>>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Normalizes a freshly fetched tree: files carry no children or viewer
/// state, folders start collapsed.
pub fn normalize(mut node: TreeNode) -> Arc<TreeNode> {
    match node.kind {
        NodeKind::File => {
            node.children = Vec::new();
            node.toggled = false;
            node.active = false;
            node.loading = false;
            Arc::new(node)
        }
        NodeKind::Folder => {
            node.toggled = false;
            node.active = false;
            node.children = node
                .children
                .into_iter()
                .map(|child| {
                    // Fresh fetches come without sharing; unwrap when sole owner.
                    let child = Arc::try_unwrap(child).unwrap_or_else(|arc| (*arc).clone());
                    normalize(child)
                })
                .collect();
            Arc::new(node)
        }
    }
}

/// Aggregated size and file count under a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_size: u64,
    pub total_files: u64,
}

/// Bottom-up sum of file sizes and counts. Folders contribute nothing
/// directly, only through their descendants.
pub fn aggregate(node: &TreeNode) -> TreeStats {
    match node.kind {
        NodeKind::File => TreeStats {
            total_size: node.size,
            total_files: 1,
        },
        NodeKind::Folder => {
            let mut stats = TreeStats::default();
            for child in &node.children {
                let child_stats = aggregate(child);
                stats.total_size += child_stats.total_size;
                stats.total_files += child_stats.total_files;
            }
            stats
        }
    }
}

/// Finds a node by id anywhere in the tree.
pub fn find_by_id<'a>(node: &'a Arc<TreeNode>, id: &str) -> Option<&'a Arc<TreeNode>> {
    if node.id == id {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_by_id(child, id))
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub fn file(id: &str, name: &str, size: u64) -> Arc<TreeNode> {
        Arc::new(TreeNode {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::File,
            size,
            mimetype: Some("video/mp4".to_string()),
            modtime: Some(1_650_000_000),
            toggled: false,
            active: false,
            loading: false,
            children: Vec::new(),
        })
    }

    pub fn folder(id: &str, name: &str, children: Vec<Arc<TreeNode>>) -> Arc<TreeNode> {
        Arc::new(TreeNode {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::Folder,
            size: 0,
            mimetype: None,
            modtime: None,
            toggled: false,
            active: false,
            loading: false,
            children,
        })
    }
}
