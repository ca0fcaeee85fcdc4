//! Archive tree browsing: an immutable file/folder hierarchy with
//! substring search, match expansion and single-node selection.
//!
//! Every transform produces a new root while sharing untouched subtrees by
//! `Arc`, so nothing is ever mutated in place.

pub mod filter;
pub mod node;
pub mod state;

pub use filter::{default_matcher, expand_matches, filter_tree, find_node};
pub use node::{aggregate, normalize, NodeKind, TreeNode, TreeStats};
pub use state::RecordsState;
