//! Virtual filesystem used to reconcile change events.
//!
//! Paths are validated [`RelativePath`] values, and [`PathTree`] is a
//! hierarchical, insertion-ordered set of file and directory nodes
//! addressed by them. Nothing here touches a real filesystem.

mod path;
mod tree;

pub use path::{PathError, RelativePath};
pub use tree::{DirectoryOrigin, FileState, PathNode, PathTree, TreeCollections, TreeError};
