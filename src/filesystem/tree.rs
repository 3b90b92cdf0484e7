use hashlink::LinkedHashMap;
use snafu::Snafu;
use tracing::trace;

use super::RelativePath;

/// Whether a file was freshly created during the reconciliation pass or only
/// had its content replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    New,
    Modified,
}

/// How a directory node came into the tree.
///
/// `Explicit` directories were inserted by [`PathTree::create_directory`].
/// `Implicit` ones were materialized as intermediate segments of a deeper
/// insertion and only exist to hold their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryOrigin {
    Explicit,
    Implicit,
}

/// Represents the type of a node in a [`PathTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    File {
        state: FileState,
    },
    Directory {
        origin: DirectoryOrigin,
        children: LinkedHashMap<String, PathNode>,
    },
}

impl PathNode {
    fn directory(origin: DirectoryOrigin) -> Self {
        PathNode::Directory {
            origin,
            children: LinkedHashMap::new(),
        }
    }

    fn is_explicit(&self) -> bool {
        matches!(
            self,
            PathNode::File { .. }
                | PathNode::Directory {
                    origin: DirectoryOrigin::Explicit,
                    ..
                }
        )
    }
}

/// File and directory paths of a tree, partitioned for emission.
///
/// Every list is in pre-order: parents before children, siblings in the order
/// they were inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeCollections {
    pub new_files: Vec<RelativePath>,
    pub modified_files: Vec<RelativePath>,
    pub directories: Vec<(RelativePath, DirectoryOrigin)>,
}

impl TreeCollections {
    /// All file paths, new and modified, in that order.
    pub fn all_files(&self) -> impl Iterator<Item = &RelativePath> {
        self.new_files.iter().chain(self.modified_files.iter())
    }

    pub fn explicit_directories(&self) -> impl Iterator<Item = &RelativePath> {
        self.directories
            .iter()
            .filter(|(_, origin)| *origin == DirectoryOrigin::Explicit)
            .map(|(path, _)| path)
    }
}

/// An in-memory virtual filesystem keyed by [`RelativePath`].
///
/// Files carry no content, only their [`FileState`]. Every insertion
/// materializes missing intermediate segments as implicit directory nodes,
/// and every removal prunes implicit directories it leaves empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTree {
    root: LinkedHashMap<String, PathNode>,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn contains_node(&self, path: &RelativePath) -> bool {
        self.node(path).is_some()
    }

    pub fn contains_file(&self, path: &RelativePath) -> bool {
        matches!(self.node(path), Some(PathNode::File { .. }))
    }

    /// True only for files inserted through [`PathTree::create_file`].
    pub fn contains_new_file(&self, path: &RelativePath) -> bool {
        matches!(
            self.node(path),
            Some(PathNode::File {
                state: FileState::New
            })
        )
    }

    /// True for directories of either origin.
    pub fn contains_directory(&self, path: &RelativePath) -> bool {
        matches!(self.node(path), Some(PathNode::Directory { .. }))
    }

    pub fn contains_explicit_directory(&self, path: &RelativePath) -> bool {
        matches!(
            self.node(path),
            Some(PathNode::Directory {
                origin: DirectoryOrigin::Explicit,
                ..
            })
        )
    }

    /// True if a proper ancestor of `path` is present in its own right: a file
    /// or an explicit directory. Implicit intermediate directories don't count.
    pub fn contains_ancestor(&self, path: &RelativePath) -> bool {
        path.ancestors()
            .iter()
            .any(|ancestor| self.node(ancestor).is_some_and(PathNode::is_explicit))
    }

    /// Inserts a file marked [`FileState::New`].
    ///
    /// Side effect: missing ancestors are materialized as implicit directories.
    pub fn create_file(&mut self, path: &RelativePath) -> Result<(), TreeError> {
        let parent = self.materialize_parent(path)?;
        let name = path.file_name();
        if parent.contains_key(name) {
            return Err(TreeError::NodeExists { path: path.clone() });
        }
        parent.insert(
            name.to_string(),
            PathNode::File {
                state: FileState::New,
            },
        );
        trace!("Created file node {}", path);
        Ok(())
    }

    /// Inserts a file marked [`FileState::Modified`], or marks an existing file
    /// as modified.
    ///
    /// Side effect: missing ancestors are materialized as implicit directories.
    pub fn write_file(&mut self, path: &RelativePath) -> Result<(), TreeError> {
        let parent = self.materialize_parent(path)?;
        match parent.get_mut(path.file_name()) {
            Some(PathNode::File { state }) => *state = FileState::Modified,
            Some(PathNode::Directory { .. }) => {
                return Err(TreeError::IsDirectory { path: path.clone() });
            }
            None => {
                parent.insert(
                    path.file_name().to_string(),
                    PathNode::File {
                        state: FileState::Modified,
                    },
                );
            }
        }
        trace!("Wrote file node {}", path);
        Ok(())
    }

    /// Removes a file node.
    ///
    /// Side effect: implicit ancestors left empty are pruned.
    pub fn delete_file(&mut self, path: &RelativePath) -> Result<(), TreeError> {
        if !self.contains_file(path) {
            return Err(TreeError::NoSuchFile { path: path.clone() });
        }
        let segments = path.segments().collect::<Vec<_>>();
        Self::remove_node(&mut self.root, &segments);
        trace!("Deleted file node {}", path);
        Ok(())
    }

    /// Inserts an explicit directory. An existing directory is kept as is,
    /// apart from being promoted to [`DirectoryOrigin::Explicit`].
    ///
    /// Side effect: missing ancestors are materialized as implicit directories.
    pub fn create_directory(&mut self, path: &RelativePath) -> Result<(), TreeError> {
        let parent = self.materialize_parent(path)?;
        match parent.get_mut(path.file_name()) {
            Some(PathNode::Directory { origin, .. }) => *origin = DirectoryOrigin::Explicit,
            Some(PathNode::File { .. }) => {
                return Err(TreeError::NodeExists { path: path.clone() });
            }
            None => {
                parent.insert(
                    path.file_name().to_string(),
                    PathNode::directory(DirectoryOrigin::Explicit),
                );
            }
        }
        trace!("Created directory node {}", path);
        Ok(())
    }

    /// Removes whatever node lives at `path` together with its whole subtree.
    ///
    /// Side effect: implicit ancestors left empty are pruned.
    pub fn delete_directory(&mut self, path: &RelativePath) -> Result<(), TreeError> {
        let segments = path.segments().collect::<Vec<_>>();
        match Self::remove_node(&mut self.root, &segments) {
            Some(_) => {
                trace!("Deleted subtree {}", path);
                Ok(())
            }
            None => Err(TreeError::NoSuchNode { path: path.clone() }),
        }
    }

    pub fn to_collections(&self) -> TreeCollections {
        let mut collections = TreeCollections::default();
        Self::collect(&self.root, None, &mut collections);
        collections
    }

    fn collect(
        children: &LinkedHashMap<String, PathNode>,
        prefix: Option<&RelativePath>,
        collections: &mut TreeCollections,
    ) {
        for (name, node) in children {
            let path = match prefix {
                Some(prefix) => prefix.child(name),
                None => RelativePath::from_segment(name),
            };
            match node {
                PathNode::File {
                    state: FileState::New,
                } => collections.new_files.push(path),
                PathNode::File {
                    state: FileState::Modified,
                } => collections.modified_files.push(path),
                PathNode::Directory { origin, children } => {
                    collections.directories.push((path.clone(), *origin));
                    Self::collect(children, Some(&path), collections);
                }
            }
        }
    }

    fn node(&self, path: &RelativePath) -> Option<&PathNode> {
        let mut children = &self.root;
        let mut segments = path.segments().peekable();
        while let Some(segment) = segments.next() {
            let node = children.get(segment)?;
            if segments.peek().is_none() {
                return Some(node);
            }
            match node {
                PathNode::Directory {
                    children: inner, ..
                } => children = inner,
                PathNode::File { .. } => return None,
            }
        }
        None
    }

    /// Walks to the children map of `path`'s parent, creating implicit
    /// directories for every missing ancestor.
    fn materialize_parent(
        &mut self,
        path: &RelativePath,
    ) -> Result<&mut LinkedHashMap<String, PathNode>, TreeError> {
        let mut current = &mut self.root;
        for ancestor in path.ancestors() {
            let name = ancestor.file_name();
            // `entry` would move an existing node to the back of its siblings.
            if !current.contains_key(name) {
                current.insert(
                    name.to_string(),
                    PathNode::directory(DirectoryOrigin::Implicit),
                );
            }
            current = match current.get_mut(name) {
                Some(PathNode::Directory { children, .. }) => children,
                _ => {
                    return Err(TreeError::AncestorIsFile {
                        path: path.clone(),
                        ancestor: ancestor.clone(),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Removes the node addressed by `segments`, then drops every implicit
    /// directory on the way back up that became empty.
    fn remove_node(
        children: &mut LinkedHashMap<String, PathNode>,
        segments: &[&str],
    ) -> Option<PathNode> {
        let (first, rest) = segments.split_first()?;
        if rest.is_empty() {
            return children.remove(*first);
        }

        let removed = match children.get_mut(*first)? {
            PathNode::Directory {
                children: inner, ..
            } => Self::remove_node(inner, rest)?,
            PathNode::File { .. } => return None,
        };

        let prune = matches!(
            children.get(*first),
            Some(PathNode::Directory {
                origin: DirectoryOrigin::Implicit,
                children: inner,
            }) if inner.is_empty()
        );
        if prune {
            children.remove(*first);
        }

        Some(removed)
    }
}

#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum TreeError {
    #[snafu(display("'{}' already exists", path))]
    NodeExists { path: RelativePath },
    #[snafu(display("'{}' is a directory", path))]
    IsDirectory { path: RelativePath },
    #[snafu(display("Cannot place '{}' under file '{}'", path, ancestor))]
    AncestorIsFile {
        path: RelativePath,
        ancestor: RelativePath,
    },
    #[snafu(display("File '{}' does not exist", path))]
    NoSuchFile { path: RelativePath },
    #[snafu(display("'{}' does not exist", path))]
    NoSuchNode { path: RelativePath },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn path(raw: &str) -> RelativePath {
        RelativePath::parse(raw).unwrap()
    }

    fn strings(paths: &[RelativePath]) -> Vec<&str> {
        paths.iter().map(RelativePath::as_str).collect()
    }

    #[test]
    fn create_file_materializes_implicit_ancestors() {
        let mut tree = PathTree::new();
        tree.create_file(&path("a/b/c.txt")).unwrap();

        assert!(tree.contains_new_file(&path("a/b/c.txt")));
        assert!(tree.contains_directory(&path("a")));
        assert!(tree.contains_directory(&path("a/b")));
        assert!(!tree.contains_explicit_directory(&path("a/b")));
        assert!(!tree.contains_ancestor(&path("a/b/c.txt")));
    }

    #[test]
    fn create_file_twice_is_a_structural_error() {
        let mut tree = PathTree::new();
        tree.create_file(&path("x.txt")).unwrap();
        assert_eq!(
            tree.create_file(&path("x.txt")),
            Err(TreeError::NodeExists { path: path("x.txt") })
        );
    }

    #[test]
    fn create_file_below_a_file_fails() {
        let mut tree = PathTree::new();
        tree.create_file(&path("a")).unwrap();
        assert_eq!(
            tree.create_file(&path("a/b")),
            Err(TreeError::AncestorIsFile {
                path: path("a/b"),
                ancestor: path("a"),
            })
        );
    }

    #[test]
    fn write_file_never_marks_new() {
        let mut tree = PathTree::new();
        tree.write_file(&path("m.txt")).unwrap();
        assert!(tree.contains_file(&path("m.txt")));
        assert!(!tree.contains_new_file(&path("m.txt")));

        tree.create_file(&path("n.txt")).unwrap();
        tree.write_file(&path("n.txt")).unwrap();
        assert!(!tree.contains_new_file(&path("n.txt")));
    }

    #[test]
    fn write_file_over_directory_fails() {
        let mut tree = PathTree::new();
        tree.create_directory(&path("d")).unwrap();
        assert_eq!(
            tree.write_file(&path("d")),
            Err(TreeError::IsDirectory { path: path("d") })
        );
    }

    #[test]
    fn delete_file_prunes_empty_implicit_ancestors() {
        let mut tree = PathTree::new();
        tree.create_file(&path("a/b/c.txt")).unwrap();
        tree.delete_file(&path("a/b/c.txt")).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn delete_file_keeps_explicit_directories() {
        let mut tree = PathTree::new();
        tree.create_directory(&path("a/b")).unwrap();
        tree.create_file(&path("a/b/c.txt")).unwrap();
        tree.delete_file(&path("a/b/c.txt")).unwrap();

        assert!(tree.contains_explicit_directory(&path("a/b")));
        assert!(tree.contains_directory(&path("a")));
    }

    #[test]
    fn delete_missing_file_is_an_error() {
        let mut tree = PathTree::new();
        tree.create_directory(&path("d")).unwrap();
        assert_eq!(
            tree.delete_file(&path("d")),
            Err(TreeError::NoSuchFile { path: path("d") })
        );
        assert_eq!(
            tree.delete_file(&path("nope")),
            Err(TreeError::NoSuchFile { path: path("nope") })
        );
    }

    #[test]
    fn create_directory_is_idempotent_and_promotes_implicit() {
        let mut tree = PathTree::new();
        tree.create_file(&path("a/f")).unwrap();
        tree.create_directory(&path("a")).unwrap();
        tree.create_directory(&path("a")).unwrap();

        assert!(tree.contains_explicit_directory(&path("a")));
        assert!(tree.contains_file(&path("a/f")));
        assert!(tree.contains_ancestor(&path("a/f")));
    }

    #[test]
    fn delete_directory_removes_whole_subtree() {
        let mut tree = PathTree::new();
        tree.create_directory(&path("d")).unwrap();
        tree.create_file(&path("d/x")).unwrap();
        tree.create_file(&path("d/e/y")).unwrap();
        tree.create_file(&path("other")).unwrap();

        tree.delete_directory(&path("d")).unwrap();

        assert!(!tree.contains_node(&path("d")));
        assert!(!tree.contains_node(&path("d/e/y")));
        assert!(tree.contains_file(&path("other")));
        assert_eq!(
            tree.delete_directory(&path("d")),
            Err(TreeError::NoSuchNode { path: path("d") })
        );
    }

    #[rstest]
    #[case("x/y/z", true)]
    #[case("x/y", true)]
    #[case("x", false)]
    #[case("q/z", false)]
    fn contains_ancestor_only_sees_explicit_nodes(#[case] raw: &str, #[case] expected: bool) {
        let mut tree = PathTree::new();
        tree.create_directory(&path("x")).unwrap();
        tree.create_file(&path("q/file")).unwrap();
        assert_eq!(tree.contains_ancestor(&path(raw)), expected);
    }

    #[test]
    fn to_collections_preserves_insertion_order_parents_first() {
        let mut tree = PathTree::new();
        tree.create_file(&path("z/new.txt")).unwrap();
        tree.write_file(&path("a/changed.txt")).unwrap();
        tree.create_directory(&path("z/sub")).unwrap();
        tree.create_file(&path("b.txt")).unwrap();

        let collections = tree.to_collections();

        assert_eq!(strings(&collections.new_files), vec!["z/new.txt", "b.txt"]);
        assert_eq!(strings(&collections.modified_files), vec!["a/changed.txt"]);
        assert_eq!(
            collections.directories,
            vec![
                (path("z"), DirectoryOrigin::Implicit),
                (path("z/sub"), DirectoryOrigin::Explicit),
                (path("a"), DirectoryOrigin::Implicit),
            ]
        );
        assert_eq!(
            collections
                .explicit_directories()
                .map(RelativePath::as_str)
                .collect::<Vec<_>>(),
            vec!["z/sub"]
        );
    }
}
