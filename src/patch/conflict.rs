use derive_more::Display;

use crate::filesystem::{RelativePath, TreeError};
use crate::patch::ChangeKind;

/// What to do with a change event that contradicts the reconciliation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Abort the run on the first conflict.
    Strict,
    /// Skip the offending event and carry on.
    #[default]
    Lenient,
}

impl From<bool> for ConflictPolicy {
    fn from(strict: bool) -> Self {
        if strict {
            ConflictPolicy::Strict
        } else {
            ConflictPolicy::Lenient
        }
    }
}

impl ConflictPolicy {
    pub fn is_strict(self) -> bool {
        self == ConflictPolicy::Strict
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConflictReason {
    #[display("parent directory has been deleted, can't apply {_0} there")]
    ParentDeleted(ChangeKind),
    #[display("cannot modify a deleted file")]
    ModifiesDeletedFile,
    #[display("file has already been deleted")]
    FileAlreadyDeleted,
    #[display("parent directory has already been deleted")]
    ParentAlreadyDeleted,
    #[display("directory has already been deleted")]
    DirectoryAlreadyDeleted,
    #[display("unexpected change kind: {_0}")]
    UnexpectedKind(ChangeKind),
    #[display("{_0}")]
    Structural(TreeError),
}

/// A change event that was skipped (or aborted the run) because it contradicts
/// what earlier events established.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Incorrect change set: {path}: {reason}")]
pub struct Conflict {
    pub path: RelativePath,
    pub reason: ConflictReason,
}

impl Conflict {
    pub fn new(path: &RelativePath, reason: ConflictReason) -> Self {
        Self {
            path: path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_strict_flag() {
        assert_eq!(ConflictPolicy::from(true), ConflictPolicy::Strict);
        assert_eq!(ConflictPolicy::from(false), ConflictPolicy::Lenient);
        assert!(!ConflictPolicy::default().is_strict());
    }

    #[test]
    fn conflict_display_names_path_and_reason() {
        let path = RelativePath::parse("p/q.txt").unwrap();
        let conflict = Conflict::new(
            &path,
            ConflictReason::ParentDeleted(ChangeKind::FileChanged),
        );
        assert_eq!(
            conflict.to_string(),
            "Incorrect change set: p/q.txt: parent directory has been deleted, can't apply file changed there"
        );
    }

    #[test]
    fn structural_reason_forwards_tree_error() {
        let path = RelativePath::parse("x").unwrap();
        let reason = ConflictReason::Structural(TreeError::NodeExists { path: path.clone() });
        assert_eq!(reason.to_string(), "'x' already exists");
    }
}
