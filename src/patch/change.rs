use derive_more::{Display, From};

/// Identifier of the revision a file's content is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From)]
#[display("{_0}")]
pub struct Revision(String);

impl Revision {
    pub fn new(revision: impl Into<String>) -> Self {
        Self(revision.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Revision {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a single path differs between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ChangeKind {
    #[display("file added")]
    FileAdded,
    #[display("file changed")]
    FileChanged,
    #[display("file removed")]
    FileRemoved,
    #[display("directory added")]
    DirectoryAdded,
    #[display("directory removed")]
    DirectoryRemoved,
    #[display("directory changed")]
    DirectoryChanged,
    #[display("not changed")]
    NotChanged,
    /// A kind reported by the backend that this engine does not know.
    #[display("unknown ({_0})")]
    Unknown(String),
}

impl ChangeKind {
    /// Parses the snake_case names used in change lists. Anything else maps to
    /// [`ChangeKind::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "added" | "file_added" => ChangeKind::FileAdded,
            "changed" | "file_changed" => ChangeKind::FileChanged,
            "removed" | "file_removed" => ChangeKind::FileRemoved,
            "directory_added" => ChangeKind::DirectoryAdded,
            "directory_removed" => ChangeKind::DirectoryRemoved,
            "directory_changed" => ChangeKind::DirectoryChanged,
            "not_changed" => ChangeKind::NotChanged,
            other => ChangeKind::Unknown(other.to_string()),
        }
    }

    /// Kinds whose reconciliation records a revision to fetch content from.
    pub fn needs_revision(&self) -> bool {
        matches!(self, ChangeKind::FileAdded | ChangeKind::FileChanged)
    }
}

/// One record of the change stream. The path is still raw here; it is
/// validated before reconciliation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
    pub after_revision: Option<Revision>,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind, after_revision: Option<Revision>) -> Self {
        Self {
            path: path.into(),
            kind,
            after_revision,
        }
    }

    pub fn file_added(path: impl Into<String>, revision: impl Into<Revision>) -> Self {
        Self::new(path, ChangeKind::FileAdded, Some(revision.into()))
    }

    pub fn file_changed(path: impl Into<String>, revision: impl Into<Revision>) -> Self {
        Self::new(path, ChangeKind::FileChanged, Some(revision.into()))
    }

    pub fn file_removed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::FileRemoved, None)
    }

    pub fn directory_added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::DirectoryAdded, None)
    }

    pub fn directory_removed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::DirectoryRemoved, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("added", ChangeKind::FileAdded)]
    #[case("file_changed", ChangeKind::FileChanged)]
    #[case("removed", ChangeKind::FileRemoved)]
    #[case("directory_added", ChangeKind::DirectoryAdded)]
    #[case("directory_removed", ChangeKind::DirectoryRemoved)]
    #[case("directory_changed", ChangeKind::DirectoryChanged)]
    #[case("not_changed", ChangeKind::NotChanged)]
    #[case("renamed", ChangeKind::Unknown("renamed".into()))]
    fn kind_from_name(#[case] name: &str, #[case] expected: ChangeKind) {
        assert_eq!(ChangeKind::from_name(name), expected);
    }

    #[test]
    fn kind_display_is_human_readable() {
        assert_eq!(ChangeKind::DirectoryRemoved.to_string(), "directory removed");
        assert_eq!(
            ChangeKind::Unknown("renamed".into()).to_string(),
            "unknown (renamed)"
        );
    }

    #[test]
    fn only_file_content_changes_need_a_revision() {
        assert!(ChangeKind::FileAdded.needs_revision());
        assert!(ChangeKind::FileChanged.needs_revision());
        assert!(!ChangeKind::FileRemoved.needs_revision());
        assert!(!ChangeKind::DirectoryAdded.needs_revision());
    }
}
