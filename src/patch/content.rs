use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::BestEffortPathExt;
use crate::filesystem::RelativePath;
use crate::patch::Revision;

/// A bounded content stream of known length.
pub struct FileContent {
    pub reader: Box<dyn Read>,
    pub length: u64,
}

impl FileContent {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let length = bytes.len() as u64;
        Self {
            reader: Box::new(Cursor::new(bytes)),
            length,
        }
    }
}

impl std::fmt::Debug for FileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContent")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Supplies file content by path and revision.
///
/// Fetches happen one file at a time, synchronously. Failures are fatal for
/// the run; retrying is up to the implementation.
pub trait ContentProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
    ) -> Result<FileContent, Self::Error>;
}

/// Serves content from a directory holding one snapshot per revision:
/// `<root>/<revision>/<path>`.
#[derive(Debug, Clone)]
pub struct SnapshotDirectoryProvider {
    root: PathBuf,
}

impl SnapshotDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, path: &RelativePath, revision: &Revision) -> Result<PathBuf, SnapshotError> {
        let revision = revision.as_str();
        if revision.is_empty()
            || revision == "."
            || revision == ".."
            || revision.contains(['/', '\\'])
        {
            return Err(SnapshotError::InvalidRevision {
                revision: revision.to_string(),
            });
        }

        let mut location = self.root.join(revision);
        location.extend(path.segments());
        Ok(location)
    }
}

impl ContentProvider for SnapshotDirectoryProvider {
    type Error = SnapshotError;

    fn fetch(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
    ) -> Result<FileContent, Self::Error> {
        let location = self.locate(path, revision)?;
        debug!(
            "Fetching {} at revision {} from {}",
            path,
            revision,
            location.best_effort_path_display()
        );

        let file = File::open(&location).context(OpenSnafu {
            location: location.clone(),
        })?;
        let metadata = file.metadata().context(OpenSnafu {
            location: location.clone(),
        })?;
        if !metadata.is_file() {
            return Err(SnapshotError::NotAFile { location });
        }

        Ok(FileContent {
            reader: Box::new(file),
            length: metadata.len(),
        })
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotError {
    #[snafu(display("Revision '{}' cannot be used as a snapshot directory name", revision))]
    InvalidRevision { revision: String },
    #[snafu(display("Failed to open snapshot file {}", location.best_effort_path_display()))]
    OpenError {
        location: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot entry {} is not a file", location.best_effort_path_display()))]
    NotAFile { location: PathBuf },
}

/// Content kept in memory, keyed by path and revision.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentProvider {
    files: HashMap<(RelativePath, Revision), Vec<u8>>,
}

impl MemoryContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &RelativePath, revision: Revision, bytes: impl Into<Vec<u8>>) {
        self.files.insert((path.clone(), revision), bytes.into());
    }

    pub fn with(
        mut self,
        path: &RelativePath,
        revision: impl Into<Revision>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.insert(path, revision.into(), bytes);
        self
    }
}

impl ContentProvider for MemoryContentProvider {
    type Error = MissingContentError;

    fn fetch(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
    ) -> Result<FileContent, Self::Error> {
        self.files
            .get(&(path.clone(), revision.clone()))
            .map(|bytes| FileContent::from_bytes(bytes.clone()))
            .ok_or_else(|| MissingContentError {
                path: path.clone(),
                revision: revision.clone(),
            })
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("No content for '{}' at revision {}", path, revision))]
pub struct MissingContentError {
    path: RelativePath,
    revision: Revision,
}
