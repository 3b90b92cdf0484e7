use derive_more::Display;
use snafu::Snafu;
use tracing::{debug, info};

use crate::filesystem::RelativePath;
use crate::patch::{
    ContentProvider, DualTree, FileContent, OperationKind, PatchSink, Revision, VersionRegistry,
};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Operation counts of one emitted patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display(
    "{deleted_files} files deleted, {deleted_directories} directories deleted, \
     {created_directories} directories created, {created_files} files created, \
     {overwritten_files} files overwritten ({content_bytes} bytes)"
)]
pub struct PatchSummary {
    pub deleted_files: usize,
    pub deleted_directories: usize,
    pub created_directories: usize,
    pub created_files: usize,
    pub overwritten_files: usize,
    pub content_bytes: u64,
}

impl PatchSummary {
    pub fn total_operations(&self) -> usize {
        self.deleted_files
            + self.deleted_directories
            + self.created_directories
            + self.created_files
            + self.overwritten_files
    }
}

/// Drains a reconciled [`DualTree`] into a sink, in five fixed phases:
///
/// 1. delete files recorded in the negative tree,
/// 2. delete explicitly removed directories,
/// 3. create every directory of the positive tree, parents first,
/// 4. create new files,
/// 5. overwrite-or-create modified files.
///
/// Content is fetched lazily, one file at a time, right before it is handed
/// to the sink.
pub struct PatchEmitter<'a, P, S> {
    provider: &'a mut P,
    sink: &'a mut S,
    summary: PatchSummary,
}

impl<'a, P: ContentProvider, S: PatchSink> PatchEmitter<'a, P, S> {
    pub fn new(provider: &'a mut P, sink: &'a mut S) -> Self {
        Self {
            provider,
            sink,
            summary: PatchSummary::default(),
        }
    }

    pub fn emit(mut self, state: DualTree) -> Result<PatchSummary, EmitError> {
        let negative = state.negative.to_collections();
        let positive = state.positive.to_collections();

        for path in negative.all_files() {
            debug!("Emitting file deletion {}", path);
            self.sink
                .delete_file(path)
                .map_err(|e| sink_error(OperationKind::DeleteFile, path, e))?;
            self.summary.deleted_files += 1;
        }

        for path in negative.explicit_directories() {
            debug!("Emitting directory deletion {}", path);
            self.sink
                .delete_directory(path)
                .map_err(|e| sink_error(OperationKind::DeleteDirectory, path, e))?;
            self.summary.deleted_directories += 1;
        }

        for (path, _) in &positive.directories {
            debug!("Emitting directory creation {}", path);
            self.sink
                .create_directory(path)
                .map_err(|e| sink_error(OperationKind::CreateDirectory, path, e))?;
            self.summary.created_directories += 1;
        }

        for path in &positive.new_files {
            let (revision, mut content) = self.fetch(&state.versions, path)?;
            debug!("Emitting file creation {} at revision {}", path, revision);
            self.sink
                .create_file(path, revision, content.reader.as_mut(), content.length)
                .map_err(|e| sink_error(OperationKind::CreateFile, path, e))?;
            self.summary.created_files += 1;
            self.summary.content_bytes += content.length;
        }

        for path in &positive.modified_files {
            let (revision, mut content) = self.fetch(&state.versions, path)?;
            debug!("Emitting file overwrite {} at revision {}", path, revision);
            self.sink
                .overwrite_or_create_file(path, revision, content.reader.as_mut(), content.length)
                .map_err(|e| sink_error(OperationKind::OverwriteOrCreateFile, path, e))?;
            self.summary.overwritten_files += 1;
            self.summary.content_bytes += content.length;
        }

        info!("Emitted patch: {}", self.summary);
        Ok(self.summary)
    }

    fn fetch<'v>(
        &mut self,
        versions: &'v VersionRegistry,
        path: &RelativePath,
    ) -> Result<(&'v Revision, FileContent), EmitError> {
        let revision = versions
            .get(path)
            .ok_or_else(|| EmitError::MissingVersion { path: path.clone() })?;
        let content = self
            .provider
            .fetch(path, revision)
            .map_err(|e| EmitError::ContentFetch {
                path: path.clone(),
                revision: revision.clone(),
                source: Box::new(e),
            })?;
        Ok((revision, content))
    }
}

fn sink_error(
    operation: OperationKind,
    path: &RelativePath,
    error: impl std::error::Error + Send + Sync + 'static,
) -> EmitError {
    EmitError::Sink {
        operation,
        path: path.clone(),
        source: Box::new(error),
    }
}

#[derive(Debug, Snafu)]
pub enum EmitError {
    #[snafu(display("Unexpected error: no version for {} prepared", path))]
    MissingVersion { path: RelativePath },
    #[snafu(display("Failed to fetch content of {} at revision {}", path, revision))]
    ContentFetch {
        path: RelativePath,
        revision: Revision,
        source: BoxedError,
    },
    #[snafu(display("Patch sink failed to {} {}", operation, path))]
    Sink {
        operation: OperationKind,
        path: RelativePath,
        source: BoxedError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{MemoryContentProvider, PatchOperation, RecordingSink};
    use std::io;

    fn path(raw: &str) -> RelativePath {
        RelativePath::parse(raw).unwrap()
    }

    #[test]
    fn phases_run_in_fixed_order() {
        let mut state = DualTree::new();
        state.positive.write_file(&path("m.txt")).unwrap();
        state.versions.record(&path("m.txt"), Revision::new("2"));
        state.positive.create_file(&path("n/new.txt")).unwrap();
        state.versions.record(&path("n/new.txt"), Revision::new("2"));
        state.negative.create_directory(&path("gone")).unwrap();
        state.negative.create_file(&path("old.txt")).unwrap();

        let mut provider = MemoryContentProvider::new()
            .with(&path("m.txt"), "2", "m")
            .with(&path("n/new.txt"), "2", "new");
        let mut sink = RecordingSink::default();
        let summary = PatchEmitter::new(&mut provider, &mut sink)
            .emit(state)
            .unwrap();

        let kinds: Vec<_> = sink.operations().iter().map(PatchOperation::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::DeleteFile,
                OperationKind::DeleteDirectory,
                OperationKind::CreateDirectory,
                OperationKind::CreateFile,
                OperationKind::OverwriteOrCreateFile,
            ]
        );
        assert_eq!(summary.total_operations(), 5);
        assert_eq!(summary.content_bytes, 4);
    }

    #[test]
    fn missing_version_is_fatal() {
        let mut state = DualTree::new();
        state.positive.create_file(&path("orphan.txt")).unwrap();

        let mut provider = MemoryContentProvider::new();
        let mut sink = RecordingSink::default();
        let result = PatchEmitter::new(&mut provider, &mut sink).emit(state);

        assert!(matches!(result, Err(EmitError::MissingVersion { .. })));
    }

    #[test]
    fn content_fetch_failure_is_fatal() {
        let mut state = DualTree::new();
        state.positive.create_file(&path("a.txt")).unwrap();
        state.versions.record(&path("a.txt"), Revision::new("1"));

        let mut provider = MemoryContentProvider::new();
        let mut sink = RecordingSink::default();
        let result = PatchEmitter::new(&mut provider, &mut sink).emit(state);

        match result {
            Err(error @ EmitError::ContentFetch { .. }) => {
                assert!(error.to_string().contains("a.txt"));
            }
            other => panic!("Expected a content fetch error, got {other:?}"),
        }
    }

    struct FailingSink;

    impl PatchSink for FailingSink {
        type Error = io::Error;

        fn delete_file(&mut self, _path: &RelativePath) -> Result<(), Self::Error> {
            Err(io::Error::other("disk full"))
        }

        fn delete_directory(&mut self, _path: &RelativePath) -> Result<(), Self::Error> {
            Ok(())
        }

        fn create_directory(&mut self, _path: &RelativePath) -> Result<(), Self::Error> {
            Ok(())
        }

        fn create_file(
            &mut self,
            _path: &RelativePath,
            _revision: &Revision,
            _content: &mut dyn io::Read,
            _length: u64,
        ) -> Result<(), Self::Error> {
            Ok(())
        }

        fn overwrite_or_create_file(
            &mut self,
            _path: &RelativePath,
            _revision: &Revision,
            _content: &mut dyn io::Read,
            _length: u64,
        ) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_names_operation_and_path() {
        let mut state = DualTree::new();
        state.negative.create_file(&path("x.txt")).unwrap();

        let mut provider = MemoryContentProvider::new();
        let mut sink = FailingSink;
        let error = PatchEmitter::new(&mut provider, &mut sink)
            .emit(state)
            .unwrap_err();

        assert_eq!(error.to_string(), "Patch sink failed to delete file x.txt");
    }
}
