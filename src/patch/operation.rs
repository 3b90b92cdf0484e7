use std::io::Cursor;

use derive_more::Display;

use crate::filesystem::RelativePath;
use crate::patch::{PatchSink, Revision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OperationKind {
    #[display("delete file")]
    DeleteFile,
    #[display("delete directory")]
    DeleteDirectory,
    #[display("create directory")]
    CreateDirectory,
    #[display("create file")]
    CreateFile,
    #[display("overwrite or create file")]
    OverwriteOrCreateFile,
}

/// A single filesystem operation with its content held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOperation {
    DeleteFile(RelativePath),
    DeleteDirectory(RelativePath),
    CreateDirectory(RelativePath),
    CreateFile {
        path: RelativePath,
        revision: Revision,
        content: Vec<u8>,
    },
    OverwriteOrCreateFile {
        path: RelativePath,
        revision: Revision,
        content: Vec<u8>,
    },
}

impl PatchOperation {
    pub fn path(&self) -> &RelativePath {
        match self {
            PatchOperation::DeleteFile(path)
            | PatchOperation::DeleteDirectory(path)
            | PatchOperation::CreateDirectory(path)
            | PatchOperation::CreateFile { path, .. }
            | PatchOperation::OverwriteOrCreateFile { path, .. } => path,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            PatchOperation::DeleteFile(_) => OperationKind::DeleteFile,
            PatchOperation::DeleteDirectory(_) => OperationKind::DeleteDirectory,
            PatchOperation::CreateDirectory(_) => OperationKind::CreateDirectory,
            PatchOperation::CreateFile { .. } => OperationKind::CreateFile,
            PatchOperation::OverwriteOrCreateFile { .. } => OperationKind::OverwriteOrCreateFile,
        }
    }

    /// Issues this operation against `sink`.
    pub fn replay<S: PatchSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        match self {
            PatchOperation::DeleteFile(path) => sink.delete_file(path),
            PatchOperation::DeleteDirectory(path) => sink.delete_directory(path),
            PatchOperation::CreateDirectory(path) => sink.create_directory(path),
            PatchOperation::CreateFile {
                path,
                revision,
                content,
            } => sink.create_file(
                path,
                revision,
                &mut Cursor::new(content),
                content.len() as u64,
            ),
            PatchOperation::OverwriteOrCreateFile {
                path,
                revision,
                content,
            } => sink.overwrite_or_create_file(
                path,
                revision,
                &mut Cursor::new(content),
                content.len() as u64,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::RecordingSink;

    #[test]
    fn replay_reproduces_operation() {
        let operation = PatchOperation::OverwriteOrCreateFile {
            path: RelativePath::parse("a/b.txt").unwrap(),
            revision: Revision::new("9"),
            content: b"data".to_vec(),
        };
        let mut sink = RecordingSink::default();
        operation.replay(&mut sink).unwrap();

        assert_eq!(sink.operations(), &[operation.clone()]);
        assert_eq!(operation.kind(), OperationKind::OverwriteOrCreateFile);
        assert_eq!(operation.path().as_str(), "a/b.txt");
    }
}
