use std::io::{self, Read, Write};

use colored::Colorize;
use supports_color::Stream;

use crate::filesystem::RelativePath;
use crate::patch::{OperationKind, PatchOperation, Revision};

/// Receives the ordered operations of a patch.
pub trait PatchSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn delete_file(&mut self, path: &RelativePath) -> Result<(), Self::Error>;

    fn delete_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error>;

    fn create_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error>;

    fn create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error>;

    fn overwrite_or_create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error>;
}

/// Reads exactly `length` bytes from `content`.
pub(crate) fn read_content(content: &mut dyn Read, length: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(usize::try_from(length).unwrap_or_default());
    Read::take(&mut *content, length).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes of content, got {}", length, bytes.len()),
        ));
    }
    Ok(bytes)
}

/// Keeps every operation in memory, in the order received.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    operations: Vec<PatchOperation>,
}

impl RecordingSink {
    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<PatchOperation> {
        self.operations
    }
}

impl PatchSink for RecordingSink {
    type Error = io::Error;

    fn delete_file(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.operations.push(PatchOperation::DeleteFile(path.clone()));
        Ok(())
    }

    fn delete_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.operations
            .push(PatchOperation::DeleteDirectory(path.clone()));
        Ok(())
    }

    fn create_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.operations
            .push(PatchOperation::CreateDirectory(path.clone()));
        Ok(())
    }

    fn create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error> {
        let content = read_content(content, length)?;
        self.operations.push(PatchOperation::CreateFile {
            path: path.clone(),
            revision: revision.clone(),
            content,
        });
        Ok(())
    }

    fn overwrite_or_create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error> {
        let content = read_content(content, length)?;
        self.operations.push(PatchOperation::OverwriteOrCreateFile {
            path: path.clone(),
            revision: revision.clone(),
            content,
        });
        Ok(())
    }
}

/// Writes one human-readable line per operation. Content is not read.
pub struct ListingSink<W: Write> {
    writer: W,
    colored: bool,
}

impl ListingSink<io::Stdout> {
    /// Lists to stdout, colored when the terminal supports it.
    pub fn stdout() -> Self {
        let colored = supports_color::on(Stream::Stdout).is_some();
        Self::new(io::stdout(), colored)
    }
}

impl<W: Write> ListingSink<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(
        &mut self,
        kind: OperationKind,
        path: &RelativePath,
        details: Option<String>,
    ) -> io::Result<()> {
        let (marker, label) = match kind {
            OperationKind::DeleteFile => ("-", "file"),
            OperationKind::DeleteDirectory => ("-", "dir "),
            OperationKind::CreateDirectory => ("+", "dir "),
            OperationKind::CreateFile => ("+", "file"),
            OperationKind::OverwriteOrCreateFile => ("~", "file"),
        };
        let mut line = format!("{marker} {label} {path}");
        if let Some(details) = details {
            line.push_str(&format!(" ({details})"));
        }

        if self.colored {
            let painted = match marker {
                "-" => line.red(),
                "+" => line.green(),
                _ => line.yellow(),
            };
            writeln!(self.writer, "{painted}")
        } else {
            writeln!(self.writer, "{line}")
        }
    }
}

impl<W: Write> PatchSink for ListingSink<W> {
    type Error = io::Error;

    fn delete_file(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.line(OperationKind::DeleteFile, path, None)
    }

    fn delete_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.line(OperationKind::DeleteDirectory, path, None)
    }

    fn create_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.line(OperationKind::CreateDirectory, path, None)
    }

    fn create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        _content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error> {
        let details = format!("revision {revision}, {length} bytes");
        self.line(OperationKind::CreateFile, path, Some(details))
    }

    fn overwrite_or_create_file(
        &mut self,
        path: &RelativePath,
        revision: &Revision,
        _content: &mut dyn Read,
        length: u64,
    ) -> Result<(), Self::Error> {
        let details = format!("revision {revision}, {length} bytes");
        self.line(OperationKind::OverwriteOrCreateFile, path, Some(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn path(raw: &str) -> RelativePath {
        RelativePath::parse(raw).unwrap()
    }

    #[test]
    fn read_content_fails_on_short_stream() {
        let mut short = Cursor::new(b"abc".to_vec());
        let error = read_content(&mut short, 5).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_content_stops_at_length() {
        let mut long = Cursor::new(b"abcdef".to_vec());
        assert_eq!(read_content(&mut long, 3).unwrap(), b"abc");
    }

    #[test]
    fn listing_sink_writes_plain_lines() {
        let mut sink = ListingSink::new(Vec::new(), false);
        sink.delete_file(&path("old.txt")).unwrap();
        sink.create_directory(&path("src")).unwrap();
        sink.create_file(
            &path("src/lib.rs"),
            &Revision::new("5"),
            &mut Cursor::new(b"12345".to_vec()),
            5,
        )
        .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "- file old.txt\n+ dir  src\n+ file src/lib.rs (revision 5, 5 bytes)\n"
        );
    }
}
