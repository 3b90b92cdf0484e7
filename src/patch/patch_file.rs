use std::hash::Hasher;
use std::io::{self, Read};

use bincode::{Decode, Encode};
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::filesystem::{PathError, RelativePath};
use crate::patch::sink::read_content;
use crate::patch::{PatchOperation, PatchSink, Revision};

pub const MAGIC: &[u8; 8] = b"CHPATCH1";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + size_of::<u32>();
const COMPRESSION_LEVEL: i32 = 3;
/// Upper bound on the decompressed payload and on bincode's allocations.
const MAX_PAYLOAD_LEN: usize = 1 << 30;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FileEntry {
    pub path: String,
    pub revision: String,
    pub checksum: u64,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum PatchEntry {
    DeleteFile { path: String },
    DeleteDirectory { path: String },
    CreateDirectory { path: String },
    CreateFile(FileEntry),
    OverwriteOrCreateFile(FileEntry),
}

/// Serialized form of a patch: the operations in emission order, with file
/// content inlined and checksummed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct PatchDocument {
    pub entries: Vec<PatchEntry>,
}

impl PatchDocument {
    /// `MAGIC`, little-endian `FORMAT_VERSION`, then the zstd-compressed
    /// bincode payload.
    pub fn encode(&self) -> Result<Vec<u8>, PatchFileError> {
        let payload =
            bincode::encode_to_vec(self, bincode::config::standard()).context(EncodeSnafu)?;
        let compressed =
            zstd::encode_all(payload.as_slice(), COMPRESSION_LEVEL).context(CompressionSnafu)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&compressed);
        debug!(
            "Encoded {} patch entries into {} bytes",
            self.entries.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PatchFileError> {
        Self::decode_within(bytes, MAX_PAYLOAD_LEN)
    }

    fn decode_within(bytes: &[u8], max_payload: usize) -> Result<Self, PatchFileError> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(PatchFileError::NotAPatch);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(PatchFileError::UnsupportedVersion { version });
        }

        let mut payload = Vec::new();
        zstd::stream::read::Decoder::new(&bytes[HEADER_LEN..])
            .context(CompressionSnafu)?
            .take(max_payload as u64 + 1)
            .read_to_end(&mut payload)
            .context(CompressionSnafu)?;
        if payload.len() > max_payload {
            return Err(PatchFileError::PayloadTooLarge { limit: max_payload });
        }

        let config = bincode::config::standard().with_limit::<MAX_PAYLOAD_LEN>();
        let (document, _): (Self, usize) =
            bincode::decode_from_slice(&payload, config).context(DecodeSnafu)?;
        Ok(document)
    }

    /// Validates paths and checksums and converts the entries back into
    /// operations.
    pub fn operations(&self) -> Result<Vec<PatchOperation>, PatchFileError> {
        self.entries.iter().map(PatchEntry::to_operation).collect()
    }
}

impl PatchEntry {
    fn to_operation(&self) -> Result<PatchOperation, PatchFileError> {
        let operation = match self {
            PatchEntry::DeleteFile { path } => PatchOperation::DeleteFile(parse_path(path)?),
            PatchEntry::DeleteDirectory { path } => {
                PatchOperation::DeleteDirectory(parse_path(path)?)
            }
            PatchEntry::CreateDirectory { path } => {
                PatchOperation::CreateDirectory(parse_path(path)?)
            }
            PatchEntry::CreateFile(entry) => {
                let (path, revision, content) = entry.verified()?;
                PatchOperation::CreateFile {
                    path,
                    revision,
                    content,
                }
            }
            PatchEntry::OverwriteOrCreateFile(entry) => {
                let (path, revision, content) = entry.verified()?;
                PatchOperation::OverwriteOrCreateFile {
                    path,
                    revision,
                    content,
                }
            }
        };
        Ok(operation)
    }
}

impl FileEntry {
    fn new(path: &RelativePath, revision: &Revision, content: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            revision: revision.to_string(),
            checksum: checksum(&content),
            content,
        }
    }

    fn verified(&self) -> Result<(RelativePath, Revision, Vec<u8>), PatchFileError> {
        let path = parse_path(&self.path)?;
        let actual = checksum(&self.content);
        if actual != self.checksum {
            return Err(PatchFileError::ChecksumMismatch {
                path: self.path.clone(),
                expected: self.checksum,
                actual,
            });
        }
        Ok((path, Revision::new(self.revision.clone()), self.content.clone()))
    }
}

fn parse_path(path: &str) -> Result<RelativePath, PatchFileError> {
    RelativePath::parse(path).context(CorruptPathSnafu)
}

fn checksum(content: &[u8]) -> u64 {
    let mut hasher = MetroHash64::default();
    hasher.write(content);
    hasher.finish()
}

/// Collects operations into a [`PatchDocument`].
#[derive(Debug, Clone, Default)]
pub struct PatchFileSink {
    document: PatchDocument,
}

impl PatchFileSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_document(self) -> PatchDocument {
        self.document
    }
}

impl PatchSink for PatchFileSink {
    type Error = io::Error;

    fn delete_file(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.document.entries.push(PatchEntry::DeleteFile {
            path: path.to_string(),
        });
        Ok(())
    }

    fn delete_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.document.entries.push(PatchEntry::DeleteDirectory {
            path: path.to_string(),
        });
        Ok(())
    }

    fn create_directory(&mut self, path: &RelativePath) -> Result<(), Self::Error> {
        self.document.entries.push(PatchEntry::CreateDirectory {
            path: path.to_string(),
        });
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
        self.document
            .entries
            .push(PatchEntry::CreateFile(FileEntry::new(path, revision, content)));
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
        self.document
            .entries
            .push(PatchEntry::OverwriteOrCreateFile(FileEntry::new(
                path, revision, content,
            )));
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum PatchFileError {
    #[snafu(display("Failed to encode patch"))]
    EncodeError { source: bincode::error::EncodeError },
    #[snafu(display("Failed to decode patch"))]
    DecodeError { source: bincode::error::DecodeError },
    #[snafu(display("Failed to (de)compress patch payload"))]
    CompressionError { source: io::Error },
    #[snafu(display("Data is not a patch file"))]
    NotAPatch,
    #[snafu(display("Unsupported patch format version {}", version))]
    UnsupportedVersion { version: u32 },
    #[snafu(display("Patch payload exceeds {} bytes", limit))]
    PayloadTooLarge { limit: usize },
    #[snafu(display("Patch contains an incorrect path"))]
    CorruptPath { source: PathError },
    #[snafu(display(
        "Checksum mismatch for '{}': expected {:016x}, got {:016x}",
        path,
        expected,
        actual
    ))]
    ChecksumMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}
