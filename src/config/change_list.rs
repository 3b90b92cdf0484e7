use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{borrow::Cow, io::Cursor, path::Path};
use tracing::debug;

use crate::{
    ext::{AsyncTryFrom, BestEffortPathExt},
    patch::{ChangeEvent, ChangeKind, Revision},
};

/// Change events of one run, as read from a YAML document:
///
/// ```yaml
/// strict: true
/// changes:
///   - path: src/main.rs
///     kind: added
///     revision: "42"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeList {
    pub strict: bool,
    pub changes: Vec<ChangeEvent>,
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

impl ChangeList {
    pub async fn read(path: &Path) -> Result<Self, ChangeListError> {
        debug!("Opening change list: {}", path.best_effort_path_display());
        let file = File::open(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;

        let mut reader = BufReader::new(Cursor::new(file));
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Read change list: {n} bytes"),
            Err(source) => {
                return Err(ChangeListError::ReadError {
                    file_path: path.best_effort_path_display(),
                    source,
                });
            }
        }
        res.1.as_str().try_into()
    }

    fn parse_strict(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<bool, ChangeListError> {
        match top_level.get(&key("strict")) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(false),
            Some(Yaml::Value(Scalar::Boolean(strict))) => Ok(*strict),
            Some(_) => Err(ChangeListError::StrictNotBool),
        }
    }

    fn parse_changes(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<ChangeEvent>, ChangeListError> {
        let Some(changes) = top_level.get(&key("changes")) else {
            return Ok(Vec::new());
        };
        changes
            .as_sequence()
            .ok_or(ChangeListError::ChangesNotSequence)?
            .iter()
            .enumerate()
            .map(|(index, entry)| Self::parse_entry(index, entry))
            .collect()
    }

    fn parse_entry(index: usize, entry: &Yaml) -> Result<ChangeEvent, ChangeListError> {
        let entry = entry
            .as_mapping()
            .context(EntryNotMapSnafu { index })?;

        let path = Self::string_field(index, entry, "path")?;
        let kind = ChangeKind::from_name(&Self::string_field(index, entry, "kind")?);
        let revision = match entry.get(&key("revision")) {
            None | Some(Yaml::Value(Scalar::Null)) => None,
            Some(Yaml::Value(Scalar::String(revision))) => Some(Revision::new(revision.to_string())),
            Some(Yaml::Value(Scalar::Integer(revision))) => Some(Revision::new(revision.to_string())),
            Some(_) => return Err(ChangeListError::InvalidRevision { index }),
        };

        Ok(ChangeEvent::new(path, kind, revision))
    }

    fn string_field(
        index: usize,
        entry: &LinkedHashMap<Yaml, Yaml>,
        field: &'static str,
    ) -> Result<String, ChangeListError> {
        entry
            .get(&key(field))
            .context(MissingFieldSnafu { index, field })?
            .as_str()
            .map(str::to_string)
            .context(FieldNotStringSnafu { index, field })
    }
}

impl TryFrom<&str> for ChangeList {
    type Error = ChangeListError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| ChangeListError::ParseError { source: e })?;
        let document = documents
            .first()
            .ok_or(ChangeListError::MalformedDocument)?;
        let top_level = document
            .as_mapping()
            .ok_or(ChangeListError::TopLevelNotMap)?;

        let change_list = ChangeList {
            strict: Self::parse_strict(top_level)?,
            changes: Self::parse_changes(top_level)?,
        };
        debug!(
            "Parsed {} change events (strict: {})",
            change_list.changes.len(),
            change_list.strict
        );
        Ok(change_list)
    }
}

impl<'a> AsyncTryFrom<&'a Path> for ChangeList {
    type Error = ChangeListError;

    async fn async_try_from(path: &'a Path) -> Result<Self, Self::Error> {
        Self::read(path).await
    }
}

#[derive(Debug, Snafu)]
pub enum ChangeListError {
    #[snafu(display("Failed to read the change list: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the change list"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted change list"))]
    MalformedDocument,
    #[snafu(display("Top level of the change list should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'strict' should be a boolean"))]
    StrictNotBool,
    #[snafu(display("'changes' should be a sequence"))]
    ChangesNotSequence,
    #[snafu(display("Change #{} should be a map", index))]
    EntryNotMap { index: usize },
    #[snafu(display("Change #{} has no '{}'", index, field))]
    MissingField { index: usize, field: &'static str },
    #[snafu(display("'{}' of change #{} should be a string", field, index))]
    FieldNotString { index: usize, field: &'static str },
    #[snafu(display("'revision' of change #{} should be a string or an integer", index))]
    InvalidRevision { index: usize },
}
