use derive_more::Display;
use snafu::Snafu;

const SEPARATOR: char = '/';

/// A normalized, slash-separated path relative to the patched tree root.
///
/// Construction goes through [`RelativePath::parse`], so every value of this
/// type has already passed validation: no empty segments, no `.` or `..`,
/// no drive letters and no leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalizes `raw` (backslashes become slashes, a single trailing slash is
    /// dropped) and validates the result.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let raw = raw.as_ref();
        let mut normalized = raw.replace('\\', "/");
        if normalized.len() > 1 && normalized.ends_with(SEPARATOR) {
            normalized.pop();
        }

        if normalized.is_empty() {
            return Err(PathError::Empty);
        }
        if normalized.starts_with(SEPARATOR) {
            return Err(PathError::Absolute {
                path: raw.to_string(),
            });
        }

        for (index, segment) in normalized.split(SEPARATOR).enumerate() {
            match segment {
                "" => {
                    return Err(PathError::EmptySegment {
                        path: raw.to_string(),
                    });
                }
                "." | ".." => {
                    return Err(PathError::DotSegment {
                        path: raw.to_string(),
                        segment: segment.to_string(),
                    });
                }
                _ if index == 0 && is_drive_letter(segment) => {
                    return Err(PathError::DriveLetter {
                        path: raw.to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from the root down to the last one.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> Option<RelativePath> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Proper ancestors, outermost first: `a/b/c` yields `a` then `a/b`.
    pub fn ancestors(&self) -> Vec<RelativePath> {
        self.0
            .match_indices(SEPARATOR)
            .map(|(index, _)| Self(self.0[..index].to_string()))
            .collect()
    }

    /// Appends a single segment. The caller guarantees `segment` is a valid
    /// segment (it always comes from an existing tree node name).
    pub(crate) fn child(&self, segment: &str) -> RelativePath {
        Self(format!("{}{}{}", self.0, SEPARATOR, segment))
    }

    pub(crate) fn from_segment(segment: &str) -> RelativePath {
        Self(segment.to_string())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn is_drive_letter(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum PathError {
    #[snafu(display("Path is empty"))]
    Empty,
    #[snafu(display("Path '{}' must be relative", path))]
    Absolute { path: String },
    #[snafu(display("Path '{}' contains an empty segment", path))]
    EmptySegment { path: String },
    #[snafu(display("Path '{}' contains a '{}' segment", path, segment))]
    DotSegment { path: String, segment: String },
    #[snafu(display("Path '{}' starts with a drive letter", path))]
    DriveLetter { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("a", "a")]
    #[case("a/b/c.txt", "a/b/c.txt")]
    #[case("a\\b\\c.txt", "a/b/c.txt")]
    #[case("dir/", "dir")]
    #[case("file.with.dots", "file.with.dots")]
    #[case("..hidden", "..hidden")]
    #[case("тест/🚀.txt", "тест/🚀.txt")]
    fn parse_accepts_and_normalizes(#[case] raw: &str, #[case] expected: &str) {
        let path = RelativePath::parse(raw).expect("path should be valid");
        assert_eq!(path.as_str(), expected);
    }

    #[rstest]
    #[case("", PathError::Empty)]
    #[case("/etc/passwd", PathError::Absolute { path: "/etc/passwd".into() })]
    #[case("a//b", PathError::EmptySegment { path: "a//b".into() })]
    #[case("a/b//", PathError::EmptySegment { path: "a/b//".into() })]
    #[case("../up", PathError::DotSegment { path: "../up".into(), segment: "..".into() })]
    #[case("a/./b", PathError::DotSegment { path: "a/./b".into(), segment: ".".into() })]
    #[case("C:/Windows", PathError::DriveLetter { path: "C:/Windows".into() })]
    #[case("d:\\data", PathError::DriveLetter { path: "d:\\data".into() })]
    fn parse_rejects_malformed_paths(#[case] raw: &str, #[case] expected: PathError) {
        assert_eq!(RelativePath::parse(raw), Err(expected));
    }

    #[test]
    fn drive_letter_is_only_checked_in_first_segment() {
        assert!(RelativePath::parse("docs/c:notes").is_ok());
    }

    #[test]
    fn ancestors_are_listed_outermost_first() {
        let path = RelativePath::parse("a/b/c/d.txt").unwrap();
        let ancestors: Vec<_> = path.ancestors().iter().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, vec!["a", "a/b", "a/b/c"]);
        assert!(RelativePath::parse("top").unwrap().ancestors().is_empty());
    }

    #[test]
    fn parent_and_file_name() {
        let path = RelativePath::parse("a/b/c.txt").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "a/b");
        assert_eq!(path.file_name(), "c.txt");
        assert_eq!(path.depth(), 3);
        assert!(RelativePath::parse("c.txt").unwrap().parent().is_none());
    }

    #[test]
    fn error_display_names_the_path() {
        let error = RelativePath::parse("../x").unwrap_err();
        assert!(error.to_string().contains("../x"));
    }
}
