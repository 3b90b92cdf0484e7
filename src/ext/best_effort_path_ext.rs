use std::path::{Component, Path, PathBuf};

/// Renders a filesystem path for log lines and error messages.
///
/// Resolves to the canonical path when the location exists. Otherwise the
/// path is made absolute against the working directory and `.`/`..` are
/// folded lexically, so paths that were never created still read sensibly.
pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl<T: AsRef<Path> + ?Sized> BestEffortPathExt for T {
    fn best_effort_path_display(&self) -> String {
        let path = self.as_ref();
        if let Ok(canonical) = path.canonicalize() {
            return canonical.display().to_string();
        }

        let absolute = match std::env::current_dir() {
            Ok(current_dir) if path.is_relative() => current_dir.join(path),
            _ => path.to_path_buf(),
        };
        fold_dots(&absolute).display().to_string()
    }
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut folded: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(folded.last(), Some(Component::Normal(_))) {
                    folded.pop();
                }
            }
            other => folded.push(other),
        }
    }
    folded.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("/snapshots/./7/a.txt", "/snapshots/7/a.txt")]
    #[case("/snapshots/7/../8/a.txt", "/snapshots/8/a.txt")]
    #[case("/../a.txt", "/a.txt")]
    fn fold_dots_resolves_lexically(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(fold_dots(Path::new(raw)), PathBuf::from(expected));
    }

    #[test]
    fn missing_relative_path_is_made_absolute() {
        let shown = "no-such-dir/../patch.bin".best_effort_path_display();
        assert!(Path::new(&shown).is_absolute());
        assert!(shown.ends_with("patch.bin"));
        assert!(!shown.contains(".."));
    }

    #[test]
    fn existing_path_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join(".");
        assert_eq!(
            nested.best_effort_path_display(),
            dir.path().canonicalize().unwrap().display().to_string()
        );
    }
}
