//! Source document discovery by filesystem walking.
//!
//! Only finds the files that make up the page tree. Ordering pages into a
//! hierarchy is left to the publisher.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// File extension of AsciiDoc source documents.
pub const SOURCE_EXTENSION: &str = "adoc";

/// Return every `.adoc` file under `root`, sorted by path.
///
/// Hidden files and directories (leading `.`) are skipped. Unreadable
/// subdirectories are skipped with a warning.
///
/// # Errors
///
/// Returns [`SourceError`] if `root` itself can't be read.
pub fn scan_documents(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = fs::read_dir(root).map_err(|e| SourceError::io(e, root))?;
    let mut documents = Vec::new();
    collect(entries, &mut documents);
    documents.sort();
    tracing::debug!(root = %root.display(), count = documents.len(), "Source scan completed");
    Ok(documents)
}

fn collect(entries: fs::ReadDir, documents: &mut Vec<PathBuf>) {
    for entry in entries.filter_map(Result::ok) {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

        if is_dir {
            match fs::read_dir(&path) {
                Ok(children) => collect(children, documents),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read directory, skipping");
                }
            }
        } else if path.extension().is_some_and(|e| e == SOURCE_EXTENSION) {
            documents.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_scan_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide/advanced")).unwrap();
        fs::write(root.join("index.adoc"), "= Home").unwrap();
        fs::write(root.join("guide/setup.adoc"), "= Setup").unwrap();
        fs::write(root.join("guide/advanced/tuning.adoc"), "= Tuning").unwrap();
        fs::write(root.join("guide/diagram.png"), b"png").unwrap();

        let docs = scan_documents(root).unwrap();

        assert_eq!(
            docs,
            vec![
                root.join("guide/advanced/tuning.adoc"),
                root.join("guide/setup.adoc"),
                root.join("index.adoc"),
            ]
        );
    }

    #[test]
    fn test_scan_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/notes.adoc"), "= Hidden").unwrap();
        fs::write(root.join(".draft.adoc"), "= Draft").unwrap();
        fs::write(root.join("page.adoc"), "= Page").unwrap();

        let docs = scan_documents(root).unwrap();

        assert_eq!(docs, vec![root.join("page.adoc")]);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_documents(&dir.path().join("missing")).unwrap_err();
        assert!(err.is_not_found());
    }
}
