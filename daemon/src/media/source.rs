//! Media locator resolution.

use anyhow::{Context, Result};
use common::MediaKind;
use glob::{MatchOptions, Pattern, glob_with};
use std::path::{Path, PathBuf};

/// List the media files a locator refers to.
///
/// A regular file is returned as-is, whatever its extension. A directory is
/// scanned (non-recursively) for files with a known media extension; hidden
/// entries are skipped and the result is sorted by path.
pub fn enumerate(locator: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(locator)
        .with_context(|| format!("Failed to open media locator: {}", locator.display()))?;

    if metadata.is_file() {
        return Ok(vec![locator.to_path_buf()]);
    }

    if !metadata.is_dir() {
        anyhow::bail!(
            "Media locator is neither a file nor a directory: {}",
            locator.display()
        );
    }

    let dir = locator.to_string_lossy();
    let pattern = format!("{}/*", Pattern::escape(dir.trim_end_matches('/')));
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut media: Vec<PathBuf> = glob_with(&pattern, options)
        .with_context(|| format!("Invalid directory pattern: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| !is_hidden(path))
        .filter(|path| path.is_file() && MediaKind::from_path(path).is_some())
        .collect();

    media.sort();

    log::debug!(
        "Found {} media file(s) in {}",
        media.len(),
        locator.display()
    );

    Ok(media)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_file_locator_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "whatever.bin");

        assert_eq!(enumerate(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_directory_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp4");
        touch(dir.path(), "a.PNG");
        touch(dir.path(), "c.gif");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.png");
        fs::create_dir(dir.path().join("nested.gif")).unwrap();

        let found = enumerate(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.PNG", "b.mp4", "c.gif"]);
    }

    #[test]
    fn test_directory_with_special_characters() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("clips [old]");
        fs::create_dir(&odd).unwrap();
        touch(&odd, "loop.gif");

        assert_eq!(enumerate(&odd).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(enumerate(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_locator_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(enumerate(&dir.path().join("gone")).is_err());
    }
}
