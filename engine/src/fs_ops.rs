//! Filesystem scanning for selections.
//!
//! Builds `SelectedFile` lists from paths on disk, the way a file picker or
//! folder drop would. Only names, sizes and relative paths are collected;
//! file contents are never opened.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::IntakeError;
use crate::model::SelectedFile;

/// Describe a single file as a selection item.
///
/// # Errors
/// Returns `IntakeError::ScanFailed` if the metadata cannot be read or the
/// path is not a regular file.
pub fn select_file(path: &Path) -> Result<SelectedFile, IntakeError> {
    let metadata = fs::metadata(path).map_err(|e| IntakeError::ScanFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_file() {
        return Err(IntakeError::ScanFailed {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SelectedFile::new(name.clone(), metadata.len()).with_relative_path(name))
}

/// Enumerate every file under `root`.
///
/// Relative paths are `/`-separated and relative to `root`, so each
/// immediate subdirectory of `root` becomes a bulk folder. Results are
/// sorted by relative path. Unreadable subdirectories are skipped with a
/// warning.
///
/// # Errors
/// Returns `IntakeError::ScanFailed` if `root` itself cannot be read.
pub fn scan_selection(root: &Path) -> Result<Vec<SelectedFile>, IntakeError> {
    let mut files = Vec::new();

    fn recurse(path: &Path, rel_prefix: &str, files: &mut Vec<SelectedFile>) -> Result<(), IntakeError> {
        let entries = fs::read_dir(path).map_err(|e| IntakeError::ScanFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| IntakeError::ScanFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            let metadata = entry.metadata().map_err(|e| IntakeError::ScanFailed {
                path: entry.path(),
                source: e,
            })?;

            let name = entry.file_name().to_string_lossy().into_owned();
            let rel_path = if rel_prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", rel_prefix, name)
            };

            if metadata.is_dir() {
                if let Err(e) = recurse(&entry.path(), &rel_path, files) {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable directory");
                }
            } else if metadata.is_file() {
                files.push(SelectedFile::new(name, metadata.len()).with_relative_path(rel_path));
            }
        }
        Ok(())
    }

    recurse(root, "", &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, contents: &[u8]) {
        let mut file = fs::File::create(path).expect("Failed to create file");
        file.write_all(contents).expect("Failed to write file");
    }

    #[test]
    fn test_scan_flat_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        write_file(&temp_dir.path().join("title.pdf"), b"title data");
        write_file(&temp_dir.path().join("mv1.pdf"), b"mv1");

        let files = scan_selection(temp_dir.path()).expect("Failed to scan");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "mv1.pdf");
        assert_eq!(files[0].relative_path.as_deref(), Some("mv1.pdf"));
        assert_eq!(files[1].size_bytes, 10);
    }

    #[test]
    fn test_scan_nested_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let deal_a = temp_dir.path().join("DealA");
        let nested = deal_a.join("extra");
        fs::create_dir_all(&nested).expect("Failed to create dirs");
        write_file(&deal_a.join("title.pdf"), b"a");
        write_file(&nested.join("odometer.pdf"), b"bb");

        let files = scan_selection(temp_dir.path()).expect("Failed to scan");
        let paths: Vec<&str> = files.iter().filter_map(|f| f.relative_path.as_deref()).collect();
        assert_eq!(paths, vec!["DealA/extra/odometer.pdf", "DealA/title.pdf"]);
        assert_eq!(files[0].name, "odometer.pdf");
    }

    #[test]
    fn test_scan_nonexistent_root() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = scan_selection(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(IntakeError::ScanFailed { .. })));
    }

    #[test]
    fn test_select_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("bill_of_sale.pdf");
        write_file(&path, b"12345");

        let file = select_file(&path).expect("Failed to select");
        assert_eq!(file.name, "bill_of_sale.pdf");
        assert_eq!(file.size_bytes, 5);

        assert!(select_file(temp_dir.path()).is_err());
    }
}
