//! Filesystem utilities for Quarry.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest`, preferring a hard link for speed.
///
/// Falls back to a regular copy if hard linking fails (e.g. cross-device).
///
/// # Errors
/// Returns an error if both hard linking and copying fail.
pub fn materialize(src: &Path, dest: &Path) -> Result<(), UtilError> {
    // Ensure the parent directory exists.
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    // Remove existing destination if present, so hard_link doesn't fail.
    if dest.exists() {
        std::fs::remove_file(dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    // Try hard link first, fall back to copy.
    if std::fs::hard_link(src, dest).is_err() {
        std::fs::copy(src, dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    Ok(())
}

/// Collect all files with the given `file_name` under `root`, recursively,
/// sorted by path. Directories whose name appears in `ignore` are skipped.
///
/// # Errors
/// Returns an error if a directory cannot be read.
pub fn collect_named_files(
    root: &Path,
    file_name: &str,
    ignore: &[String],
) -> Result<Vec<PathBuf>, UtilError> {
    let mut files = Vec::new();
    collect_named_recursive(root, file_name, ignore, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_named_recursive(
    dir: &Path,
    file_name: &str,
    ignore: &[String],
    out: &mut Vec<PathBuf>,
) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| ignore.iter().any(|i| i == n));
            if !skipped {
                collect_named_recursive(&path, file_name, ignore, out)?;
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == file_name)
        {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_dir_existing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_dir(tmp.path()).unwrap(); // already exists
    }

    #[test]
    fn materialize_hardlink() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.txt");
        let dest = tmp.path().join("dest.txt");
        fs::write(&src, b"data").unwrap();

        materialize(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");
    }

    #[test]
    fn materialize_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.txt");
        let dest = tmp.path().join("sub").join("dir").join("dest.txt");
        fs::write(&src, b"data").unwrap();

        materialize(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");
    }

    #[test]
    fn materialize_overwrites_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.txt");
        let dest = tmp.path().join("dest.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();

        materialize(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn collect_named_files_finds_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("b/sub")).unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("b/BUILD"), b"").unwrap();
        fs::write(tmp.path().join("b/sub/BUILD"), b"").unwrap();
        fs::write(tmp.path().join("a/BUILD"), b"").unwrap();
        fs::write(tmp.path().join("a/readme.md"), b"").unwrap();

        let files = collect_named_files(tmp.path(), "BUILD", &[]).unwrap();
        assert_eq!(files.len(), 3);
        for i in 0..files.len().saturating_sub(1) {
            assert!(files.get(i) <= files.get(i + 1));
        }
    }

    #[test]
    fn collect_named_files_skips_ignored_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("src/BUILD"), b"").unwrap();
        fs::write(tmp.path().join(".git/BUILD"), b"").unwrap();

        let ignore = vec![".git".to_owned()];
        let files = collect_named_files(tmp.path(), "BUILD", &ignore).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.first().unwrap().ends_with("src/BUILD"));
    }

    #[test]
    fn collect_named_files_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let files = collect_named_files(tmp.path(), "BUILD", &[]).unwrap();
        assert!(files.is_empty());
    }
}
