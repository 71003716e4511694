//! Content-addressed captures of filesets.

use std::path::Path;

use quarry_util::{fs, hash};

use crate::error::SourceError;
use crate::filespec::Fileset;

/// An immutable capture of a fileset: the relative paths plus a digest of
/// their contents. Two snapshots with equal digests hold identical trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    files: Vec<String>,
    digest: String,
}

impl Snapshot {
    /// The snapshot of zero files. Its digest is still well defined, so
    /// empty targets fingerprint like any other.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            digest: hash::sha256_multi(&[]),
        }
    }

    /// Capture the given fileset relative to `root`.
    ///
    /// The digest covers both paths and contents, so a rename changes it
    /// even when no bytes change. `fileset` is already sorted, which makes
    /// the digest deterministic.
    ///
    /// # Errors
    /// Returns an error if any listed file cannot be read.
    pub fn capture(root: &Path, fileset: &Fileset) -> Result<Self, SourceError> {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(fileset.files.len().saturating_mul(2));
        for file in &fileset.files {
            let content_hash = hash::sha256_file(&root.join(file))?;
            parts.push(file.clone().into_bytes());
            parts.push(content_hash.into_bytes());
        }
        let part_refs: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
        Ok(Self {
            files: fileset.files.clone(),
            digest: hash::sha256_multi(&part_refs),
        })
    }

    /// Relative paths of the captured files, sorted.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Hex digest over paths and contents.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lay the captured files out under `dest`, preserving relative paths.
    ///
    /// Files are hard-linked from `root` where possible and copied
    /// otherwise.
    ///
    /// # Errors
    /// Returns an error if any file cannot be placed.
    pub fn materialize(&self, root: &Path, dest: &Path) -> Result<(), SourceError> {
        fs::ensure_dir(dest)?;
        for file in &self.files {
            fs::materialize(&root.join(file), &dest.join(file))?;
        }
        Ok(())
    }
}
