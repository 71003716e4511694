//! Glob-based source selection anchored at a target's directory.

use std::collections::BTreeSet;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::error::SourceError;

/// Match options shared by expansion and exclude filtering. `*` and `?`
/// never cross directory separators; `**` does.
fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Include and exclude globs, already anchored at the build root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Filespec {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl Filespec {
    /// Build a filespec from a target's `sources` list.
    ///
    /// Each pattern is anchored at `spec_path`, the target's directory
    /// relative to the build root. A leading `!` marks an exclude, which
    /// is anchored the same way. Absolute patterns and patterns that
    /// traverse above the declaring directory are rejected.
    ///
    /// # Errors
    /// Returns an error for absolute, parent-traversing, or malformed
    /// patterns.
    pub fn from_sources(spec_path: &str, sources: &[String]) -> Result<Self, SourceError> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for raw in sources {
            let (pattern, excluded) = match raw.strip_prefix('!') {
                Some(rest) => (rest, true),
                None => (raw.as_str(), false),
            };

            if pattern.starts_with('/') {
                return Err(SourceError::AbsoluteGlob {
                    pattern: raw.clone(),
                });
            }
            if pattern.split('/').any(|part| part == "..") {
                return Err(SourceError::ParentTraversal {
                    pattern: raw.clone(),
                });
            }
            // Validate eagerly so errors name the offending declaration.
            Pattern::new(pattern).map_err(|source| SourceError::InvalidPattern {
                pattern: raw.clone(),
                source,
            })?;

            let anchored = if spec_path.is_empty() {
                pattern.to_owned()
            } else {
                format!("{spec_path}/{pattern}")
            };
            if excluded {
                excludes.push(anchored);
            } else {
                includes.push(anchored);
            }
        }

        Ok(Self { includes, excludes })
    }

    /// Expand this filespec against `root` into the set of matching files.
    ///
    /// Only regular files are returned; directories that happen to match a
    /// glob are skipped. Paths are relative to `root`, `/`-separated,
    /// sorted, and deduplicated across overlapping includes.
    ///
    /// # Errors
    /// Returns an error if the filesystem cannot be walked or a matched
    /// path cannot be represented.
    pub fn expand(&self, root: &Path) -> Result<Fileset, SourceError> {
        let options = match_options();
        let exclude_patterns: Vec<Pattern> = self
            .excludes
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| SourceError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;

        let mut files = BTreeSet::new();
        for include in &self.includes {
            let full = root.join(include);
            let full_str = full.to_str().ok_or_else(|| SourceError::NonUtf8Path {
                path: full.display().to_string(),
            })?;
            let walker = glob::glob_with(full_str, options).map_err(|source| {
                SourceError::InvalidPattern {
                    pattern: include.clone(),
                    source,
                }
            })?;

            for matched in walker {
                let path = matched.map_err(|source| SourceError::Walk { source })?;
                if !path.is_file() {
                    continue;
                }
                let relative = path
                    .strip_prefix(root)
                    .map_err(|_| SourceError::OutsideRoot {
                        path: path.display().to_string(),
                    })?;
                let text = relative.to_str().ok_or_else(|| SourceError::NonUtf8Path {
                    path: path.display().to_string(),
                })?;
                let normalized = text.replace('\\', "/");
                let kept = !exclude_patterns
                    .iter()
                    .any(|p| p.matches_with(&normalized, options));
                if kept {
                    files.insert(normalized);
                }
            }
        }

        Ok(Fileset {
            files: files.into_iter().collect(),
        })
    }
}

/// The result of expanding a [`Filespec`]: matching file paths relative to
/// the build root, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fileset {
    pub files: Vec<String>,
}

impl Fileset {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
