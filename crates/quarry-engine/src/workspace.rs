//! Workspace scanning: find every BUILD file under the build root and parse
//! it into addressed targets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use quarry_address::{Address, Spec};
use quarry_buildfile::{parse_build_file_at, TargetDecl, TargetKind};
use quarry_config::WorkspaceConfig;

use crate::error::EngineError;

/// One declared target, addressed within the workspace.
#[derive(Debug, Clone)]
pub struct Target {
    pub address: Address,
    pub decl: TargetDecl,
    /// The declaring BUILD file, relative to the build root.
    pub build_file: String,
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        self.decl.kind
    }
}

/// All targets declared in a build root, keyed by address.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    targets: BTreeMap<Address, Target>,
}

impl Workspace {
    /// Scan `root` for BUILD files and parse them all.
    ///
    /// Build files are independent of each other, so parsing is done in
    /// parallel. Directories named in the config's ignore list are skipped.
    ///
    /// # Errors
    /// Returns the first error from walking, parsing, or addressing.
    pub fn scan(root: &Path, config: WorkspaceConfig) -> Result<Self, EngineError> {
        let build_files = quarry_util::fs::collect_named_files(
            root,
            &config.workspace.build_file_name,
            &config.workspace.ignore,
        )?;

        let parsed: Vec<Vec<Target>> = build_files
            .par_iter()
            .map(|path| parse_one(root, path))
            .collect::<Result<_, _>>()?;

        // Per-directory name uniqueness is enforced by the parser, and each
        // directory holds at most one build file, so addresses cannot clash.
        let mut targets = BTreeMap::new();
        for file_targets in parsed {
            for target in file_targets {
                targets.insert(target.address.clone(), target);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            config,
            targets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn get(&self, address: &Address) -> Option<&Target> {
        self.targets.get(address)
    }

    /// All targets in address order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The targets a command-line spec selects, in address order.
    ///
    /// A `Siblings` or `Descendants` spec over a directory with no targets
    /// selects nothing, which is not an error.
    ///
    /// # Errors
    /// Returns an error if a single-target spec names a missing target.
    pub fn matching(&self, spec: &Spec) -> Result<Vec<&Target>, EngineError> {
        let selected: Vec<&Target> = match spec {
            Spec::Single(address) => {
                let target = self.get(address).ok_or_else(|| EngineError::UnknownTarget {
                    address: address.to_string(),
                })?;
                vec![target]
            }
            Spec::Siblings(dir) => self
                .targets
                .values()
                .filter(|t| t.address.spec_path == *dir)
                .collect(),
            Spec::Descendants(dir) => self
                .targets
                .values()
                .filter(|t| {
                    dir.is_empty()
                        || t.address.spec_path == *dir
                        || t.address
                            .spec_path
                            .strip_prefix(dir.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                })
                .collect(),
        };
        Ok(selected)
    }
}

fn parse_one(root: &Path, build_file: &Path) -> Result<Vec<Target>, EngineError> {
    let relative = build_file
        .strip_prefix(root)
        .map_err(|_| EngineError::OutsideRoot {
            path: build_file.display().to_string(),
        })?;
    let relative_str = relative
        .to_str()
        .ok_or_else(|| EngineError::NonUtf8Path {
            path: build_file.display().to_string(),
        })?
        .replace('\\', "/");

    let spec_path = match relative_str.rsplit_once('/') {
        Some((dir, _file)) => dir.to_owned(),
        None => String::new(),
    };

    let decls = parse_build_file_at(build_file)?;
    decls
        .into_iter()
        .map(|decl| {
            let address = Address::new(&spec_path, &decl.name).map_err(|source| {
                EngineError::InvalidDeclaredName {
                    path: relative_str.clone(),
                    name: decl.name.clone(),
                    source,
                }
            })?;
            Ok(Target {
                address,
                decl,
                build_file: relative_str.clone(),
            })
        })
        .collect()
}
