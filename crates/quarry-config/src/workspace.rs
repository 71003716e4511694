use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `quarry.toml` workspace configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub workspace: Workspace,
    #[serde(default)]
    pub test: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// The file name of build manifests (one per directory).
    #[serde(default = "default_build_file_name")]
    pub build_file_name: String,
    /// Directory names skipped while scanning for build files.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Timeout in seconds applied when a tests target declares none.
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,
    /// Upper clamp for declared timeouts.
    #[serde(default = "default_maximum_timeout")]
    pub maximum_timeout: u64,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            build_file_name: default_build_file_name(),
            ignore: default_ignore(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            maximum_timeout: default_maximum_timeout(),
        }
    }
}

fn default_build_file_name() -> String {
    "BUILD".to_owned()
}

fn default_ignore() -> Vec<String> {
    vec![".git".to_owned(), ".quarry".to_owned(), "dist".to_owned()]
}

fn default_timeout() -> u64 {
    60
}

fn default_maximum_timeout() -> u64 {
    600
}

impl WorkspaceConfig {
    /// Read and parse a `quarry.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str_named(&content, &path.display().to_string())
    }

    /// Parse configuration from a string, using `origin` in error messages.
    ///
    /// # Errors
    /// Returns an error if the content is not valid TOML for this schema.
    pub fn from_str_named(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `quarry.toml` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be parsed.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("quarry.toml");
        if path.exists() {
            Self::from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The effective timeout for a tests target: the declared value clamped
    /// to `maximum_timeout`, or `default_timeout` when nothing was declared.
    pub fn effective_timeout(&self, declared: Option<u64>) -> u64 {
        declared
            .unwrap_or(self.test.default_timeout)
            .min(self.test.maximum_timeout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.build_file_name.is_empty()
            || self.workspace.build_file_name.contains('/')
        {
            return Err(ConfigError::InvalidBuildFileName {
                name: self.workspace.build_file_name.clone(),
            });
        }
        if self.test.maximum_timeout == 0 {
            return Err(ConfigError::ZeroMaximumTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid quarry.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid build_file_name `{name}`: must be a bare file name")]
    InvalidBuildFileName { name: String },
    #[error("maximum_timeout must be greater than zero")]
    ZeroMaximumTimeout,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_when_file_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::load_or_default(tmp.path()).unwrap();
        assert_eq!(config.workspace.build_file_name, "BUILD");
        assert_eq!(config.test.default_timeout, 60);
        assert_eq!(config.test.maximum_timeout, 600);
        assert!(config.workspace.ignore.iter().any(|i| i == ".git"));
    }

    #[test]
    fn parse_full_config() {
        let config = WorkspaceConfig::from_str_named(
            r#"
            [workspace]
            build_file_name = "TARGETS"
            ignore = [".git", "out"]

            [test]
            default_timeout = 30
            maximum_timeout = 300
            "#,
            "quarry.toml",
        )
        .unwrap();
        assert_eq!(config.workspace.build_file_name, "TARGETS");
        assert_eq!(config.workspace.ignore, vec![".git", "out"]);
        assert_eq!(config.test.default_timeout, 30);
        assert_eq!(config.test.maximum_timeout, 300);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = WorkspaceConfig::from_str_named(
            "[test]\ndefault_timeout = 10\n",
            "quarry.toml",
        )
        .unwrap();
        assert_eq!(config.workspace.build_file_name, "BUILD");
        assert_eq!(config.test.default_timeout, 10);
        assert_eq!(config.test.maximum_timeout, 600);
    }

    #[test]
    fn from_path_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quarry.toml");
        fs::write(&path, "[workspace]\nbuild_file_name = \"BUILD\"\n").unwrap();
        let config = WorkspaceConfig::from_path(&path).unwrap();
        assert_eq!(config.workspace.build_file_name, "BUILD");
    }

    #[test]
    fn invalid_toml_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quarry.toml");
        fs::write(&path, "not [valid toml").unwrap();
        let err = WorkspaceConfig::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("quarry.toml"));
    }

    #[test]
    fn build_file_name_with_slash_rejected() {
        let err = WorkspaceConfig::from_str_named(
            "[workspace]\nbuild_file_name = \"sub/BUILD\"\n",
            "quarry.toml",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBuildFileName { .. }));
    }

    #[test]
    fn zero_maximum_timeout_rejected() {
        let err = WorkspaceConfig::from_str_named(
            "[test]\nmaximum_timeout = 0\n",
            "quarry.toml",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroMaximumTimeout));
    }

    #[test]
    fn effective_timeout_uses_default_when_undeclared() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.effective_timeout(None), 60);
    }

    #[test]
    fn effective_timeout_uses_declared() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.effective_timeout(Some(120)), 120);
    }

    #[test]
    fn effective_timeout_clamps_to_maximum() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.effective_timeout(Some(100_000)), 600);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::WorkspaceConfig;

    use proptest::prelude::proptest;

    proptest! {
        /// Arbitrary content must never cause config parsing to panic.
        #[test]
        fn config_parse_never_panics(content in ".{0,256}") {
            let _ = WorkspaceConfig::from_str_named(&content, "quarry.toml");
        }

        /// The effective timeout never exceeds the configured maximum.
        #[test]
        fn effective_timeout_bounded(declared in proptest::option::of(0u64..100_000)) {
            let config = WorkspaceConfig::default();
            assert!(config.effective_timeout(declared) <= config.test.maximum_timeout);
        }
    }
}
