//! Error types for quarry-engine.

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Util(#[from] quarry_util::error::UtilError),

    #[error("{0}")]
    Config(#[from] quarry_config::workspace::ConfigError),

    #[error("{0}")]
    BuildFile(#[from] quarry_buildfile::BuildFileError),

    #[error("{0}")]
    Source(#[from] quarry_source::SourceError),

    /// A path produced during scanning is not valid UTF-8.
    #[error("path `{path}` is not valid UTF-8")]
    NonUtf8Path { path: String },

    /// A scanned build file lies outside the build root.
    #[error("build file `{path}` is outside the build root")]
    OutsideRoot { path: String },

    /// A declared target name is not a valid address component.
    #[error("{path}: invalid target name `{name}`: {source}")]
    InvalidDeclaredName {
        path: String,
        name: String,
        source: quarry_address::AddressError,
    },

    /// A dependency reference does not parse as an address.
    #[error("{from}: invalid dependency `{dep}`: {source}")]
    InvalidDependency {
        from: String,
        dep: String,
        source: quarry_address::AddressError,
    },

    /// A dependency names an address no BUILD file declares.
    #[error("{from}: dependency `{dep}` does not exist")]
    UnknownDependency { from: String, dep: String },

    /// A library target depends on a tests target.
    #[error("{from}: library targets may not depend on tests target {to}")]
    LibraryDependsOnTests { from: String, to: String },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// An address names no declared target.
    #[error("no target exists at address {address}")]
    UnknownTarget { address: String },

    /// A task was installed twice in the same goal.
    #[error("task `{task}` is already installed in goal `{goal}`")]
    DuplicateTask { goal: String, task: String },

    /// An uninstall named a task the goal does not have.
    #[error("goal `{goal}` has no task `{task}` installed")]
    UnknownTask { goal: String, task: String },

    /// A goal name contains characters outside `a-z0-9-`.
    #[error("invalid goal name `{goal}`: names use lowercase letters, digits, and `-`")]
    InvalidGoalName { goal: String },

    /// A goal was requested that is not registered.
    #[error("unknown goal `{goal}`")]
    UnknownGoal { goal: String },

    /// A process request carried no program to run.
    #[error("process request has an empty argv")]
    EmptyArgv,

    /// A process could not be spawned.
    #[error("cannot spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}
