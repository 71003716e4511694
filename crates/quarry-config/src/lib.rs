//! Parse and validate `quarry.toml`.

pub mod workspace;

pub use workspace::WorkspaceConfig;
