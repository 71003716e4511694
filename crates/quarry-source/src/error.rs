//! Error types for quarry-source.

use quarry_util::error::UtilError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("absolute glob `{pattern}` is not allowed; globs are relative to the declaring directory")]
    AbsoluteGlob { pattern: String },

    #[error("glob `{pattern}` may not traverse above the declaring directory")]
    ParentTraversal { pattern: String },

    #[error("invalid glob `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("cannot walk glob match: {source}")]
    Walk { source: glob::GlobError },

    #[error("matched path `{path}` is not inside the build root")]
    OutsideRoot { path: String },

    #[error("matched path `{path}` is not valid UTF-8")]
    NonUtf8Path { path: String },

    #[error(transparent)]
    Util(#[from] UtilError),
}
