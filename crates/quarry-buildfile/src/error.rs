//! Error types for quarry-buildfile.

/// Errors produced while lexing, parsing, or validating a BUILD file.
///
/// `path` is the build file's path as given by the caller (typically
/// relative to the build root) and `line` is 1-based.
#[derive(Debug, thiserror::Error)]
pub enum BuildFileError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}:{line}: unterminated string literal")]
    UnterminatedString { path: String, line: u32 },

    #[error("{path}:{line}: invalid escape `\\{escape}` in string literal")]
    InvalidEscape {
        path: String,
        line: u32,
        escape: char,
    },

    #[error("{path}:{line}: unexpected character `{ch}`")]
    UnexpectedChar { path: String, line: u32, ch: char },

    #[error("{path}:{line}: integer literal out of range")]
    IntegerOverflow { path: String, line: u32 },

    #[error("{path}:{line}: expected {expected}, found {found}")]
    UnexpectedToken {
        path: String,
        line: u32,
        expected: String,
        found: String,
    },

    #[error("{path}:{line}: unknown target type `{symbol}` (known types: {known})")]
    UnknownTargetType {
        path: String,
        line: u32,
        symbol: String,
        known: String,
    },

    #[error("{path}:{line}: unknown field `{field}` on `{symbol}`")]
    UnknownField {
        path: String,
        line: u32,
        symbol: String,
        field: String,
    },

    #[error("{path}:{line}: field `{field}` given more than once")]
    DuplicateField {
        path: String,
        line: u32,
        field: String,
    },

    #[error("{path}:{line}: `{symbol}` is missing the required `name` field")]
    MissingName {
        path: String,
        line: u32,
        symbol: String,
    },

    #[error("{path}:{line}: `timeout` is only valid on tests targets, not `{symbol}`")]
    TimeoutOnLibrary {
        path: String,
        line: u32,
        symbol: String,
    },

    #[error(
        "{path}:{line}: duplicate target name `{name}`, first declared at line {first_line}"
    )]
    DuplicateTarget {
        path: String,
        line: u32,
        name: String,
        first_line: u32,
    },
}
