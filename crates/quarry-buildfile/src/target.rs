//! Typed target declarations.

use std::fmt;

use serde::Serialize;

/// The kind tag of a target declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A unit of sources other targets may depend on.
    Library,
    /// A unit of test sources runnable by `quarry test`.
    Tests,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Tests => "tests",
        }
    }

    /// Map a BUILD-file callable name to a kind, if known.
    pub fn for_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "java_library" | "scala_library" | "python_library" | "resources" => {
                Some(Self::Library)
            }
            "junit_tests" | "python_tests" | "shell_tests" => Some(Self::Tests),
            _ => None,
        }
    }

    /// All callable names recognized in BUILD files, for error messages.
    pub fn known_symbols() -> &'static [&'static str] {
        &[
            "java_library",
            "scala_library",
            "python_library",
            "resources",
            "junit_tests",
            "python_tests",
            "shell_tests",
        ]
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed target declaration: a flat record of name, sources,
/// dependency references, tags, and an optional timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDecl {
    pub kind: TargetKind,
    pub name: String,
    /// Source patterns relative to the declaring directory. Entries
    /// prefixed with `!` are excludes.
    pub sources: Vec<String>,
    /// Dependency references, unparsed (resolved against the declaring
    /// directory later).
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
    /// Declared timeout in seconds; only valid on tests targets.
    pub timeout: Option<u64>,
    /// 1-based line of the declaration in its BUILD file.
    #[serde(skip)]
    pub line: u32,
}

impl TargetDecl {
    /// Whether this declaration carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
