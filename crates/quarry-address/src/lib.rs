//! Target addresses and command-line target specs for Quarry.
//!
//! An address names one target declaration in one BUILD file:
//! `src/java/util:strings`. A spec is what users type on the command
//! line and may match many addresses (`src/java:` for one directory,
//! `src/java::` for a whole subtree).

use std::fmt;
use std::str::FromStr;

/// The address of a single target: a directory relative to the build root
/// plus the target name declared in that directory's BUILD file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    /// Directory of the declaring BUILD file, relative to the build root.
    /// Empty for the build root itself. Never has a leading `//` or a
    /// trailing separator.
    pub spec_path: String,
    /// The declared target name.
    pub name: String,
}

impl Address {
    /// Create an address from already-validated parts.
    ///
    /// # Errors
    /// Returns an error if either part fails validation.
    pub fn new(spec_path: &str, name: &str) -> Result<Self, AddressError> {
        let spec_path = validate_spec_path(spec_path)?;
        validate_name(name)?;
        Ok(Self {
            spec_path,
            name: name.to_owned(),
        })
    }

    /// Parse a dependency reference as written in a BUILD file.
    ///
    /// Accepted forms:
    /// - `:name` (sibling target in `relative_to`)
    /// - `path/to/dir:name`
    /// - `//path/to/dir:name` (explicitly anchored at the build root)
    /// - `path/to/dir` (shorthand for `path/to/dir:dir`)
    ///
    /// # Errors
    /// Returns an error for absolute filesystem paths, `..` traversal,
    /// empty or malformed names, or an empty reference.
    pub fn parse(s: &str, relative_to: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some(name) = s.strip_prefix(':') {
            validate_name(name)?;
            let spec_path = validate_spec_path(relative_to)?;
            return Ok(Self {
                spec_path,
                name: name.to_owned(),
            });
        }

        // `//` anchors at the build root; a single leading `/` is a
        // filesystem-absolute path and is never a valid address.
        let anchored = s.strip_prefix("//");
        let body = match anchored {
            Some(rest) => rest,
            None => {
                if s.starts_with('/') {
                    return Err(AddressError::AbsolutePath { spec: s.to_owned() });
                }
                s
            }
        };

        match body.split_once(':') {
            Some((_, name)) if name.is_empty() => {
                Err(AddressError::MissingName { spec: s.to_owned() })
            }
            Some((path, name)) => {
                validate_name(name)?;
                let spec_path = validate_spec_path(path)?;
                Ok(Self {
                    spec_path,
                    name: name.to_owned(),
                })
            }
            None => {
                // Directory shorthand: the target is named after the
                // directory's last component.
                let spec_path = validate_spec_path(body)?;
                let name = spec_path
                    .rsplit('/')
                    .next()
                    .filter(|n| !n.is_empty())
                    .ok_or(AddressError::MissingName { spec: s.to_owned() })?
                    .to_owned();
                Ok(Self { spec_path, name })
            }
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spec_path.is_empty() {
            write!(f, "//:{}", self.name)
        } else {
            write!(f, "{}:{}", self.spec_path, self.name)
        }
    }
}

/// A command-line target spec, possibly matching many addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Exactly one target.
    Single(Address),
    /// All targets declared in one directory (`path:`).
    Siblings(String),
    /// All targets declared in a directory and everything below it
    /// (`path::`; the bare `::` spans the whole workspace).
    Descendants(String),
}

impl FromStr for Spec {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if let Some(dir) = s.strip_suffix("::") {
            let dir = dir.strip_prefix("//").unwrap_or(dir);
            return Ok(Self::Descendants(validate_spec_path(dir)?));
        }
        if let Some(dir) = s.strip_suffix(':') {
            // A bare `:` means "all targets in the current directory",
            // which here is the build root.
            if dir.is_empty() || dir == "//" {
                return Ok(Self::Siblings(String::new()));
            }
            let dir = dir.strip_prefix("//").unwrap_or(dir);
            return Ok(Self::Siblings(validate_spec_path(dir)?));
        }
        if s.starts_with(':') {
            // `:name` only means something relative to a BUILD file, not
            // on the command line.
            return Err(AddressError::SiblingOutsideBuildFile { spec: s.to_owned() });
        }
        Ok(Self::Single(Address::parse(s, "")?))
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(addr) => addr.fmt(f),
            Self::Siblings(dir) => write!(f, "{dir}:"),
            Self::Descendants(dir) => write!(f, "{dir}::"),
        }
    }
}

/// Normalize and validate a spec path: no leading/trailing separators, no
/// `.`/`..` components, no `:` inside.
fn validate_spec_path(path: &str) -> Result<String, AddressError> {
    let trimmed = path.strip_prefix("//").unwrap_or(path);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') {
        return Err(AddressError::AbsolutePath {
            spec: path.to_owned(),
        });
    }
    for component in trimmed.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(AddressError::PathTraversal {
                spec: path.to_owned(),
            });
        }
        if component.contains(':') {
            return Err(AddressError::InvalidName {
                name: component.to_owned(),
            });
        }
    }
    Ok(trimmed.to_owned())
}

fn validate_name(name: &str) -> Result<(), AddressError> {
    if name.is_empty() {
        return Err(AddressError::MissingName {
            spec: name.to_owned(),
        });
    }
    let ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !ok {
        return Err(AddressError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("empty target address")]
    Empty,

    #[error("absolute paths are not addresses: {spec}")]
    AbsolutePath { spec: String },

    #[error("address escapes the build root: {spec}")]
    PathTraversal { spec: String },

    #[error("address has no target name: {spec}")]
    MissingName { spec: String },

    #[error("invalid target name `{name}`: only alphanumeric characters, dots, hyphens, and underscores are allowed")]
    InvalidName { name: String },

    #[error("sibling reference `{spec}` is only valid inside a BUILD file")]
    SiblingOutsideBuildFile { spec: String },
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::{Address, Spec};

    use proptest::prelude::proptest;

    proptest! {
        /// Arbitrary strings must never cause address parsing to panic.
        #[test]
        fn address_parse_never_panics(s in ".*", rel in "[a-z/]{0,12}") {
            let _ = Address::parse(&s, &rel);
        }

        /// Arbitrary strings must never cause spec parsing to panic.
        #[test]
        fn spec_parse_never_panics(s in ".*") {
            let _ = s.parse::<Spec>();
        }

        /// Any successfully parsed address renders and reparses to itself.
        #[test]
        fn parsed_addresses_round_trip(s in "[a-z0-9/:._-]{1,40}") {
            if let Ok(addr) = Address::parse(&s, "") {
                let reparsed = Address::parse(&addr.to_string(), "").unwrap();
                assert_eq!(addr, reparsed);
            }
        }
    }
}
