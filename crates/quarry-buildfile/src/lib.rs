//! Parse BUILD files into typed target declarations.
//!
//! A BUILD file holds flat, call-style declarations:
//!
//! ```text
//! java_library(
//!     name = "util",
//!     sources = ["*.java", "!UtilTest.java"],
//!     dependencies = [":base", "3rdparty:guava"],
//! )
//! ```
//!
//! Only literals are allowed: no variables, no comprehensions. The
//! declarations are inert records consumed by the rest of Quarry.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod target;

pub use error::BuildFileError;
pub use parser::{parse_build_file, parse_build_file_at};
pub use target::{TargetDecl, TargetKind};
