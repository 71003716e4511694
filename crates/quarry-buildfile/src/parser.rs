//! Recursive-descent parser for BUILD file declarations.

use std::collections::HashMap;
use std::path::Path;

use crate::error::BuildFileError;
use crate::lexer::{lex, Lexeme, Token};
use crate::target::{TargetDecl, TargetKind};

/// Parse the BUILD file at `path`.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn parse_build_file_at(path: &Path) -> Result<Vec<TargetDecl>, BuildFileError> {
    let label = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| BuildFileError::Read {
        path: label.clone(),
        source,
    })?;
    parse_build_file(&label, &content)
}

/// Parse BUILD file content, using `path` in diagnostics.
///
/// Returns declarations in file order. Duplicate target names within the
/// file are rejected here, which makes names unique per directory.
///
/// # Errors
/// Returns an error on any lexical, syntactic, or schema violation.
pub fn parse_build_file(path: &str, content: &str) -> Result<Vec<TargetDecl>, BuildFileError> {
    let lexemes = lex(path, content)?;
    let mut parser = Parser {
        path,
        lexemes: &lexemes,
        pos: 0,
    };

    let mut decls = Vec::new();
    while parser.peek().is_some() {
        decls.push(parser.declaration()?);
    }

    // Names must be unique within a directory.
    let mut first_lines: HashMap<&str, u32> = HashMap::new();
    for decl in &decls {
        if let Some(&first_line) = first_lines.get(decl.name.as_str()) {
            return Err(BuildFileError::DuplicateTarget {
                path: path.to_owned(),
                line: decl.line,
                name: decl.name.clone(),
                first_line,
            });
        }
        first_lines.insert(decl.name.as_str(), decl.line);
    }

    Ok(decls)
}

struct Parser<'a> {
    path: &'a str,
    lexemes: &'a [Lexeme],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn next(&mut self) -> Option<&Lexeme> {
        let lexeme = self.lexemes.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    /// The line of the current (or last) lexeme, for end-of-file errors.
    fn current_line(&self) -> u32 {
        self.lexemes
            .get(self.pos)
            .or_else(|| self.lexemes.last())
            .map_or(1, |l| l.line)
    }

    fn unexpected(&self, expected: &str) -> BuildFileError {
        let (found, line) = match self.lexemes.get(self.pos) {
            Some(lexeme) => (lexeme.token.describe(), lexeme.line),
            None => ("end of file".to_owned(), self.current_line()),
        };
        BuildFileError::UnexpectedToken {
            path: self.path.to_owned(),
            line,
            expected: expected.to_owned(),
            found,
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), BuildFileError> {
        match self.peek() {
            Some(lexeme) if lexeme.token == *token => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// One `symbol(field = value, ...)` declaration.
    fn declaration(&mut self) -> Result<TargetDecl, BuildFileError> {
        let (symbol, line) = match self.next() {
            Some(Lexeme {
                token: Token::Ident(name),
                line,
            }) => (name.clone(), *line),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.unexpected("a target declaration"));
            }
        };

        let kind = TargetKind::for_symbol(&symbol).ok_or_else(|| {
            BuildFileError::UnknownTargetType {
                path: self.path.to_owned(),
                line,
                symbol: symbol.clone(),
                known: TargetKind::known_symbols().join(", "),
            }
        })?;

        self.expect(&Token::LParen, "`(`")?;

        let mut name: Option<String> = None;
        let mut sources: Option<Vec<String>> = None;
        let mut dependencies: Option<Vec<String>> = None;
        let mut tags: Option<Vec<String>> = None;
        let mut timeout: Option<u64> = None;

        loop {
            match self.peek() {
                Some(Lexeme {
                    token: Token::RParen,
                    ..
                }) => {
                    self.pos += 1;
                    break;
                }
                Some(Lexeme {
                    token: Token::Ident(_),
                    ..
                }) => {}
                _ => return Err(self.unexpected("a field name or `)`")),
            }

            let (field, field_line) = match self.next() {
                Some(Lexeme {
                    token: Token::Ident(f),
                    line: l,
                }) => (f.clone(), *l),
                _ => return Err(self.unexpected("a field name")),
            };
            self.expect(&Token::Eq, "`=`")?;

            let path = self.path.to_owned();
            let duplicate = move |field: &str| BuildFileError::DuplicateField {
                path,
                line: field_line,
                field: field.to_owned(),
            };

            match field.as_str() {
                "name" => {
                    if name.is_some() {
                        return Err(duplicate("name"));
                    }
                    name = Some(self.string_value()?);
                }
                "sources" => {
                    if sources.is_some() {
                        return Err(duplicate("sources"));
                    }
                    sources = Some(self.string_list()?);
                }
                "dependencies" => {
                    if dependencies.is_some() {
                        return Err(duplicate("dependencies"));
                    }
                    dependencies = Some(self.string_list()?);
                }
                "tags" => {
                    if tags.is_some() {
                        return Err(duplicate("tags"));
                    }
                    tags = Some(self.string_list()?);
                }
                "timeout" => {
                    if timeout.is_some() {
                        return Err(duplicate("timeout"));
                    }
                    if kind != TargetKind::Tests {
                        return Err(BuildFileError::TimeoutOnLibrary {
                            path: self.path.to_owned(),
                            line: field_line,
                            symbol: symbol.clone(),
                        });
                    }
                    timeout = Some(self.int_value()?);
                }
                other => {
                    return Err(BuildFileError::UnknownField {
                        path: self.path.to_owned(),
                        line: field_line,
                        symbol: symbol.clone(),
                        field: other.to_owned(),
                    });
                }
            }

            // Fields are comma-separated; a trailing comma before `)` is fine.
            match self.peek() {
                Some(Lexeme {
                    token: Token::Comma,
                    ..
                }) => {
                    self.pos += 1;
                }
                Some(Lexeme {
                    token: Token::RParen,
                    ..
                }) => {}
                _ => return Err(self.unexpected("`,` or `)`")),
            }
        }

        let name = name.ok_or(BuildFileError::MissingName {
            path: self.path.to_owned(),
            line,
            symbol,
        })?;

        Ok(TargetDecl {
            kind,
            name,
            sources: sources.unwrap_or_default(),
            dependencies: dependencies.unwrap_or_default(),
            tags: tags.unwrap_or_default(),
            timeout,
            line,
        })
    }

    fn string_value(&mut self) -> Result<String, BuildFileError> {
        match self.peek() {
            Some(Lexeme {
                token: Token::Str(s),
                ..
            }) => {
                let value = s.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected("a string")),
        }
    }

    fn int_value(&mut self) -> Result<u64, BuildFileError> {
        match self.peek() {
            Some(Lexeme {
                token: Token::Int(n),
                ..
            }) => {
                let value = *n;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected("an integer")),
        }
    }

    fn string_list(&mut self) -> Result<Vec<String>, BuildFileError> {
        self.expect(&Token::LBracket, "`[`")?;
        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some(Lexeme {
                    token: Token::RBracket,
                    ..
                }) => {
                    self.pos += 1;
                    break;
                }
                Some(Lexeme {
                    token: Token::Str(_),
                    ..
                }) => {
                    values.push(self.string_value()?);
                    match self.peek() {
                        Some(Lexeme {
                            token: Token::Comma,
                            ..
                        }) => {
                            self.pos += 1;
                        }
                        Some(Lexeme {
                            token: Token::RBracket,
                            ..
                        }) => {}
                        _ => return Err(self.unexpected("`,` or `]`")),
                    }
                }
                _ => return Err(self.unexpected("a string or `]`")),
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file() {
        let decls = parse_build_file("BUILD", "").unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn minimal_library() {
        let decls = parse_build_file("BUILD", "java_library(name = \"util\")").unwrap();
        assert_eq!(decls.len(), 1);
        let decl = decls.first().unwrap();
        assert_eq!(decl.kind, TargetKind::Library);
        assert_eq!(decl.name, "util");
        assert!(decl.sources.is_empty());
        assert!(decl.dependencies.is_empty());
        assert!(decl.tags.is_empty());
        assert_eq!(decl.timeout, None);
    }

    #[test]
    fn full_tests_target() {
        let decls = parse_build_file(
            "src/java/BUILD",
            r#"
            junit_tests(
                name = "tests",
                sources = ["*Test.java"],
                dependencies = [":util", "3rdparty:junit"],
                tags = ["integration", "platform_specific_behavior"],
                timeout = 120,
            )
            "#,
        )
        .unwrap();
        let decl = decls.first().unwrap();
        assert_eq!(decl.kind, TargetKind::Tests);
        assert_eq!(decl.name, "tests");
        assert_eq!(decl.sources, vec!["*Test.java"]);
        assert_eq!(decl.dependencies, vec![":util", "3rdparty:junit"]);
        assert_eq!(decl.tags, vec!["integration", "platform_specific_behavior"]);
        assert_eq!(decl.timeout, Some(120));
        assert_eq!(decl.line, 2);
    }

    #[test]
    fn multiple_declarations() {
        let decls = parse_build_file(
            "BUILD",
            "java_library(name=\"a\")\njunit_tests(name=\"b\", dependencies=[\":a\"])",
        )
        .unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls.get(1).unwrap().dependencies, vec![":a"]);
    }

    #[test]
    fn exclude_sources_preserved() {
        let decls = parse_build_file(
            "y/BUILD",
            "java_library(name=\"y\", sources=[\"*.java\", \"!fleem.java\"])",
        )
        .unwrap();
        assert_eq!(
            decls.first().unwrap().sources,
            vec!["*.java", "!fleem.java"]
        );
    }

    #[test]
    fn trailing_comma_in_list() {
        let decls = parse_build_file(
            "BUILD",
            "java_library(name=\"a\", sources=[\"x.java\", \"y.java\",])",
        )
        .unwrap();
        assert_eq!(decls.first().unwrap().sources.len(), 2);
    }

    #[test]
    fn empty_list() {
        let decls =
            parse_build_file("BUILD", "java_library(name=\"a\", dependencies=[])").unwrap();
        assert!(decls.first().unwrap().dependencies.is_empty());
    }

    #[test]
    fn unknown_target_type() {
        let err = parse_build_file("BUILD", "go_binary(name=\"a\")").unwrap_err();
        match err {
            BuildFileError::UnknownTargetType { symbol, known, .. } => {
                assert_eq!(symbol, "go_binary");
                assert!(known.contains("java_library"));
            }
            other => panic!("expected UnknownTargetType, got {other:?}"),
        }
    }

    #[test]
    fn unknown_field() {
        let err = parse_build_file("BUILD", "java_library(name=\"a\", exports=[])").unwrap_err();
        assert!(matches!(
            err,
            BuildFileError::UnknownField { ref field, .. } if field == "exports"
        ));
    }

    #[test]
    fn missing_name() {
        let err = parse_build_file("BUILD", "java_library(sources=[\"a.java\"])").unwrap_err();
        assert!(matches!(err, BuildFileError::MissingName { .. }));
    }

    #[test]
    fn duplicate_field() {
        let err =
            parse_build_file("BUILD", "java_library(name=\"a\", name=\"b\")").unwrap_err();
        assert!(matches!(err, BuildFileError::DuplicateField { .. }));
    }

    #[test]
    fn timeout_on_library_rejected() {
        let err =
            parse_build_file("BUILD", "java_library(name=\"a\", timeout=10)").unwrap_err();
        assert!(matches!(err, BuildFileError::TimeoutOnLibrary { .. }));
    }

    #[test]
    fn timeout_must_be_integer() {
        let err =
            parse_build_file("BUILD", "junit_tests(name=\"t\", timeout=\"10\")").unwrap_err();
        assert!(matches!(err, BuildFileError::UnexpectedToken { .. }));
    }

    #[test]
    fn name_must_be_string() {
        let err = parse_build_file("BUILD", "java_library(name=1)").unwrap_err();
        assert!(matches!(err, BuildFileError::UnexpectedToken { .. }));
    }

    #[test]
    fn duplicate_target_name_in_file() {
        let err = parse_build_file(
            "y/BUILD",
            "java_library(name=\"y\")\njunit_tests(name=\"y\")",
        )
        .unwrap_err();
        match err {
            BuildFileError::DuplicateTarget {
                name,
                line,
                first_line,
                ..
            } => {
                assert_eq!(name, "y");
                assert_eq!(first_line, 1);
                assert_eq!(line, 2);
            }
            other => panic!("expected DuplicateTarget, got {other:?}"),
        }
    }

    #[test]
    fn garbage_after_declaration() {
        let err = parse_build_file("BUILD", "java_library(name=\"a\") 42").unwrap_err();
        assert!(matches!(err, BuildFileError::UnexpectedToken { .. }));
    }

    #[test]
    fn unclosed_call_reports_eof() {
        let err = parse_build_file("BUILD", "java_library(name=\"a\"").unwrap_err();
        match err {
            BuildFileError::UnexpectedToken { found, .. } => {
                assert_eq!(found, "end of file");
            }
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn error_carries_path_and_line() {
        let err = parse_build_file("z/w/BUILD", "\n\njava_library(name=1)").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("z/w/BUILD:3"), "message was: {msg}");
    }

    #[test]
    fn parse_build_file_at_reads_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("BUILD");
        std::fs::write(&path, "java_library(name=\"disk\")").unwrap();
        let decls = parse_build_file_at(&path).unwrap();
        assert_eq!(decls.first().unwrap().name, "disk");
    }

    #[test]
    fn parse_build_file_at_missing_file() {
        let err = parse_build_file_at(Path::new("/nonexistent/BUILD")).unwrap_err();
        assert!(matches!(err, BuildFileError::Read { .. }));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::parse_build_file;

    use proptest::prelude::proptest;

    proptest! {
        /// Arbitrary input must never cause the parser to panic.
        #[test]
        fn parser_never_panics(content in ".{0,200}") {
            let _ = parse_build_file("BUILD", &content);
        }

        /// Any parsed declaration keeps its declared name verbatim.
        #[test]
        fn names_preserved(name in "[a-z][a-z0-9_-]{0,20}") {
            let content = format!("java_library(name=\"{name}\")");
            let decls = parse_build_file("BUILD", &content).unwrap();
            assert_eq!(decls.first().unwrap().name, name);
        }
    }
}
