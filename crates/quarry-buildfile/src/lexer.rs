//! Lexer for BUILD files.

use crate::error::BuildFileError;

/// A single token with no position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(u64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Comma,
}

impl Token {
    /// A short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("`{name}`"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::Int(n) => format!("integer {n}"),
            Self::LParen => "`(`".to_owned(),
            Self::RParen => "`)`".to_owned(),
            Self::LBracket => "`[`".to_owned(),
            Self::RBracket => "`]`".to_owned(),
            Self::Eq => "`=`".to_owned(),
            Self::Comma => "`,`".to_owned(),
        }
    }
}

/// A token paired with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub line: u32,
}

/// Tokenize the content of a BUILD file.
///
/// `#` starts a comment running to end of line. Strings may be single- or
/// double-quoted and support `\\`, `\'`, `\"`, `\n`, and `\t` escapes.
///
/// # Errors
/// Returns an error on unterminated strings, invalid escapes, integer
/// overflow, or characters outside the BUILD grammar.
pub fn lex(path: &str, content: &str) -> Result<Vec<Lexeme>, BuildFileError> {
    let mut lexemes = Vec::new();
    let mut chars = content.chars().peekable();
    let mut line: u32 = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line = line.saturating_add(1);
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment to end of line.
                for comment_char in chars.by_ref() {
                    if comment_char == '\n' {
                        line = line.saturating_add(1);
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::LParen,
                    line,
                });
            }
            ')' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::RParen,
                    line,
                });
            }
            '[' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::LBracket,
                    line,
                });
            }
            ']' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::RBracket,
                    line,
                });
            }
            '=' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::Eq,
                    line,
                });
            }
            ',' => {
                chars.next();
                lexemes.push(Lexeme {
                    token: Token::Comma,
                    line,
                });
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let start_line = line;
                let mut value = String::new();
                let mut terminated = false;
                while let Some(string_char) = chars.next() {
                    match string_char {
                        '\\' => {
                            let escape = chars.next().ok_or(BuildFileError::UnterminatedString {
                                path: path.to_owned(),
                                line: start_line,
                            })?;
                            match escape {
                                '\\' => value.push('\\'),
                                '\'' => value.push('\''),
                                '"' => value.push('"'),
                                'n' => value.push('\n'),
                                't' => value.push('\t'),
                                other => {
                                    return Err(BuildFileError::InvalidEscape {
                                        path: path.to_owned(),
                                        line,
                                        escape: other,
                                    })
                                }
                            }
                        }
                        '\n' => {
                            // Strings do not span lines.
                            return Err(BuildFileError::UnterminatedString {
                                path: path.to_owned(),
                                line: start_line,
                            });
                        }
                        c2 if c2 == quote => {
                            terminated = true;
                            break;
                        }
                        other => value.push(other),
                    }
                }
                if !terminated {
                    return Err(BuildFileError::UnterminatedString {
                        path: path.to_owned(),
                        line: start_line,
                    });
                }
                lexemes.push(Lexeme {
                    token: Token::Str(value),
                    line: start_line,
                });
            }
            c if c.is_ascii_digit() => {
                let mut value: u64 = 0;
                while let Some(&digit) = chars.peek() {
                    let Some(d) = digit.to_digit(10) else { break };
                    chars.next();
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u64::from(d)))
                        .ok_or(BuildFileError::IntegerOverflow {
                            path: path.to_owned(),
                            line,
                        })?;
                }
                lexemes.push(Lexeme {
                    token: Token::Int(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&ident_char) = chars.peek() {
                    if ident_char.is_ascii_alphanumeric() || ident_char == '_' {
                        name.push(ident_char);
                        chars.next();
                    } else {
                        break;
                    }
                }
                lexemes.push(Lexeme {
                    token: Token::Ident(name),
                    line,
                });
            }
            other => {
                return Err(BuildFileError::UnexpectedChar {
                    path: path.to_owned(),
                    line,
                    ch: other,
                });
            }
        }
    }

    Ok(lexemes)
}
