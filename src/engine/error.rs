use std::fmt;

use thiserror::Error;

/// Line and column (both 1-based) of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Early error raised while tokenizing or parsing a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("SyntaxError: {message} ({pos})")]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Unexpected token '}'", Pos::new(3, 7));
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token '}' (3:7)");
    }
}
