use serde::{Deserialize, Serialize};

/// A single token from a header file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token (string literals keep their quotes)
    pub lexeme: String,
    /// Line number where token appears (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    /// Returns true if the token text equals `text`
    pub fn is(&self, text: &str) -> bool {
        self.lexeme == text
    }

    /// Column just past the last character of the token
    pub fn end_column(&self) -> usize {
        self.column + self.lexeme.chars().count()
    }

    /// Returns true if this token starts exactly where `prev` ends, with no
    /// whitespace in between
    pub fn is_adjacent_to(&self, prev: &Token) -> bool {
        self.line == prev.line && self.column == prev.end_column()
    }

    /// Returns true for end of input
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns true for line ends and end of input
    pub fn ends_line(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// Returns true for identifiers
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier)
    }
}

/// Token categories produced by the header scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Identifier or keyword (`typedef`, `UINT`, `D3D11_FILTER`)
    Identifier,
    /// Numeric literal without its type suffix (`42`, `0x1F`, `1.5`)
    Number,
    /// String literal with escapes resolved
    String(String),
    /// Character literal
    Char,
    /// Single punctuation character
    Punct,
    /// End of a logical line, only produced in line mode
    Newline,
    /// End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::String(s) => write!(f, "string \"{}\"", s),
            TokenKind::Char => write!(f, "character"),
            TokenKind::Punct => write!(f, "punctuation"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
