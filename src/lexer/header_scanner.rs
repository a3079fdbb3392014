use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// How line ends are treated by [`HeaderScanner::next_token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Newlines are ordinary whitespace
    Tokens,
    /// Each line end yields a [`TokenKind::Newline`]; backslash-newline is elided
    Lines,
}

/// Pull scanner for C header text
///
/// Tokens are produced on demand so the caller can switch between
/// [`ScanMode::Tokens`] and [`ScanMode::Lines`] mid-stream, which is how
/// `#define` bodies are delimited.
pub struct HeaderScanner {
    /// File name used in diagnostics
    file: String,
    /// Source code as character vector
    source: Vec<char>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Line and column where the current token starts
    start_line: usize,
    start_column: usize,
}

impl HeaderScanner {
    /// Creates a new scanner over `source`
    pub fn new(file: impl Into<String>, source: &str) -> Self {
        HeaderScanner {
            file: file.into(),
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// File name given at construction
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Scans all remaining tokens in one mode, including the final `Eof`
    pub fn scan_tokens(&mut self, mode: ScanMode) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(mode)?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Scans the next token
    pub fn next_token(&mut self, mode: ScanMode) -> Result<Token> {
        self.skip_trivia(mode)?;

        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, "", self.line, self.column));
        }

        let c = self.advance();
        match c {
            '\n' => Ok(self.make_token(TokenKind::Newline)),
            '"' => self.scan_string(),
            '\'' => self.scan_char(),
            c if c.is_ascii_digit() => Ok(self.scan_number()),
            '.' if self.peek().is_ascii_digit() => Ok(self.scan_number()),
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_identifier()),
            _ => Ok(self.make_token(TokenKind::Punct)),
        }
    }

    /// Skips whitespace, comments and line continuations. In line mode a bare
    /// newline is left for `next_token` to report.
    fn skip_trivia(&mut self, mode: ScanMode) -> Result<()> {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '\n' if mode == ScanMode::Tokens => {
                    self.advance();
                }
                '\\' if self.continues_line() => {
                    self.advance();
                    if self.peek() == '\r' {
                        self.advance();
                    }
                    self.advance();
                }
                '/' if self.peek_next() == '/' => self.skip_line_comment(),
                '/' if self.peek_next() == '*' => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn continues_line(&self) -> bool {
        match self.peek_next() {
            '\n' => true,
            '\r' => self.source.get(self.current + 2) == Some(&'\n'),
            _ => false,
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.column);
        self.advance(); // '/'
        self.advance(); // '*'
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
        Err(self.error_at(line, col, "unterminated block comment"))
    }

    fn scan_string(&mut self) -> Result<Token> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            match self.peek() {
                '\n' => break,
                '\\' => {
                    self.advance();
                    let escaped = self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' | '"' | '\'' => value.push(escaped),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                _ => value.push(self.advance()),
            }
        }

        if self.peek() != '"' {
            return Err(self.error_at(self.start_line, self.start_column, "unterminated string"));
        }
        self.advance(); // Closing "

        Ok(self.make_token(TokenKind::String(value)))
    }

    fn scan_char(&mut self) -> Result<Token> {
        while !self.is_at_end() && self.peek() != '\'' && self.peek() != '\n' {
            if self.peek() == '\\' {
                self.advance();
            }
            self.advance();
        }

        if self.peek() != '\'' {
            return Err(self.error_at(
                self.start_line,
                self.start_column,
                "unterminated character literal",
            ));
        }
        self.advance();

        Ok(self.make_token(TokenKind::Char))
    }

    fn scan_number(&mut self) -> Token {
        let first = self.source[self.start];
        if first == '0' && matches!(self.peek(), 'x' | 'X') && self.peek_next().is_ascii_hexdigit()
        {
            self.advance(); // x
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            return self.make_token(TokenKind::Number);
        }

        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && first != '.' {
            self.advance();
        }
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Exponent: 1e10, 3.4e+38
        if matches!(self.peek(), 'e' | 'E') {
            let sign = matches!(self.peek_next(), '+' | '-');
            let digit_at = if sign { self.current + 2 } else { self.current + 1 };
            if self
                .source
                .get(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                self.advance();
                if sign {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        self.make_token(TokenKind::Identifier)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Consumes one character, `'\0'` at end of input
    fn advance(&mut self) -> char {
        let Some(&c) = self.source.get(self.current) else {
            return '\0';
        };
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme: String = if matches!(kind, TokenKind::Newline) {
            String::from("\n")
        } else {
            self.source[self.start..self.current].iter().collect()
        };
        Token::new(kind, lexeme, self.start_line, self.start_column)
    }

    fn error_at(&self, line: usize, col: usize, message: &str) -> Error {
        Error::LexError {
            file: self.file.clone(),
            line,
            col,
            message: message.to_string(),
        }
    }
}
