//! Lexical analysis for C SDK headers
//!
//! Converts header text into tokens on demand. The caller chooses per call
//! whether line ends are significant, see [`ScanMode`].

mod header_scanner;
mod token;

pub use header_scanner::{HeaderScanner, ScanMode};
pub use token::{Token, TokenKind};
