//! Header Declaration Parser
//!
//! Walks the token stream of one header and builds a [`DeclFile`](crate::ir::DeclFile).
//! `#define` bodies and enum initializers are evaluated as they are met, so a
//! later declaration may refer to any constant defined earlier in the same file.

mod directives;
mod fields;
mod header_parser;

pub use header_parser::{parse_header, HeaderParser};
