//! # Macro Expression Evaluator
//!
//! Turns the body of a `#define` (or the initializer of an enum constant) into
//! a [`Value`]. Evaluation runs in two steps:
//!
//! ```text
//! tokens ──► postfix::to_postfix ──► machine::run ──► Value
//!            (shunting-yard)         (stack machine)
//! ```
//!
//! Bodies that are not constant expressions are skipped rather than rejected:
//! function-like macros, bodies that call a function, and bodies referencing
//! unknown identifiers all yield [`Evaluation::Skipped`]. Only a corrupt
//! evaluation state is an [`Error`](crate::Error).
//!
//! ## Precedence
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `\|\|` |
//! | 2 | `&&` |
//! | 3 | `==` `!=` |
//! | 4 | `\|` `&` `<<` `>>` |
//! | 5 | `+` `-` `*` `/` |
//! | 9 | `<` `<=` `>` `>=` |
//!
//! A lower level binds tighter; equal levels associate left.

mod machine;
pub mod postfix;
mod table;

pub use machine::{Computed, Number};
pub use table::MacroTable;

use crate::error::{Error, Result};
use crate::ir::Value;
use crate::lexer::Token;
use std::fmt;

/// Why a body was not turned into a constant
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    EmptyBody,
    /// `(` directly after the macro name
    FunctionLike,
    /// `(` directly after an identifier inside the body
    FunctionCall { callee: String },
    /// Identifier not present in the macro table
    Unresolved { ident: String },
    Unsupported { token: String },
    Unbalanced,
    Malformed(String),
    InvalidArithmetic(String),
    StringOperand,
    /// Listed in the rule table's skip list
    Listed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyBody => write!(f, "empty body"),
            SkipReason::FunctionLike => write!(f, "function-like macro"),
            SkipReason::FunctionCall { callee } => write!(f, "calls `{}`", callee),
            SkipReason::Unresolved { ident } => write!(f, "unresolved identifier `{}`", ident),
            SkipReason::Unsupported { token } => write!(f, "unsupported token `{}`", token),
            SkipReason::Unbalanced => write!(f, "unbalanced parentheses"),
            SkipReason::Malformed(msg) => write!(f, "malformed expression: {}", msg),
            SkipReason::InvalidArithmetic(expr) => write!(f, "undefined arithmetic `{}`", expr),
            SkipReason::StringOperand => write!(f, "string used as an operand"),
            SkipReason::Listed => write!(f, "listed in skip rules"),
        }
    }
}

/// Outcome of evaluating one body
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Resolved(Value),
    Skipped(SkipReason),
}

impl Evaluation {
    pub fn value(self) -> Option<Value> {
        match self {
            Evaluation::Resolved(value) => Some(value),
            Evaluation::Skipped(_) => None,
        }
    }
}

/// Where the evaluated value will live. Enum constants are stored in 32 bits,
/// so negative results wrap instead of staying raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueContext {
    Macro,
    EnumField,
}

/// Evaluates expressions against a table of earlier results
pub struct MacroEvaluator<'t> {
    table: &'t MacroTable,
}

impl<'t> MacroEvaluator<'t> {
    pub fn new(table: &'t MacroTable) -> Self {
        MacroEvaluator { table }
    }

    /// Evaluates `#define name body...`
    pub fn evaluate_define(&self, name: &Token, body: &[Token]) -> Result<Evaluation> {
        let Some(first) = body.first() else {
            return Ok(Evaluation::Skipped(SkipReason::EmptyBody));
        };
        if first.is("(") && first.is_adjacent_to(name) {
            return Ok(Evaluation::Skipped(SkipReason::FunctionLike));
        }
        self.evaluate_expression(&name.lexeme, body, ValueContext::Macro)
    }

    /// Evaluates a bare expression such as an enum initializer
    pub fn evaluate_expression(
        &self,
        name: &str,
        tokens: &[Token],
        context: ValueContext,
    ) -> Result<Evaluation> {
        if tokens.is_empty() {
            return Ok(Evaluation::Skipped(SkipReason::EmptyBody));
        }
        if let Some(callee) = find_call(tokens) {
            return Ok(Evaluation::Skipped(SkipReason::FunctionCall { callee }));
        }

        let items = match postfix::to_postfix(tokens) {
            Ok(items) => items,
            Err(reason) => return Ok(Evaluation::Skipped(reason)),
        };

        Ok(match machine::run(name, &items, self.table)? {
            Computed::Number(n) => Evaluation::Resolved(number_to_value(n, context)),
            Computed::Str(s) => Evaluation::Resolved(Value::Str(s)),
            Computed::Skipped(reason) => Evaluation::Skipped(reason),
        })
    }
}

/// Returns the callee of the first `identifier(` pair written without a space
fn find_call(tokens: &[Token]) -> Option<String> {
    tokens.windows(2).find_map(|pair| {
        let (callee, paren) = (&pair[0], &pair[1]);
        (paren.is("(") && callee.is_identifier() && paren.is_adjacent_to(callee))
            .then(|| callee.lexeme.clone())
    })
}

/// Converts a numeric result to its stored form
pub fn number_to_value(n: Number, context: ValueContext) -> Value {
    if n.float || n.value.fract() != 0.0 {
        return Value::Raw(format!("{:?}", n.value));
    }

    let v = n.value;
    if (0.0..=f64::from(u32::MAX)).contains(&v) {
        return Value::U32(v as u32);
    }
    if context == ValueContext::EnumField && v < 0.0 && v >= f64::from(i32::MIN) {
        return Value::U32(v as i32 as u32);
    }
    Value::Raw(format!("{}", v as i64))
}

/// Parses a hexadecimal literal. The storage width follows the digit count:
/// up to 2 digits is a byte, up to 4 a half-word, up to 8 a word. Wider
/// literals are rejected.
pub fn parse_hex(name: &str, text: &str) -> Result<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits = digits.trim_end_matches(|c: char| c == 'L' || c == 'l');

    let invalid =
        |_: std::num::ParseIntError| Error::macro_eval(name, format!("invalid hex literal `{}`", text));
    match digits.len() {
        1..=2 => u8::from_str_radix(digits, 16).map(u32::from).map_err(invalid),
        3..=4 => u16::from_str_radix(digits, 16).map(u32::from).map_err(invalid),
        5..=8 => u32::from_str_radix(digits, 16).map_err(invalid),
        0 => Err(Error::macro_eval(name, format!("empty hex literal `{}`", text))),
        width => Err(Error::macro_eval(
            name,
            format!("hex literal `{}` has {} digits, at most 8 fit", text, width),
        )),
    }
}
