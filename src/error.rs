//! Error types for sdkbind

use thiserror::Error;

/// Binding generator errors
///
/// Every variant is fatal for the run that produced it. Macros that cannot be
/// evaluated are not errors: the evaluator reports them as
/// [`Evaluation::Skipped`](crate::macro_eval::Evaluation::Skipped).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Front-end errors
    /// Malformed lexical input
    ///
    /// **Triggered by:** Unterminated string or character literals, unterminated block comments
    /// **Example:** `#define NAME "abc` at end of file
    #[error("{file}:{line}:{col}: {message}")]
    LexError {
        /// Header file being scanned
        file: String,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// An expected token was not found
    ///
    /// **Triggered by:** Header constructs the declaration parser does not accept
    /// **Example:** `typedef struct X { UINT a } X;` (missing `;` after field), a
    /// function-pointer field whose first parameter is not `This`
    #[error("{file}:{line}:{col}: expected {expected}, got `{got}`")]
    ParseError {
        /// Header file being parsed
        file: String,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Expected token description
        expected: String,
        /// Actual token text
        got: String,
    },

    /// A `#define` body left the evaluator in an invalid state
    ///
    /// **Triggered by:** A binary operator without two operands, a final stack of
    /// more than one value, a hexadecimal literal wider than 32 bits
    /// **Example:** `#define WIDE 0x123456789`
    #[error("macro `{name}`: {message}")]
    MacroEvaluation {
        /// Macro or enum constant being evaluated
        name: String,
        /// Error description
        message: String,
    },

    // Middle-end errors
    /// A transform pass met a type shape it cannot handle
    #[error("transform invariant violated in {context}: {message}")]
    TransformInvariant {
        /// Declaration being transformed
        context: String,
        /// Error description
        message: String,
    },

    /// A named cross-reference did not resolve to a declaration
    ///
    /// **Triggered by:** `MIDL_INTERFACE("..") Name` with no struct `Name`, or a vtable
    /// `NameVtbl` with no interface struct `Name` in the same file
    #[error("unresolved {kind} reference `{name}`")]
    UnresolvedReference {
        /// What kind of reference failed (GUID, vtable)
        kind: String,
        /// Identifier that failed to resolve
        name: String,
    },

    /// Two enum constants normalize to the same identifier with different values
    #[error("enum constant `{ident}` redefined with a different value ({first} vs {second})")]
    ConflictingEnumConstant {
        /// Normalized identifier
        ident: String,
        /// Value of the retained (first) definition
        first: String,
        /// Value of the conflicting definition
        second: String,
    },

    // Back-end errors
    /// The emitter cannot produce code for a declaration
    #[error("emission error: {0}")]
    EmissionError(String),

    // Environment errors
    /// File system failure
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Invalid configuration or rule table
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an emission error with a message
    pub fn emission(msg: impl Into<String>) -> Self {
        Error::EmissionError(msg.into())
    }

    /// Create a transform invariant error
    pub fn invariant(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TransformInvariant {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a macro evaluation error
    pub fn macro_eval(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MacroEvaluation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error together with the path it concerns
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Pipeline stage that produced the error, used in CLI diagnostics
    pub fn stage(&self) -> &'static str {
        match self {
            Error::LexError { .. } | Error::ParseError { .. } => "parse",
            Error::MacroEvaluation { .. } => "macro evaluation",
            Error::TransformInvariant { .. }
            | Error::UnresolvedReference { .. }
            | Error::ConflictingEnumConstant { .. } => "transform",
            Error::EmissionError(_) => "emit",
            Error::Io { .. } | Error::Config(_) => "setup",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type for sdkbind operations
pub type Result<T> = std::result::Result<T, Error>;
