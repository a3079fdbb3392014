//! # sdkbind - Rust Bindings from C SDK Headers
//!
//! Reads vendor C headers (written for the DirectX SDK of June 2010) and
//! generates one Rust module with constants, `#[repr(C)]` records, type
//! aliases, enum constants, COM interface wrappers and exported function
//! wrappers that call through the Windows dynamic loader.
//!
//! ## Pipeline
//!
//! ```text
//! header text ──► lexer ──► parser ──► transform ──► emitter ──► module.rs
//!                  │          │           │             │
//!               tokens   macro_eval   RuleSet       prelude + merge
//!                        (#define)    (heuristics)  (file order wins)
//! ```
//!
//! Each header is handled on its own up to emission, so files can be
//! processed in parallel ([`GeneratorConfig::jobs`]). The final merge runs
//! sequentially in configuration order and drops any identifier an earlier
//! file already defined.
//!
//! ## Quick Start
//!
//! ```rust
//! use sdkbind::{parse_and_transform, Emitter, RuleSet};
//!
//! # fn main() -> sdkbind::Result<()> {
//! let rules = RuleSet::default();
//! let file = parse_and_transform(
//!     "d3d11.h",
//!     "#define D3D11_SDK_VERSION ( 7 )\n",
//!     &rules,
//!     false,
//! )?;
//!
//! let emitter = Emitter::new(&rules, "d3d11.dll");
//! let code = emitter.merge(&[emitter.emit_file(&file)?]);
//! assert!(code.contains("pub const SDK_VERSION: u32 = 7;"));
//! # Ok(())
//! # }
//! ```
//!
//! For a whole SDK, build a [`GeneratorConfig`] (or load one from JSON) and
//! hand it to [`Generator::run`].
//!
//! ## Error Handling
//!
//! Every failure is an [`Error`] and aborts the run. `#define` bodies the
//! evaluator does not understand are not failures: they are skipped and
//! logged at debug level.

/// Version of sdkbind
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod macro_eval;
pub mod parser;
pub mod pipeline;
pub mod transform;

// Re-export main types
pub use config::GeneratorConfig;
pub use emitter::Emitter;
pub use error::{Error, Result};
pub use ir::{DeclFile, Project};
pub use lexer::{HeaderScanner, ScanMode, Token, TokenKind};
pub use macro_eval::MacroEvaluator;
pub use parser::{parse_header, HeaderParser};
pub use pipeline::{builtin_file, parse_and_transform, GenerateReport, Generator};
pub use transform::{transform_file, RuleSet, Transformer};
