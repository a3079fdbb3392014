//! # Declaration IR
//!
//! Header declarations as the parser produces them and the transform passes
//! rewrite them. Everything here derives serde so a file can be dumped as JSON
//! with the same field names it carries in memory (PascalCase).
//!
//! ```text
//! Project
//! └── DeclFile (one per header)
//!     ├── Macro      { Ident, Value }
//!     ├── TypeAlias  { Ident, Alias }
//!     ├── Enum       { Ident, Fields: [EnumField { Ident, Value }] }
//!     ├── Struct     { Ident, Fields: [StructField], GUID, GUIDParts, Vtbl }
//!     └── Function   { Ident, DLLCall, Parameters: [StructField] }
//! ```

mod decl;
mod types;
mod value;

pub use decl::{DeclFile, Enum, EnumField, Function, GuidParts, Macro, Project, Struct, TypeAlias};
pub use types::{Annotations, StructField, TypeInfo, TypeKind, BEGIN_INTERFACE};
pub use value::Value;
