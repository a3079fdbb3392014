//! # Binding Emitter
//!
//! Turns transformed declaration files into one Rust module. Each file is
//! emitted on its own into a list of [`Fragment`]s, so files can be emitted in
//! parallel. [`Emitter::merge`] then concatenates the fragments in file order
//! behind the prelude, dropping any identifier an earlier file already defined.
//!
//! ```text
//! DeclFile ──► emit_file ──► EmittedFile { fragments }
//!                                  │
//!        prelude + merge(files) ◄──┘  ("already defined" filter)
//! ```
//!
//! Within a file, declarations are emitted as macros, functions, structs
//! (with GUID accessors, vtables and methods), type aliases, then enums.

mod calls;
mod decls;
mod prelude;

pub use calls::{CallBucket, MAX_CALL_SLOTS};
pub use prelude::{prelude, PRELUDE_TYPES, PRELUDE_VALUES};

use crate::error::{Error, Result};
use crate::ir::{DeclFile, Project, StructField};
use crate::transform::RuleSet;
use std::collections::HashSet;

/// Namespace an emitted item is defined in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Constants, statics and functions
    Value,
    /// Structs and type aliases
    Type,
}

/// One piece of emitted code
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Code defining `ident`, dropped if an earlier file defined it
    Item {
        namespace: Namespace,
        ident: String,
        text: String,
    },
    /// Code always kept (comments, separators)
    Text(String),
}

/// Fragments of one declaration file
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedFile {
    pub filename: String,
    pub fragments: Vec<Fragment>,
}

/// Rust code generator for transformed declaration files
pub struct Emitter<'r> {
    rules: &'r RuleSet,
    dll_name: String,
    /// Struct identifiers across the project, passed by address when taken
    /// by value
    records: HashSet<String>,
}

impl<'r> Emitter<'r> {
    pub fn new(rules: &'r RuleSet, dll_name: impl Into<String>) -> Self {
        Emitter {
            rules,
            dll_name: dll_name.into(),
            records: HashSet::new(),
        }
    }

    /// Registers the structs declared by `files`
    pub fn with_records<'a>(mut self, files: impl IntoIterator<Item = &'a DeclFile>) -> Self {
        for file in files {
            self.records
                .extend(file.structs.iter().map(|s| s.ident.clone()));
        }
        self
    }

    /// Emits every declaration of one file
    pub fn emit_file(&self, file: &DeclFile) -> Result<EmittedFile> {
        let mut fragments = Vec::new();

        self.emit_macros(file, &mut fragments)?;
        for function in &file.functions {
            fragments.push(Fragment::Item {
                namespace: Namespace::Value,
                ident: rust_ident(&function.ident)?,
                text: self.emit_function(function)?,
            });
        }
        for s in &file.structs {
            self.emit_struct(s, &mut fragments)?;
        }
        self.emit_aliases(file, &mut fragments)?;
        for e in &file.enums {
            self.emit_enum(e, &mut fragments)?;
        }

        tracing::debug!("emitted {}: {} fragments", file.filename, fragments.len());
        Ok(EmittedFile {
            filename: file.filename.clone(),
            fragments,
        })
    }

    /// Joins emitted files behind the prelude. An item whose identifier was
    /// already defined in its namespace is dropped.
    pub fn merge(&self, files: &[EmittedFile]) -> String {
        let mut values: HashSet<&str> = PRELUDE_VALUES.iter().copied().collect();
        let mut types: HashSet<&str> = PRELUDE_TYPES.iter().copied().collect();

        let mut output = prelude(&self.dll_name);
        for file in files {
            for fragment in &file.fragments {
                match fragment {
                    Fragment::Item {
                        namespace,
                        ident,
                        text,
                    } => {
                        let defined = match namespace {
                            Namespace::Value => &mut values,
                            Namespace::Type => &mut types,
                        };
                        if defined.insert(ident.as_str()) {
                            output.push_str(text);
                        } else {
                            tracing::debug!("{}: `{}` already defined", file.filename, ident);
                        }
                    }
                    Fragment::Text(text) => output.push_str(text),
                }
            }
        }
        output
    }

    /// Emits a whole project sequentially
    pub fn emit_project(&self, project: &Project) -> Result<String> {
        let files = project
            .files
            .iter()
            .map(|file| self.emit_file(file))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.merge(&files))
    }
}

/// Emission-ready type of a field
pub(crate) fn resolved_type(field: &StructField) -> Result<&str> {
    field
        .type_info
        .resolved
        .as_deref()
        .ok_or_else(|| Error::emission(format!("field `{}` has no resolved type", field.name)))
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers
const RESERVED: &[&str] = &["crate", "self", "Self", "super", "_"];

/// Makes `name` usable as a Rust identifier
pub fn rust_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::emission("empty identifier"));
    }
    if RESERVED.contains(&name) {
        return Ok(format!("{}_", name));
    }
    if KEYWORDS.contains(&name) {
        return Ok(format!("r#{}", name));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(format!("_{}", name));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Macro, Value};

    #[test]
    fn test_rust_ident() {
        assert_eq!(rust_ident("Flags").unwrap(), "Flags");
        assert_eq!(rust_ident("type").unwrap(), "r#type");
        assert_eq!(rust_ident("self").unwrap(), "self_");
        assert_eq!(rust_ident("1D").unwrap(), "_1D");
        assert!(matches!(rust_ident(""), Err(Error::EmissionError(_))));
    }

    #[test]
    fn test_merge_drops_redefinitions_per_namespace() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let item = |namespace, ident: &str, text: &str| Fragment::Item {
            namespace,
            ident: ident.to_string(),
            text: text.to_string(),
        };
        let files = vec![
            EmittedFile {
                filename: "a.h".into(),
                fragments: vec![
                    item(Namespace::Value, "X", "pub const X: u32 = 1;\n"),
                    item(Namespace::Type, "X", "pub type X = u32;\n"),
                ],
            },
            EmittedFile {
                filename: "b.h".into(),
                fragments: vec![
                    Fragment::Text("// b.h\n".into()),
                    item(Namespace::Value, "X", "pub const X: u32 = 2;\n"),
                ],
            },
        ];

        let output = emitter.merge(&files);
        assert!(output.contains("pub const X: u32 = 1;\n"));
        assert!(output.contains("pub type X = u32;\n"));
        assert!(output.contains("// b.h\n"));
        assert!(!output.contains("pub const X: u32 = 2;"));
    }

    #[test]
    fn test_file_order_wins() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let mut first = DeclFile::new("first.h");
        first.macros.push(Macro {
            ident: "SHARED".into(),
            value: Value::U32(1),
        });
        let mut second = DeclFile::new("second.h");
        second.macros.push(Macro {
            ident: "SHARED".into(),
            value: Value::U32(2),
        });
        let project = Project {
            files: vec![first, second],
        };

        let output = emitter.emit_project(&project).unwrap();
        assert!(output.contains("pub const SHARED: u32 = 1;"));
        assert!(!output.contains("pub const SHARED: u32 = 2;"));
    }

    #[test]
    fn test_prelude_names_are_reserved() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let files = vec![EmittedFile {
            filename: "a.h".into(),
            fragments: vec![Fragment::Item {
                namespace: Namespace::Type,
                ident: "Error".into(),
                text: "pub type Error = u32;\n".into(),
            }],
        }];
        assert!(!emitter.merge(&files).contains("pub type Error = u32;"));
    }
}
