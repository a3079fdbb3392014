//! Constants, records, aliases and enums

use super::{resolved_type, rust_ident, Emitter, Fragment, Namespace};
use crate::error::{Error, Result};
use crate::ir::{DeclFile, Enum, GuidParts, Struct, StructField, TypeKind, Value};

impl<'r> Emitter<'r> {
    /// `pub const` block for the file's macros. Ignored constants and macros
    /// whose value is their own name are left out.
    pub(super) fn emit_macros(&self, file: &DeclFile, fragments: &mut Vec<Fragment>) -> Result<()> {
        let mut header = false;
        for m in &file.macros {
            if self.rules.ignores_constant(&m.ident) || m.value.resolve() == m.ident {
                continue;
            }
            if !header {
                fragments.push(Fragment::Text(format!("// Macros ({})\n", file.filename)));
                header = true;
            }
            let ident = rust_ident(&m.ident)?;
            let (ty, value) = constant(&m.value);
            fragments.push(Fragment::Item {
                namespace: Namespace::Value,
                text: format!("pub const {}: {} = {};\n", ident, ty, value),
                ident,
            });
        }
        if header {
            fragments.push(Fragment::Text("\n".to_string()));
        }
        Ok(())
    }

    /// The record itself, its GUID accessor and methods, and its vtable
    pub(super) fn emit_struct(&self, s: &Struct, fragments: &mut Vec<Fragment>) -> Result<()> {
        let ident = rust_ident(&s.ident)?;
        let mut text = record(&ident, &s.fields, field_line)?;

        let mut items = Vec::new();
        if let Some(parts) = &s.guid_parts {
            items.push(guid_accessor(s.guid.as_deref(), parts));
        }
        if let Some(vtbl) = &s.vtbl {
            let vtbl_field = s
                .fields
                .first()
                .ok_or_else(|| Error::emission(format!("`{}` has a vtable but no fields", s.ident)))?;
            for method in vtbl.fields.iter().filter(|f| !f.is_marker()) {
                items.push(self.emit_method(&vtbl_field.name, method)?);
            }
        }
        if !items.is_empty() {
            text.push_str(&format!("impl {} {{\n{}}}\n\n", ident, items.join("\n")));
        }

        fragments.push(Fragment::Item {
            namespace: Namespace::Type,
            ident,
            text,
        });

        if let Some(vtbl) = &s.vtbl {
            let vtbl_ident = rust_ident(&vtbl.ident)?;
            let methods: Vec<StructField> = vtbl.fields.iter().filter(|f| !f.is_marker()).cloned().collect();
            let text = record(&vtbl_ident, &methods, |method| {
                Ok(format!("    pub {}: usize,\n", rust_ident(&method.name)?))
            })?;
            fragments.push(Fragment::Item {
                namespace: Namespace::Type,
                ident: vtbl_ident,
                text,
            });
        }
        Ok(())
    }

    /// `pub type` lines, skipping aliases of themselves
    pub(super) fn emit_aliases(&self, file: &DeclFile, fragments: &mut Vec<Fragment>) -> Result<()> {
        let mut any = false;
        for alias in &file.type_aliases {
            if alias.ident == alias.alias {
                continue;
            }
            let ident = rust_ident(&alias.ident)?;
            fragments.push(Fragment::Item {
                namespace: Namespace::Type,
                text: format!("pub type {} = {};\n", ident, alias.alias),
                ident,
            });
            any = true;
        }
        if any {
            fragments.push(Fragment::Text("\n".to_string()));
        }
        Ok(())
    }

    /// `pub type E = u32;` and one typed constant per field
    pub(super) fn emit_enum(&self, e: &Enum, fragments: &mut Vec<Fragment>) -> Result<()> {
        let ident = rust_ident(&e.ident)?;
        fragments.push(Fragment::Item {
            namespace: Namespace::Type,
            text: format!("pub type {} = u32;\n", ident),
            ident: ident.clone(),
        });
        for field in &e.fields {
            let value = field.value.resolve();
            if value == field.ident {
                continue;
            }
            let field_ident = rust_ident(&field.ident)?;
            fragments.push(Fragment::Item {
                namespace: Namespace::Value,
                text: format!("pub const {}: {} = {};\n", field_ident, ident, value),
                ident: field_ident,
            });
        }
        fragments.push(Fragment::Text("\n".to_string()));
        Ok(())
    }
}

/// `#[repr(C)]` struct with one line per field
fn record<F>(ident: &str, fields: &[StructField], line: F) -> Result<String>
where
    F: Fn(&StructField) -> Result<String>,
{
    if fields.is_empty() {
        return Err(Error::emission(format!("struct `{}` has no fields", ident)));
    }
    let mut text = format!("#[repr(C)]\n#[derive(Debug, Clone, Copy)]\npub struct {} {{\n", ident);
    for field in fields {
        text.push_str(&line(field)?);
    }
    text.push_str("}\n\n");
    Ok(text)
}

fn field_line(field: &StructField) -> Result<String> {
    if let TypeKind::Union { fields } = &field.type_info.kind {
        let members = fields
            .iter()
            .map(|f| Ok(format!("{}: {}", f.name, resolved_type(f)?)))
            .collect::<Result<Vec<_>>>()?;
        return Ok(format!("    // union {{ {} }}\n", members.join(", ")));
    }
    let ty = if field.is_deref {
        "usize"
    } else {
        resolved_type(field)?
    };
    Ok(format!("    pub {}: {},\n", rust_ident(&field.name)?, ty))
}

fn guid_accessor(guid: Option<&str>, parts: &GuidParts) -> String {
    let data4 = parts
        .data4
        .iter()
        .map(|b| format!("0x{:02x}", b))
        .collect::<Vec<_>>()
        .join(", ");
    let mut text = String::new();
    if let Some(guid) = guid {
        text.push_str(&format!("    /// Interface identifier `{}`\n", guid));
    }
    text.push_str(&format!(
        "    pub const IID: GUID = GUID {{ Data1: 0x{:08x}, Data2: 0x{:04x}, Data3: 0x{:04x}, Data4: [{}] }};\n\n",
        parts.data1, parts.data2, parts.data3, data4
    ));
    text.push_str("    pub fn guid() -> GUID {\n        Self::IID\n    }\n");
    text
}

/// Type and literal of a constant
fn constant(value: &Value) -> (&'static str, String) {
    match value {
        Value::U32(v) => ("u32", v.to_string()),
        Value::Str(s) => ("&str", format!("{:?}", s)),
        Value::Raw(raw) => (raw_type(raw), raw.clone()),
    }
}

/// Infers the type of an unresolved constant from its text
fn raw_type(raw: &str) -> &'static str {
    if let Ok(v) = raw.parse::<i64>() {
        return if v < i64::from(i32::MIN) {
            "i64"
        } else if v < 0 {
            "i32"
        } else if v > i64::from(u32::MAX) {
            "u64"
        } else {
            "u32"
        };
    }
    if raw.parse::<f64>().is_ok() {
        return "f32";
    }
    "u32"
}
