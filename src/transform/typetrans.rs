//! Built-in C type translation

use super::rules::RuleSet;
use crate::ir::{TypeInfo, TypeKind};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Target of `typedef UINT NAME;`
pub const UINT_TARGET: &str = "u32";

lazy_static! {
    /// C header type name to Rust type
    static ref BUILTIN_TYPES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        // Integers
        m.insert("INT", "i32");
        m.insert("int", "i32");
        m.insert("UINT", "u32");
        m.insert("INT8", "i8");
        m.insert("UINT8", "u8");
        m.insert("BYTE", "u8");
        m.insert("BOOLEAN", "u8");
        m.insert("char", "i8");
        m.insert("CHAR", "i8");
        m.insert("SHORT", "i16");
        m.insert("USHORT", "u16");
        m.insert("WORD", "u16");
        m.insert("INT16", "i16");
        m.insert("UINT16", "u16");
        m.insert("WCHAR", "u16");
        m.insert("LONG", "i32");
        m.insert("ULONG", "u32");
        m.insert("DWORD", "u32");
        m.insert("INT64", "i64");
        m.insert("UINT64", "u64");
        m.insert("LARGE_INTEGER", "i64");
        m.insert("LUID", "i64");
        m.insert("SIZE_T", "usize");
        m.insert("UINT_PTR", "usize");
        m.insert("BOOL", "i32");
        m.insert("HRESULT", "i32");
        m.insert("ENUM", "u32");
        // Floating point
        m.insert("FLOAT", "f32");
        m.insert("float", "f32");
        m.insert("DOUBLE", "f64");
        m.insert("double", "f64");
        // Pointer-sized handles
        m.insert("HANDLE", "usize");
        m.insert("HDC", "usize");
        m.insert("HMONITOR", "usize");
        m.insert("HWND", "usize");
        m.insert("HMODULE", "usize");
        m.insert("LPSTR", "*mut u8");
        m.insert("LPCSTR", "*const u8");
        m.insert("LPCWSTR", "*const u16");
        m.insert("LPVOID", "*mut c_void");
        m.insert("LPCVOID", "*const c_void");
        m.insert("REFGUID", "*const GUID");
        m.insert("REFIID", "*const GUID");
        m.insert("REFCLSID", "*const GUID");
        // Records and opaque pointees
        m.insert("GUID", "GUID");
        m.insert("IID", "GUID");
        m.insert("RECT", "Rect");
        m.insert("void", "c_void");
        m.insert("VOID", "c_void");
        m.insert("IUnknown", "c_void");
        m
    };
}

/// Looks up a built-in translation
pub fn builtin(ident: &str) -> Option<&'static str> {
    BUILTIN_TYPES.get(ident).copied()
}

/// Translates a single type name, normalizing anything that is not built in
pub fn translate_ident(ident: &str, rules: &RuleSet) -> String {
    let ident = ident
        .trim_start_matches("CONST_VTBL ")
        .trim_start_matches("struct ")
        .trim();
    match builtin(ident) {
        Some(target) => target.to_string(),
        None => rules.normalize(ident),
    }
}

/// Emission-ready type string for `info`
pub fn resolve_type(info: &TypeInfo, rules: &RuleSet) -> String {
    match &info.kind {
        TypeKind::Basic => translate_ident(&info.ident, rules),
        TypeKind::Array { dimens } => dimens
            .iter()
            .rev()
            .fold(translate_ident(&info.ident, rules), |elem, n| {
                format!("[{}; {}]", elem, n)
            }),
        TypeKind::Union { .. } => "union".to_string(),
        TypeKind::FunctionPointer { .. } => "usize".to_string(),
        TypeKind::Pointer { depth, inner } => {
            format!("{}{}", "*mut ".repeat(*depth), resolve_type(inner, rules))
        }
    }
}

/// Strips one level of indirection from a resolved pointer type
pub fn deref_resolved(resolved: &str) -> &str {
    resolved
        .strip_prefix("*mut ")
        .or_else(|| resolved.strip_prefix("*const "))
        .unwrap_or(resolved)
}

/// Returns true for resolved types that travel as floating point
pub fn is_float(resolved: &str) -> bool {
    matches!(resolved, "f32" | "f64")
}
