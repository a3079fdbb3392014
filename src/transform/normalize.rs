//! Identifier normalization and type resolution

use super::rules::RuleSet;
use super::typetrans::{resolve_type, translate_ident};
use crate::ir::{DeclFile, StructField, Struct, TypeKind, Value};

/// Strips vendor prefixes from declaration identifiers and raw values, and
/// fills in the emission-ready type of every field.
///
/// `TypeInfo::ident` keeps the name as written so later passes can classify
/// pointees by their header names.
pub(super) fn normalize_file(file: &mut DeclFile, rules: &RuleSet) {
    for m in &mut file.macros {
        m.ident = rules.normalize(&m.ident);
        normalize_value(&mut m.value, rules);
    }

    for alias in &mut file.type_aliases {
        alias.ident = rules.normalize(&alias.ident);
        alias.alias = translate_ident(&alias.alias, rules);
    }

    for e in &mut file.enums {
        e.ident = rules.normalize(&e.ident);
        for field in &mut e.fields {
            field.ident = rules.normalize(&field.ident);
            normalize_value(&mut field.value, rules);
        }
    }

    for s in &mut file.structs {
        normalize_struct(s, rules);
    }

    for function in &mut file.functions {
        function.ident = rules.normalize(&function.ident);
        resolve_fields(&mut function.parameters, rules);
    }
}

fn normalize_value(value: &mut Value, rules: &RuleSet) {
    if let Value::Raw(raw) = value {
        *raw = rules.normalize(raw);
    }
}

fn normalize_struct(s: &mut Struct, rules: &RuleSet) {
    s.ident = rules.normalize(&s.ident);
    resolve_fields(&mut s.fields, rules);
    if let Some(vtbl) = s.vtbl.as_mut() {
        normalize_struct(vtbl, rules);
    }
}

fn resolve_fields(fields: &mut [StructField], rules: &RuleSet) {
    for field in fields {
        field.type_info.resolved = Some(resolve_type(&field.type_info, rules));
        match &mut field.type_info.kind {
            TypeKind::Union { fields } => resolve_fields(fields, rules),
            TypeKind::FunctionPointer { parameters } => resolve_fields(parameters, rules),
            _ => {}
        }
    }
}
