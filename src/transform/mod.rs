//! # IR Transform Passes
//!
//! Rewrites a parsed [`DeclFile`] into emission-ready form. Passes run in a
//! fixed order, each over the whole file:
//!
//! 1. identifier normalization and type resolution
//! 2. array/length pairing
//! 3. opaque pointer classification
//! 4. GUID decomposition
//! 5. enum constant deduplication
//!
//! Pairing runs before classification so a slice parameter is never also
//! treated as an opaque address.

mod arrays;
mod dedup;
mod guid;
mod normalize;
mod pointers;
pub mod rules;
pub mod typetrans;

pub use guid::parse_guid;
pub use rules::{NamePattern, RuleSet};

use crate::error::Result;
use crate::ir::{DeclFile, StructField, TypeKind};

/// Runs the transform passes over declaration files
pub struct Transformer<'r> {
    rules: &'r RuleSet,
    allow_conflicting_enum_duplicates: bool,
}

impl<'r> Transformer<'r> {
    pub fn new(rules: &'r RuleSet, allow_conflicting_enum_duplicates: bool) -> Self {
        Transformer {
            rules,
            allow_conflicting_enum_duplicates,
        }
    }

    /// Transforms one file in place
    pub fn transform(&self, file: &mut DeclFile) -> Result<()> {
        tracing::debug!("{}: normalizing identifiers", file.filename);
        normalize::normalize_file(file, self.rules);

        tracing::debug!("{}: pairing array lengths", file.filename);
        self.for_each_field_list(file, |context, fields| {
            arrays::pair_array_lengths(context, fields, self.rules)
        })?;

        tracing::debug!("{}: classifying pointers", file.filename);
        self.for_each_field_list(file, |_, fields| {
            pointers::classify_derefs(fields, self.rules);
            Ok(())
        })?;

        tracing::debug!("{}: decomposing GUIDs", file.filename);
        guid::decompose_guids(file)?;

        tracing::debug!("{}: deduplicating enum constants", file.filename);
        dedup::dedup_enum_fields(file, self.allow_conflicting_enum_duplicates)?;

        Ok(())
    }

    /// Applies `pass` to function parameters, struct fields and vtable method
    /// parameters
    fn for_each_field_list<F>(&self, file: &mut DeclFile, mut pass: F) -> Result<()>
    where
        F: FnMut(&str, &mut [StructField]) -> Result<()>,
    {
        for function in &mut file.functions {
            pass(function.ident.as_str(), &mut function.parameters[..])?;
        }

        for s in &mut file.structs {
            pass(s.ident.as_str(), &mut s.fields[..])?;
            let Some(vtbl) = s.vtbl.as_mut() else {
                continue;
            };
            for method in &mut vtbl.fields {
                if let TypeKind::FunctionPointer { parameters } = &mut method.type_info.kind {
                    let context = format!("{}::{}", s.ident, method.name);
                    pass(context.as_str(), &mut parameters[..])?;
                }
            }
        }
        Ok(())
    }
}

/// Transforms one file with the default rule table
pub fn transform_file(file: &mut DeclFile) -> Result<()> {
    let rules = RuleSet::default();
    Transformer::new(&rules, false).transform(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Value;
    use crate::parser::parse_header;

    const SOURCE: &str = r#"
#define D3D11_SDK_VERSION ( 7 )
typedef enum D3D11_CULL_MODE { D3D11_CULL_NONE = 1, D3D11_CULL_FRONT = 2 } D3D11_CULL_MODE;
MIDL_INTERFACE("c0bfa96c-e089-44fb-8eaf-26f8796190da") ID3D11DeviceContext : public ID3D11DeviceChild { };
typedef struct ID3D11DeviceContextVtbl {
    BEGIN_INTERFACE
    void ( STDMETHODCALLTYPE *VSSetConstantBuffers )(
        ID3D11DeviceContext * This,
        __in_range( 0, D3D11_COMMONSHADER_CONSTANT_BUFFER_API_SLOT_COUNT - 1 ) UINT StartSlot,
        __in_range( 0, D3D11_COMMONSHADER_CONSTANT_BUFFER_API_SLOT_COUNT - StartSlot ) UINT NumBuffers,
        __in_ecount(NumBuffers) ID3D11Buffer *const *ppConstantBuffers);
    HRESULT ( STDMETHODCALLTYPE *Map )(
        ID3D11DeviceContext * This,
        __in ID3D11Resource *pResource,
        __in UINT Subresource,
        __out D3D11_MAPPED_SUBRESOURCE *pMappedResource);
    END_INTERFACE
} ID3D11DeviceContextVtbl;
interface ID3D11DeviceContext { CONST_VTBL struct ID3D11DeviceContextVtbl *lpVtbl; };
"#;

    #[test]
    fn test_passes_run_in_order() {
        let mut file = parse_header("d3d11.h", SOURCE).unwrap();
        transform_file(&mut file).unwrap();

        assert_eq!(file.macros[0].ident, "SDK_VERSION");
        assert_eq!(file.macros[0].value, Value::U32(7));
        assert_eq!(file.enums[0].fields[0].ident, "CULL_NONE");

        let context = &file.structs[0];
        assert_eq!(context.ident, "DeviceContext");
        assert_eq!(context.guid_parts.map(|p| p.data1), Some(0xc0bfa96c));

        let vtbl = context.vtbl.as_ref().unwrap();
        let TypeKind::FunctionPointer { parameters } = &vtbl.fields[0].type_info.kind else {
            panic!("expected function pointer");
        };
        assert!(parameters[2].is_array_len);
        assert_eq!(parameters[2].name, "ppConstantBuffers");
        assert!(parameters[3].is_array);
        assert_eq!(parameters[3].type_info.resolved.as_deref(), Some("*mut *mut Buffer"));

        let TypeKind::FunctionPointer { parameters } = &vtbl.fields[1].type_info.kind else {
            panic!("expected function pointer");
        };
        assert!(parameters[1].is_deref);
        assert!(parameters[3].is_returned());
    }
}
