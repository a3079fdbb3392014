//! Opaque pointer classification

use super::rules::RuleSet;
use crate::ir::StructField;

/// Marks pointers the generated code should accept as any value exposing a raw
/// address: double pointers to opaque pointees and single pointers to the
/// resource-like interfaces listed in `rules`.
pub(super) fn classify_derefs(fields: &mut [StructField], rules: &RuleSet) {
    for field in fields {
        if field.is_array || field.is_array_len {
            continue;
        }
        let depth = field.type_info.pointer_depth();
        if depth > 0 && rules.is_deref(&field.type_info.ident, depth) {
            field.is_deref = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeInfo;

    #[test]
    fn test_opaque_double_pointer() {
        let rules = RuleSet::default();
        let mut fields = vec![
            StructField::new("ppvObject", TypeInfo::pointer(2, TypeInfo::basic("void"))),
            StructField::new("pData", TypeInfo::pointer(1, TypeInfo::basic("void"))),
            StructField::new("pResource", TypeInfo::pointer(1, TypeInfo::basic("ID3D11Resource"))),
            StructField::new("pBuffer", TypeInfo::pointer(1, TypeInfo::basic("ID3D11Buffer"))),
        ];
        classify_derefs(&mut fields, &rules);
        let flags: Vec<bool> = fields.iter().map(|f| f.is_deref).collect();
        assert_eq!(flags, vec![true, false, true, false]);
    }

    #[test]
    fn test_array_parameters_keep_their_shape() {
        let rules = RuleSet::default();
        let mut views = StructField::new("ppViews", TypeInfo::pointer(2, TypeInfo::basic("void")));
        views.is_array = true;
        let mut fields = vec![views];
        classify_derefs(&mut fields, &rules);
        assert!(!fields[0].is_deref);
    }
}
