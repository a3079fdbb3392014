//! Field and parameter lists

use super::header_parser::HeaderParser;
use crate::error::{Error, Result};
use crate::ir::{Annotations, StructField, TypeInfo, Value, BEGIN_INTERFACE};
use crate::lexer::TokenKind;
use crate::macro_eval::parse_hex;

const END_INTERFACE: &str = "END_INTERFACE";

impl<'r> HeaderParser<'r> {
    /// Parses fields separated by `end_field` up to and including `end_list`.
    /// Leaves the current token on `end_list`.
    pub(super) fn parse_fields(&mut self, end_field: &str, end_list: &str) -> Result<Vec<StructField>> {
        let mut fields = Vec::new();

        loop {
            self.advance()?;
            if self.current.is(end_list) {
                break;
            }

            let mut annotations = Annotations::default();
            match self.current.lexeme.as_str() {
                BEGIN_INTERFACE => {
                    fields.push(StructField::marker());
                    continue;
                }
                END_INTERFACE => continue,
                "union" => {
                    fields.push(self.parse_union()?);
                    continue;
                }
                _ => {}
            }
            while let Some(flags) = Annotations::from_token(&self.current.lexeme) {
                annotations = annotations.merge(flags);
                self.skip_annotation()?;
            }

            let kind = self.parse_type_name()?;

            if self.current.is("(") {
                fields.push(self.parse_function_pointer(kind)?.with_annotations(annotations));
                continue;
            }

            let mut depth = self.pointer_depth()?;
            if self.current.is("const") {
                self.advance()?;
                depth += self.pointer_depth()?;
            }

            // `(void)` parameter list
            if kind == "void" && depth == 0 && self.current.is(end_list) {
                break;
            }

            let name = self.take_identifier("field name")?;
            self.advance()?;

            let mut info = if self.current.is(end_field) || self.current.is(end_list) {
                TypeInfo::basic(kind.clone())
            } else if self.current.is("[") {
                let dimens = self.array_dimensions(end_field, end_list)?;
                TypeInfo::array(kind.clone(), dimens)
            } else {
                return Err(self.expected(&format!("`[` or `{}`", end_field)));
            };
            let is_last = self.current.is(end_list);

            if depth > 0 {
                info = TypeInfo::pointer(depth, info);
            }
            fields.push(StructField::new(name.lexeme, info).with_annotations(annotations));

            if is_last {
                break;
            }
        }

        Ok(fields)
    }

    /// Skips an annotation token and its parenthesized arguments
    fn skip_annotation(&mut self) -> Result<()> {
        self.advance()?;
        if !self.current.is("(") {
            return Ok(());
        }

        let mut depth = 0usize;
        loop {
            self.advance()?;
            if self.current.is_eof() {
                return Err(self.expected("`)`"));
            }
            if self.current.is("(") {
                depth += 1;
            } else if self.current.is(")") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
        }
        self.advance()
    }

    /// Reads a type name, dropping `const` qualifiers and keeping
    /// `CONST_VTBL struct` as part of the name
    fn parse_type_name(&mut self) -> Result<String> {
        let mut kind = String::new();
        loop {
            self.pointer_depth()?;
            if self.current.is_eof() || !self.current.is_identifier() {
                return Err(self.expected("type name"));
            }
            let word = self.current.lexeme.clone();
            self.advance()?;

            match word.as_str() {
                "const" | "CONST" => continue,
                "CONST_VTBL" | "struct" => {
                    kind.push_str(&word);
                    kind.push(' ');
                }
                _ => {
                    kind.push_str(&word);
                    return Ok(kind);
                }
            }
        }
    }

    /// Counts and consumes consecutive `*` tokens
    fn pointer_depth(&mut self) -> Result<usize> {
        let mut depth = 0;
        while self.current.is("*") {
            depth += 1;
            self.advance()?;
        }
        Ok(depth)
    }

    /// `Ret ( CALLCONV *Name )( This, params );` with the current token on the
    /// first `(`
    fn parse_function_pointer(&mut self, returns: String) -> Result<StructField> {
        self.advance()?;
        if self.current.is_identifier() {
            // calling convention
            self.advance()?;
        }
        if self.pointer_depth()? == 0 {
            return Err(self.expected("`*`"));
        }
        let name = self.take_identifier("method name")?;
        self.advance_expect(")")?;
        self.advance_expect("(")?;

        let (line, column) = (self.current.line, self.current.column);
        let parameters = self.parse_fields(",", ")")?;
        if parameters.first().map(|p| p.name.as_str()) != Some("This") {
            let got = parameters.first().map_or(")", |p| p.name.as_str()).to_string();
            return Err(Error::ParseError {
                file: self.file.filename.clone(),
                line,
                col: column,
                expected: format!("`This` as first parameter of {}", name.lexeme),
                got,
            });
        }
        self.advance_expect(";")?;

        Ok(StructField::new(
            name.lexeme,
            TypeInfo::function_pointer(returns, parameters),
        ))
    }

    /// `union { fields };`
    fn parse_union(&mut self) -> Result<StructField> {
        self.advance_expect("{")?;
        let fields = self.parse_fields(";", "}")?;
        self.advance_expect(";")?;
        Ok(StructField::new("", TypeInfo::union(fields)))
    }

    /// `[N][M]...` with the current token on the first `[`. Leaves the current
    /// token on `end_field` or `end_list`.
    fn array_dimensions(&mut self, end_field: &str, end_list: &str) -> Result<Vec<usize>> {
        let mut dimens = Vec::new();
        loop {
            if self.current.is(end_field) || self.current.is(end_list) {
                return Ok(dimens);
            }
            self.expect_current("[")?;
            self.advance()?;
            dimens.push(self.array_size()?);
            self.advance_expect("]")?;
            self.advance()?;
        }
    }

    /// Literal array size (decimal or hex) or the name of a resolved macro
    fn array_size(&self) -> Result<usize> {
        let lexeme = self.current.lexeme.as_str();
        let size = match self.current.kind {
            TokenKind::Number if lexeme.starts_with("0x") || lexeme.starts_with("0X") => {
                parse_hex(lexeme, lexeme).ok().map(|n| n as usize)
            }
            TokenKind::Number => lexeme.parse::<usize>().ok(),
            TokenKind::Identifier => match self.macros.get(&self.current.lexeme) {
                Some(Value::U32(n)) => Some(*n as usize),
                _ => None,
            },
            _ => None,
        };
        size.ok_or_else(|| self.expected("array size"))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::ir::{TypeKind, Value};
    use crate::parser::parse_header;

    #[test]
    fn test_annotated_out_parameter() {
        let source = "HRESULT WINAPI F( __out_opt ID3D11Device** ppDevice );";
        let file = parse_header("t.h", source).unwrap();
        let param = &file.functions[0].parameters[0];
        assert!(param.is_out);
        assert!(!param.has_ecount);
        assert_eq!(param.type_info.pointer_depth(), 2);
        assert_eq!(param.type_info.ident, "ID3D11Device");
    }

    #[test]
    fn test_annotation_arguments_are_skipped() {
        let source = "HRESULT WINAPI F( UINT NumViews, __in_ecount_opt(NumViews) ID3D11Buffer *const *ppViews );";
        let file = parse_header("t.h", source).unwrap();
        let params = &file.functions[0].parameters;
        assert_eq!(params.len(), 2);
        assert!(params[1].has_ecount);
        assert_eq!(params[1].type_info.pointer_depth(), 2);
    }

    #[test]
    fn test_void_parameter_list() {
        let file = parse_header("t.h", "HRESULT WINAPI F( void );").unwrap();
        assert!(file.functions[0].parameters.is_empty());
    }

    #[test]
    fn test_array_fields() {
        let source = "#define COUNT 4\ntypedef struct S { FLOAT BlendFactor[ 4 ]; BYTE Grid[COUNT][2]; } S;";
        let file = parse_header("t.h", source).unwrap();
        let fields = &file.structs[0].fields;
        assert_eq!(fields[0].type_info.kind, TypeKind::Array { dimens: vec![4] });
        assert_eq!(fields[1].type_info.kind, TypeKind::Array { dimens: vec![4, 2] });
        assert_eq!(file.macros[0].value, Value::U32(4));
    }

    #[test]
    fn test_hex_array_dimension() {
        let source = "typedef struct S {\n    UINT Values[0x10];\n    BYTE Mask[ 0xFF ];\n} S;";
        let file = parse_header("t.h", source).unwrap();
        let fields = &file.structs[0].fields;
        assert_eq!(fields[0].type_info.kind, TypeKind::Array { dimens: vec![16] });
        assert_eq!(fields[1].type_info.kind, TypeKind::Array { dimens: vec![255] });

        let err = parse_header("t.h", "typedef struct S { UINT Values[0x123456789]; } S;").unwrap_err();
        assert!(matches!(err, Error::ParseError { ref expected, .. } if expected == "array size"));
    }

    #[test]
    fn test_union_field() {
        let source = "typedef struct V { DXGI_FORMAT Format; union { BUFFER_RTV Buffer; TEX1D_RTV Texture1D; }; } V;";
        let file = parse_header("t.h", source).unwrap();
        let fields = &file.structs[0].fields;
        assert_eq!(fields.len(), 2);
        match &fields[1].type_info.kind {
            TypeKind::Union { fields } => assert_eq!(fields.len(), 2),
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_const_pointer_depths_add_up() {
        let source = "typedef struct S { const void *const *pp; CONST D3D11_BOX *pBox; } S;";
        let file = parse_header("t.h", source).unwrap();
        let fields = &file.structs[0].fields;
        assert_eq!(fields[0].type_info.pointer_depth(), 2);
        assert_eq!(fields[0].type_info.ident, "void");
        assert_eq!(fields[1].type_info.ident, "D3D11_BOX");
    }

    #[test]
    fn test_method_requires_this() {
        let source = r#"typedef struct XVtbl {
    BEGIN_INTERFACE
    HRESULT ( STDMETHODCALLTYPE *Bad )( UINT Flags );
} XVtbl;"#;
        let err = parse_header("t.h", source).unwrap_err();
        match err {
            Error::ParseError { expected, got, .. } => {
                assert!(expected.contains("This"));
                assert_eq!(got, "Flags");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_method_records_return_type() {
        let source = r#"MIDL_INTERFACE("c0bfa96c-e089-44fb-8eaf-26f8796190da") ID3D11DeviceContext
typedef struct ID3D11DeviceContextVtbl {
    BEGIN_INTERFACE
    void ( STDMETHODCALLTYPE *Draw )( ID3D11DeviceContext * This, __in UINT VertexCount, __in UINT StartVertexLocation );
    END_INTERFACE
} ID3D11DeviceContextVtbl;
interface ID3D11DeviceContext { CONST_VTBL struct ID3D11DeviceContextVtbl *lpVtbl; };"#;
        let file = parse_header("t.h", source).unwrap();
        let vtbl = file.structs[0].vtbl.as_ref().unwrap();
        let draw = &vtbl.fields[0];
        assert_eq!(draw.type_info.ident, "void");
        match &draw.type_info.kind {
            TypeKind::FunctionPointer { parameters } => assert_eq!(parameters.len(), 3),
            other => panic!("expected function pointer, got {:?}", other),
        }
        assert_eq!(file.structs[0].fields[0].type_info.ident, "CONST_VTBL struct ID3D11DeviceContextVtbl");
    }
}
