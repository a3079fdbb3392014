//! Method and function wrappers
//!
//! Every wrapper funnels its arguments into one of the bucketed call
//! primitives of the prelude. Parameters are marshalled by classification:
//!
//! | Parameter | Signature | Argument |
//! |-----------|-----------|----------|
//! | array length | omitted | `slice.len()` |
//! | array | `name: &[T]` | `name.as_ptr() as usize` |
//! | out array | `name: &mut [T]` | `name.as_mut_ptr() as usize` |
//! | deref | `name: impl AsRawAddress` | `name.as_raw_address()` |
//! | returned out | omitted, zeroed local | `&mut name as *mut _ as usize` |
//! | other pointer, out buffer | `name: *mut T` | `name as usize` |
//! | float | `name: f32` | `name.to_bits() as usize` |
//! | struct by value | `name: T` | `&name as *const _ as usize` |
//! | value | `name: T` | `name as usize` |
//!
//! The raw result lives in `__ret`. Header parameters never start with `__`
//! since such tokens are read as annotations.

use super::{resolved_type, rust_ident, Emitter};
use crate::error::{Error, Result};
use crate::ir::{Function, StructField, TypeKind};
use crate::transform::typetrans::{deref_resolved, is_float, translate_ident};

/// Local holding the raw call result
const RESULT_LOCAL: &str = "__ret";

/// Capacity of the largest call primitive
pub const MAX_CALL_SLOTS: usize = 12;

/// Call primitive chosen for a number of argument slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBucket {
    /// Capacity of the primitive (3, 6, 9 or 12)
    pub slots: usize,
    /// Zero-filled trailing slots
    pub padding: usize,
}

impl CallBucket {
    /// Picks the smallest primitive holding `total` arguments, receiver
    /// included
    pub fn select(total: usize) -> Result<Self> {
        let slots = match total {
            0..=3 => 3,
            4..=6 => 6,
            7..=9 => 9,
            10..=MAX_CALL_SLOTS => 12,
            _ => {
                return Err(Error::emission(format!(
                    "{} call arguments exceed the {}-slot primitive",
                    total, MAX_CALL_SLOTS
                )))
            }
        };
        Ok(CallBucket {
            slots,
            padding: slots - total,
        })
    }

    /// Name of the prelude function implementing this bucket
    pub fn primitive(&self) -> String {
        format!("syscall{}", self.slots)
    }
}

/// How the raw call result is surfaced
#[derive(Debug, Clone, PartialEq, Eq)]
enum Returns {
    /// `HRESULT`, checked with `to_result`
    HResult,
    Void,
    /// Converted to the given Rust type
    Value(String),
}

/// Everything a wrapper needs besides its parameters
struct Wrapper<'a> {
    name: String,
    /// Code evaluating to the address of the native function
    target: String,
    /// Receiver argument for vtable methods
    receiver: Option<&'a str>,
    returns: Returns,
    /// Indentation of the `fn` line
    indent: &'a str,
}

impl<'r> Emitter<'r> {
    /// `pub unsafe fn Method(&self, ..)` inside the owner's impl block.
    /// `vtbl_field` is the owner's first field, which points at its vtable.
    pub(super) fn emit_method(&self, vtbl_field: &str, method: &StructField) -> Result<String> {
        let TypeKind::FunctionPointer { parameters } = &method.type_info.kind else {
            return Err(Error::emission(format!("vtable slot `{}` is not a method", method.name)));
        };
        let name = rust_ident(&method.name)?;
        // `This` is replaced by `&self`
        let params = parameters.get(1..).unwrap_or_default();

        let wrapper = Wrapper {
            target: format!("(*self.{}).{}", rust_ident(vtbl_field)?, name),
            name,
            receiver: Some("self as *const Self as usize"),
            returns: self.returns(&method.type_info.ident)?,
            indent: "    ",
        };
        self.wrapper(&wrapper, params)
    }

    /// Lazily resolved export plus its `pub unsafe fn` wrapper
    pub(super) fn emit_function(&self, function: &Function) -> Result<String> {
        let name = rust_ident(&function.ident)?;
        let proc_name = format!("PROC_{}", name);

        let mut output = format!(
            "static {}: LazyProc = LazyProc::new(&NATIVE_LIBRARY, \"{}\\0\");\n\n",
            proc_name, function.dll_call
        );
        let wrapper = Wrapper {
            name,
            target: format!("{}.find()?", proc_name),
            receiver: None,
            returns: Returns::HResult,
            indent: "",
        };
        output.push_str(&self.wrapper(&wrapper, &function.parameters)?);
        Ok(output)
    }

    fn returns(&self, ident: &str) -> Result<Returns> {
        Ok(match ident {
            "HRESULT" => Returns::HResult,
            "void" | "VOID" => Returns::Void,
            other => {
                let ty = translate_ident(other, self.rules);
                if self.records.contains(&ty) {
                    return Err(Error::emission(format!("`{}` returned by value", ty)));
                }
                Returns::Value(ty)
            }
        })
    }

    fn wrapper(&self, wrapper: &Wrapper<'_>, params: &[StructField]) -> Result<String> {
        let indent = wrapper.indent;
        let body = format!("{}    ", indent);

        // Signature
        let mut decls = Vec::new();
        if wrapper.receiver.is_some() {
            decls.push("&self".to_string());
        }
        let mut outs = Vec::new();
        for param in params {
            if param.is_returned() {
                let ty = deref_resolved(resolved_type(param)?).to_string();
                outs.push((rust_ident(&param.name)?, ty));
            } else if let Some(decl) = self.parameter_decl(param)? {
                decls.push(decl);
            }
        }

        let (out_ty, out_expr) = match outs.as_slice() {
            [] => ("()".to_string(), "()".to_string()),
            [(name, ty)] => (ty.clone(), name.clone()),
            many => (
                format!("({})", many.iter().map(|(_, ty)| ty.as_str()).collect::<Vec<_>>().join(", ")),
                format!("({})", many.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ")),
            ),
        };

        let return_ty = match &wrapper.returns {
            Returns::HResult => format!(" -> Result<{}, Error>", out_ty),
            Returns::Void if outs.is_empty() => String::new(),
            Returns::Void => format!(" -> {}", out_ty),
            Returns::Value(ty) if outs.is_empty() => format!(" -> {}", ty),
            Returns::Value(ty) => format!(" -> ({}, {})", ty, strip_parens(&out_ty)),
        };

        let mut output = format!(
            "{}pub unsafe fn {}({}){} {{\n",
            indent,
            wrapper.name,
            decls.join(", "),
            return_ty
        );

        for (name, ty) in &outs {
            output.push_str(&format!("{}let mut {}: {} = std::mem::zeroed();\n", body, name, ty));
        }

        // Call
        let mut args = Vec::new();
        if let Some(receiver) = wrapper.receiver {
            args.push(receiver.to_string());
        }
        for param in params {
            args.push(self.argument(param)?);
        }
        let bucket = CallBucket::select(args.len())?;
        let total = args.len();
        args.extend(std::iter::repeat("0".to_string()).take(bucket.padding));

        let arg_indent = format!("{}    ", body);
        let mut call = format!("{}(\n", bucket.primitive());
        call.push_str(&format!("{}{},\n", arg_indent, wrapper.target));
        call.push_str(&format!("{}{},\n", arg_indent, total));
        for arg in &args {
            call.push_str(&format!("{}{},\n", arg_indent, arg));
        }
        call.push_str(&format!("{})", body));

        match &wrapper.returns {
            Returns::HResult => {
                output.push_str(&format!("{}let {} = {};\n", body, RESULT_LOCAL, call));
                if outs.is_empty() {
                    output.push_str(&format!("{}to_result({})\n", body, RESULT_LOCAL));
                } else {
                    output.push_str(&format!(
                        "{}to_result({}).map(|()| {})\n",
                        body, RESULT_LOCAL, out_expr
                    ));
                }
            }
            Returns::Void => {
                output.push_str(&format!("{}{};\n", body, call));
                if !outs.is_empty() {
                    output.push_str(&format!("{}{}\n", body, out_expr));
                }
            }
            Returns::Value(ty) => {
                output.push_str(&format!("{}let {} = {};\n", body, RESULT_LOCAL, call));
                let value = convert_return(ty);
                if outs.is_empty() {
                    output.push_str(&format!("{}{}\n", body, value));
                } else {
                    output.push_str(&format!("{}({}, {})\n", body, value, strip_parens(&out_expr)));
                }
            }
        }

        output.push_str(&format!("{}}}\n", indent));
        Ok(output)
    }

    /// Signature entry, `None` for parameters the caller never passes
    fn parameter_decl(&self, param: &StructField) -> Result<Option<String>> {
        if param.is_array_len {
            return Ok(None);
        }
        let name = rust_ident(&param.name)?;
        let ty = resolved_type(param)?;
        let decl = if param.is_deref {
            format!("{}: impl AsRawAddress", name)
        } else if param.is_array && param.is_out {
            format!("{}: &mut [{}]", name, deref_resolved(ty))
        } else if param.is_array {
            format!("{}: &[{}]", name, deref_resolved(ty))
        } else {
            format!("{}: {}", name, ty)
        };
        Ok(Some(decl))
    }

    /// Expression placing one parameter in an argument slot
    fn argument(&self, param: &StructField) -> Result<String> {
        let name = rust_ident(&param.name)?;
        let ty = resolved_type(param)?;

        let arg = if param.is_array_len {
            format!("{}.len()", name)
        } else if param.is_array && param.is_out {
            format!("{}.as_mut_ptr() as usize", name)
        } else if param.is_array || matches!(param.type_info.kind, TypeKind::Array { .. }) {
            format!("{}.as_ptr() as usize", name)
        } else if param.is_deref {
            format!("{}.as_raw_address()", name)
        } else if param.is_returned() {
            format!("&mut {} as *mut _ as usize", name)
        } else if param.type_info.is_pointer() {
            format!("{} as usize", name)
        } else if is_float(ty) {
            format!("{}.to_bits() as usize", name)
        } else if self.records.contains(ty) {
            format!("&{} as *const _ as usize", name)
        } else {
            format!("{} as usize", name)
        };
        Ok(arg)
    }
}

/// Converts the raw call result to a declared return type. Floating point
/// results are read from the integer return register.
fn convert_return(ty: &str) -> String {
    match ty {
        "f32" => format!("f32::from_bits({} as u32)", RESULT_LOCAL),
        "f64" => format!("f64::from_bits({} as u64)", RESULT_LOCAL),
        _ => format!("{} as {}", RESULT_LOCAL, ty),
    }
}

fn strip_parens(text: &str) -> &str {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeInfo;
    use crate::transform::RuleSet;

    fn param(name: &str, info: TypeInfo, resolved: &str) -> StructField {
        let mut field = StructField::new(name, info);
        field.type_info.resolved = Some(resolved.to_string());
        field
    }

    fn this() -> StructField {
        param("This", TypeInfo::pointer(1, TypeInfo::basic("ID3D11Device")), "*mut Device")
    }

    fn method(returns: &str, mut params: Vec<StructField>) -> StructField {
        params.insert(0, this());
        StructField::new("M", TypeInfo::function_pointer(returns, params))
    }

    #[test]
    fn test_bucket_selection() {
        assert_eq!(CallBucket::select(6).unwrap(), CallBucket { slots: 6, padding: 0 });
        assert_eq!(CallBucket::select(3).unwrap(), CallBucket { slots: 3, padding: 0 });
        assert_eq!(CallBucket::select(1).unwrap(), CallBucket { slots: 3, padding: 2 });
        assert_eq!(CallBucket::select(10).unwrap(), CallBucket { slots: 12, padding: 2 });
        assert_eq!(CallBucket::select(0).unwrap().primitive(), "syscall3");
        assert!(matches!(CallBucket::select(13), Err(Error::EmissionError(_))));
    }

    #[test]
    fn test_five_parameter_method_uses_six_slots() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let params = (0..5)
            .map(|i| param(&format!("a{}", i), TypeInfo::basic("UINT"), "u32"))
            .collect();
        let code = emitter.emit_method("lpVtbl", &method("HRESULT", params)).unwrap();
        assert!(code.contains("syscall6("));
        assert!(code.contains("            6,\n"));
        assert!(!code.contains("            0,\n"));
    }

    #[test]
    fn test_hresult_method_with_out_value() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let mut out = param(
            "ppBuffer",
            TypeInfo::pointer(2, TypeInfo::basic("ID3D11Buffer")),
            "*mut *mut Buffer",
        );
        out.is_out = true;
        let desc = param(
            "pDesc",
            TypeInfo::pointer(1, TypeInfo::basic("D3D11_BUFFER_DESC")),
            "*mut BUFFER_DESC",
        );
        let code = emitter
            .emit_method("lpVtbl", &method("HRESULT", vec![desc, out]))
            .unwrap();

        assert!(code.contains(
            "    pub unsafe fn M(&self, pDesc: *mut BUFFER_DESC) -> Result<*mut Buffer, Error> {\n"
        ));
        assert!(code.contains("let mut ppBuffer: *mut Buffer = std::mem::zeroed();"));
        assert!(code.contains("(*self.lpVtbl).M,"));
        assert!(code.contains("self as *const Self as usize,"));
        assert!(code.contains("pDesc as usize,"));
        assert!(code.contains("&mut ppBuffer as *mut _ as usize,"));
        assert!(code.contains("to_result(__ret).map(|()| ppBuffer)"));
    }

    #[test]
    fn test_array_and_deref_parameters() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let mut len = param("ppViews", TypeInfo::basic("UINT"), "u32");
        len.is_array_len = true;
        let mut views = param(
            "ppViews",
            TypeInfo::pointer(2, TypeInfo::basic("ID3D11ShaderResourceView")),
            "*mut *mut ShaderResourceView",
        );
        views.is_array = true;
        let mut resource = param(
            "pResource",
            TypeInfo::pointer(1, TypeInfo::basic("ID3D11Resource")),
            "*mut Resource",
        );
        resource.is_deref = true;

        let code = emitter
            .emit_method("lpVtbl", &method("void", vec![len, views, resource]))
            .unwrap();
        assert!(code.contains(
            "pub unsafe fn M(&self, ppViews: &[*mut ShaderResourceView], pResource: impl AsRawAddress) {\n"
        ));
        assert!(code.contains("ppViews.len(),"));
        assert!(code.contains("ppViews.as_ptr() as usize,"));
        assert!(code.contains("pResource.as_raw_address(),"));
        assert!(!code.contains("to_result"));
    }

    #[test]
    fn test_out_array_is_mutable_slice() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let mut len = param("ppViews", TypeInfo::basic("UINT"), "u32");
        len.is_array_len = true;
        let mut views = param(
            "ppViews",
            TypeInfo::pointer(2, TypeInfo::basic("ID3D11View")),
            "*mut *mut View",
        );
        views.is_array = true;
        views.is_out = true;
        views.has_ecount = true;

        let code = emitter
            .emit_method("lpVtbl", &method("void", vec![len, views]))
            .unwrap();
        assert!(code.contains("pub unsafe fn M(&self, ppViews: &mut [*mut View]) {\n"));
        assert!(code.contains("ppViews.len(),"));
        assert!(code.contains("ppViews.as_mut_ptr() as usize,"));
        assert!(!code.contains("as_ptr()"));
        assert!(!code.contains("std::mem::zeroed"));
    }

    #[test]
    fn test_out_buffer_is_caller_supplied() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let size = param("DataSize", TypeInfo::basic("UINT"), "u32");
        let mut data = param("pData", TypeInfo::pointer(1, TypeInfo::basic("void")), "*mut c_void");
        data.is_out = true;
        data.has_bcount = true;

        let code = emitter
            .emit_method("lpVtbl", &method("HRESULT", vec![size, data]))
            .unwrap();
        assert!(code.contains(
            "pub unsafe fn M(&self, DataSize: u32, pData: *mut c_void) -> Result<(), Error> {\n"
        ));
        assert!(code.contains("pData as usize,"));
        assert!(!code.contains("std::mem::zeroed"));
    }

    #[test]
    fn test_value_returning_method() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let code = emitter.emit_method("lpVtbl", &method("UINT", vec![])).unwrap();
        assert!(code.contains("pub unsafe fn M(&self) -> u32 {"));
        assert!(code.contains("let __ret = syscall3("));
        assert!(code.contains("__ret as u32"));

        let code = emitter.emit_method("lpVtbl", &method("FLOAT", vec![])).unwrap();
        assert!(code.contains("f32::from_bits(__ret as u32)"));
    }

    #[test]
    fn test_float_and_record_arguments() {
        let rules = RuleSet::default();
        let mut file = crate::ir::DeclFile::new("builtin");
        file.structs.push(crate::ir::Struct::new("GUID", vec![]));
        let emitter = Emitter::new(&rules, "d3d11.dll").with_records([&file]);

        let depth = param("MinDepth", TypeInfo::basic("FLOAT"), "f32");
        let guid = param("Guid", TypeInfo::basic("GUID"), "GUID");
        let code = emitter
            .emit_method("lpVtbl", &method("void", vec![depth, guid]))
            .unwrap();
        assert!(code.contains("MinDepth.to_bits() as usize,"));
        assert!(code.contains("&Guid as *const _ as usize,"));
    }

    #[test]
    fn test_free_function() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let mut out = param(
            "ppDevice",
            TypeInfo::pointer(2, TypeInfo::basic("ID3D11Device")),
            "*mut *mut Device",
        );
        out.is_out = true;
        let function = Function {
            ident: "CreateDevice".into(),
            dll_call: "D3D11CreateDevice".into(),
            parameters: vec![param("Flags", TypeInfo::basic("UINT"), "u32"), out],
        };
        let code = emitter.emit_function(&function).unwrap();

        assert!(code.starts_with(
            "static PROC_CreateDevice: LazyProc = LazyProc::new(&NATIVE_LIBRARY, \"D3D11CreateDevice\\0\");\n"
        ));
        assert!(code.contains("pub unsafe fn CreateDevice(Flags: u32) -> Result<*mut Device, Error> {"));
        assert!(code.contains("syscall3(\n        PROC_CreateDevice.find()?,\n        2,\n"));
        assert!(code.contains("        0,\n    );"));
    }

    #[test]
    fn test_too_many_arguments() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let params = (0..12)
            .map(|i| param(&format!("a{}", i), TypeInfo::basic("UINT"), "u32"))
            .collect();
        let err = emitter.emit_method("lpVtbl", &method("HRESULT", params)).unwrap_err();
        assert!(matches!(err, Error::EmissionError(_)));
    }

    #[test]
    fn test_missing_resolved_type() {
        let rules = RuleSet::default();
        let emitter = Emitter::new(&rules, "d3d11.dll");
        let bare = StructField::new("Flags", TypeInfo::basic("UINT"));
        let err = emitter.emit_method("lpVtbl", &method("HRESULT", vec![bare])).unwrap_err();
        assert!(matches!(err, Error::EmissionError(_)));
    }
}
