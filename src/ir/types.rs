use serde::{Deserialize, Serialize};

/// Marker field that opens a vtable struct body
pub const BEGIN_INTERFACE: &str = "BEGIN_INTERFACE";

/// Type of a struct field or parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeInfo {
    /// Identifier as written in the header. For function pointers this is the
    /// declared return type.
    pub ident: String,
    /// Shape of the type
    pub kind: TypeKind,
    /// Emission-ready type string, filled in by the transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

/// Shape of a [`TypeInfo`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Name")]
pub enum TypeKind {
    /// Plain named type
    Basic,
    /// Fixed-size array, outermost dimension first
    Array {
        /// Dimension sizes
        #[serde(rename = "Dimens")]
        dimens: Vec<usize>,
    },
    /// Anonymous union member
    Union {
        /// Union members
        #[serde(rename = "Fields")]
        fields: Vec<StructField>,
    },
    /// Vtable slot `Ret (CALLCONV *Name)(This, ...)`
    FunctionPointer {
        /// Parameters, `This` first
        #[serde(rename = "Parameters")]
        parameters: Vec<StructField>,
    },
    /// Pointer of `depth` levels to `inner`
    Pointer {
        /// Number of indirections
        #[serde(rename = "Depth")]
        depth: usize,
        /// Pointee
        #[serde(rename = "Inner")]
        inner: Box<TypeInfo>,
    },
}

impl TypeInfo {
    pub fn basic(ident: impl Into<String>) -> Self {
        TypeInfo {
            ident: ident.into(),
            kind: TypeKind::Basic,
            resolved: None,
        }
    }

    pub fn array(ident: impl Into<String>, dimens: Vec<usize>) -> Self {
        TypeInfo {
            ident: ident.into(),
            kind: TypeKind::Array { dimens },
            resolved: None,
        }
    }

    pub fn union(fields: Vec<StructField>) -> Self {
        TypeInfo {
            ident: String::new(),
            kind: TypeKind::Union { fields },
            resolved: None,
        }
    }

    pub fn function_pointer(returns: impl Into<String>, parameters: Vec<StructField>) -> Self {
        TypeInfo {
            ident: returns.into(),
            kind: TypeKind::FunctionPointer { parameters },
            resolved: None,
        }
    }

    /// Wraps `inner` in `depth` levels of indirection. The pointer keeps the
    /// pointee's identifier.
    pub fn pointer(depth: usize, inner: TypeInfo) -> Self {
        TypeInfo {
            ident: inner.ident.clone(),
            kind: TypeKind::Pointer {
                depth,
                inner: Box::new(inner),
            },
            resolved: None,
        }
    }

    /// Pointer depth, zero for non-pointers
    pub fn pointer_depth(&self) -> usize {
        match &self.kind {
            TypeKind::Pointer { depth, .. } => *depth,
            _ => 0,
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth() > 0
    }

    /// Pointee of a pointer type
    pub fn pointee(&self) -> Option<&TypeInfo> {
        match &self.kind {
            TypeKind::Pointer { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

/// A struct field, function parameter or vtable slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructField {
    pub name: String,
    pub type_info: TypeInfo,
    /// Written by the callee (`__out`)
    #[serde(default)]
    pub is_out: bool,
    /// Annotated with an element count (`__in_ecount(N)`)
    #[serde(default, rename = "HasECount")]
    pub has_ecount: bool,
    /// Annotated with a byte count (`__out_bcount(N)`)
    #[serde(default, rename = "HasBCount")]
    pub has_bcount: bool,
    /// Pointer parameter passed as a slice
    #[serde(default)]
    pub is_array: bool,
    /// Count parameter whose value is the paired slice's length
    #[serde(default)]
    pub is_array_len: bool,
    /// Accepted as any value exposing a raw address
    #[serde(default)]
    pub is_deref: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        StructField {
            name: name.into(),
            type_info,
            is_out: false,
            has_ecount: false,
            has_bcount: false,
            is_array: false,
            is_array_len: false,
            is_deref: false,
        }
    }

    /// The `BEGIN_INTERFACE` placeholder field
    pub fn marker() -> Self {
        StructField::new(BEGIN_INTERFACE, TypeInfo::basic(""))
    }

    pub fn is_marker(&self) -> bool {
        self.name == BEGIN_INTERFACE && self.type_info.ident.is_empty()
    }

    /// Applies flags collected from SAL annotations
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.is_out = annotations.is_out;
        self.has_ecount = annotations.has_ecount;
        self.has_bcount = annotations.has_bcount;
        self.is_deref = annotations.is_deref;
        self
    }

    /// Out parameter that the generated wrapper returns instead of accepting.
    /// Buffers are never returned: their size is only known to the caller.
    pub fn is_returned(&self) -> bool {
        self.is_out
            && !self.is_deref
            && !self.is_array
            && !self.is_array_len
            && !self.is_buffer()
            && self.type_info.is_pointer()
    }

    /// Pointer to caller-sized memory: counted by an annotation, or an
    /// untyped `void *`
    pub fn is_buffer(&self) -> bool {
        let untyped = self.type_info.pointer_depth() == 1
            && matches!(self.type_info.ident.as_str(), "void" | "VOID");
        self.has_ecount || self.has_bcount || untyped
    }
}

/// Flags carried by SAL annotations such as `__out_ecount_opt(n)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub is_out: bool,
    pub has_ecount: bool,
    pub has_bcount: bool,
    pub is_deref: bool,
}

impl Annotations {
    /// Reads flags from an annotation identifier. Returns `None` if the token
    /// is not an annotation.
    pub fn from_token(text: &str) -> Option<Self> {
        if !text.starts_with("__") {
            return None;
        }
        Some(Annotations {
            is_out: text.contains("_out"),
            has_ecount: text.contains("_ecount"),
            has_bcount: text.contains("_bcount"),
            is_deref: text.contains("_deref"),
        })
    }

    pub fn merge(self, other: Annotations) -> Self {
        Annotations {
            is_out: self.is_out || other.is_out,
            has_ecount: self.has_ecount || other.has_ecount,
            has_bcount: self.has_bcount || other.has_bcount,
            is_deref: self.is_deref || other.is_deref,
        }
    }
}
