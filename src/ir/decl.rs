use super::types::StructField;
use super::value::Value;
use serde::{Deserialize, Serialize};

/// `#define NAME <expr>` that evaluated to a constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Macro {
    pub ident: String,
    pub value: Value,
}

/// `typedef ALIAS IDENT;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeAlias {
    pub ident: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumField {
    pub ident: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Enum {
    pub ident: String,
    pub fields: Vec<EnumField>,
}

/// The four components of an interface identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuidParts {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl GuidParts {
    /// 128-bit value, most significant component first
    pub fn to_u128(&self) -> u128 {
        let tail = u64::from_be_bytes(self.data4);
        (u128::from(self.data1) << 96)
            | (u128::from(self.data2) << 80)
            | (u128::from(self.data3) << 64)
            | u128::from(tail)
    }
}

impl std::fmt::Display for GuidParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// Struct, interface or vtable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Struct {
    pub ident: String,
    pub fields: Vec<StructField>,
    /// Canonical interface identifier from `MIDL_INTERFACE("...")`
    #[serde(default, rename = "GUID", skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, rename = "GUIDParts", skip_serializing_if = "Option::is_none")]
    pub guid_parts: Option<GuidParts>,
    /// Method table of an interface struct
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vtbl: Option<Box<Struct>>,
}

impl Struct {
    pub fn new(ident: impl Into<String>, fields: Vec<StructField>) -> Self {
        Struct {
            ident: ident.into(),
            fields,
            guid: None,
            guid_parts: None,
            vtbl: None,
        }
    }

    /// Returns true if the first field is the `BEGIN_INTERFACE` marker
    pub fn is_vtable(&self) -> bool {
        self.fields.first().map_or(false, StructField::is_marker)
    }
}

/// `HRESULT WINAPI Name(params);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    /// Name of the generated wrapper
    pub ident: String,
    /// Exported symbol name, never normalized
    #[serde(rename = "DLLCall")]
    pub dll_call: String,
    pub parameters: Vec<StructField>,
}

/// Declarations parsed from one header, in source order per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeclFile {
    pub filename: String,
    pub macros: Vec<Macro>,
    pub type_aliases: Vec<TypeAlias>,
    pub enums: Vec<Enum>,
    pub structs: Vec<Struct>,
    pub functions: Vec<Function>,
}

impl DeclFile {
    pub fn new(filename: impl Into<String>) -> Self {
        DeclFile {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// File name without directory or extension, used for dump files
    pub fn stem(&self) -> &str {
        let name = self
            .filename
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.filename);
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }

    /// Total number of top-level declarations
    pub fn len(&self) -> usize {
        self.macros.len()
            + self.type_aliases.len()
            + self.enums.len()
            + self.structs.len()
            + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered list of header files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub files: Vec<DeclFile>,
}
