//! Fixed support code at the top of every generated module

use super::calls::MAX_CALL_SLOTS;

/// Type names the prelude defines
pub const PRELUDE_TYPES: &[&str] = &["Error", "AsRawAddress", "LazyDll", "LazyProc"];

/// Value names the prelude defines
pub const PRELUDE_VALUES: &[&str] = &[
    "to_result",
    "dispatch",
    "syscall3",
    "syscall6",
    "syscall9",
    "syscall12",
    "NATIVE_LIBRARY",
    "E_PROC_NOT_FOUND",
    "LoadLibraryA",
    "GetProcAddress",
];

const HEADER: &str = r#"// Code generated by sdkbind. DO NOT EDIT.

#![allow(
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code,
    unused_mut,
    unsafe_op_in_unsafe_fn,
    clippy::all
)]

use std::ffi::c_void;
use std::fmt;
use std::sync::OnceLock;

/// Failed HRESULT returned by a native call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Error(pub i32);

impl Error {
    /// The raw HRESULT
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Symbolic name of a well-known HRESULT
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 as u32 {
            0x80004001 => "E_NOTIMPL",
            0x80004002 => "E_NOINTERFACE",
            0x80004003 => "E_POINTER",
            0x80004005 => "E_FAIL",
            0x8007000E => "E_OUTOFMEMORY",
            0x80070057 => "E_INVALIDARG",
            0x8007007F => "E_PROC_NOT_FOUND",
            0x887A0001 => "DXGI_ERROR_INVALID_CALL",
            0x887A0005 => "DXGI_ERROR_DEVICE_REMOVED",
            0x887A0006 => "DXGI_ERROR_DEVICE_HUNG",
            0x887A0007 => "DXGI_ERROR_DEVICE_RESET",
            0x887A000A => "DXGI_ERROR_WAS_STILL_DRAWING",
            0x887C0001 => "D3D11_ERROR_TOO_MANY_UNIQUE_STATE_OBJECTS",
            0x887C0002 => "D3D11_ERROR_FILE_NOT_FOUND",
            0x887C0003 => "D3D11_ERROR_TOO_MANY_UNIQUE_VIEW_OBJECTS",
            0x887C0004 => "D3D11_ERROR_DEFERRED_CONTEXT_MAP_WITHOUT_INITIAL_DISCARD",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#010x})", name, self.0 as u32),
            None => write!(f, "unknown error: HRESULT {:#010x}", self.0 as u32),
        }
    }
}

impl std::error::Error for Error {}

/// Non-negative HRESULTs are success
fn to_result(ret: usize) -> Result<(), Error> {
    let code = ret as i32;
    if code >= 0 {
        Ok(())
    } else {
        Err(Error(code))
    }
}

/// Values passed where the native API takes an untyped address
pub trait AsRawAddress {
    fn as_raw_address(self) -> usize;
}

impl<T> AsRawAddress for *mut T {
    fn as_raw_address(self) -> usize {
        self as usize
    }
}

impl<T> AsRawAddress for *const T {
    fn as_raw_address(self) -> usize {
        self as usize
    }
}

impl<T> AsRawAddress for &mut T {
    fn as_raw_address(self) -> usize {
        self as *mut T as usize
    }
}

impl<T> AsRawAddress for &T {
    fn as_raw_address(self) -> usize {
        self as *const T as usize
    }
}

#[link(name = "kernel32")]
extern "system" {
    fn LoadLibraryA(name: *const u8) -> usize;
    fn GetProcAddress(module: usize, name: *const u8) -> usize;
}

/// HRESULT_FROM_WIN32(ERROR_PROC_NOT_FOUND)
const E_PROC_NOT_FOUND: i32 = 0x8007007Fu32 as i32;

/// Library loaded on first use. `name` is NUL terminated.
pub struct LazyDll {
    name: &'static str,
    handle: OnceLock<usize>,
}

impl LazyDll {
    pub const fn new(name: &'static str) -> Self {
        LazyDll {
            name,
            handle: OnceLock::new(),
        }
    }

    fn handle(&self) -> usize {
        *self
            .handle
            .get_or_init(|| unsafe { LoadLibraryA(self.name.as_ptr()) })
    }
}

/// Export resolved on first use. `name` is NUL terminated.
pub struct LazyProc {
    dll: &'static LazyDll,
    name: &'static str,
    addr: OnceLock<usize>,
}

impl LazyProc {
    pub const fn new(dll: &'static LazyDll, name: &'static str) -> Self {
        LazyProc {
            dll,
            name,
            addr: OnceLock::new(),
        }
    }

    /// Address of the export
    pub fn find(&self) -> Result<usize, Error> {
        let addr = *self.addr.get_or_init(|| match self.dll.handle() {
            0 => 0,
            module => unsafe { GetProcAddress(module, self.name.as_ptr()) },
        });
        if addr == 0 {
            Err(Error(E_PROC_NOT_FOUND))
        } else {
            Ok(addr)
        }
    }
}

macro_rules! native_call {
    (@usize $a:ident) => {
        usize
    };
    ($f:expr; $($a:ident),*) => {{
        let f: unsafe extern "system" fn($(native_call!(@usize $a)),*) -> usize =
            std::mem::transmute($f);
        f($($a),*)
    }};
}
"#;

/// Prelude for a module binding `dll_name`
pub fn prelude(dll_name: &str) -> String {
    let mut output = HEADER.to_string();
    output.push('\n');
    output.push_str(&dispatch());
    for slots in (3..=MAX_CALL_SLOTS).step_by(3) {
        output.push('\n');
        output.push_str(&primitive(slots));
    }
    output.push_str(&format!(
        "\nstatic NATIVE_LIBRARY: LazyDll = LazyDll::new(\"{}\\0\");\n\n",
        dll_name
    ));
    output
}

fn args(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("a{}", i)).collect()
}

/// Calls `f` with exactly `args.len()` arguments
fn dispatch() -> String {
    let mut output = String::from("unsafe fn dispatch(f: usize, args: &[usize]) -> usize {\n    match *args {\n");
    for n in 0..=MAX_CALL_SLOTS {
        let names = args(n).join(", ");
        output.push_str(&format!("        [{}] => native_call!(f; {}),\n", names, names));
    }
    output.push_str("        _ => unreachable!(\"more than 12 call arguments\"),\n    }\n}\n");
    output
}

/// `syscallN(f, nargs, a1..aN)`, passing only the first `nargs` slots
fn primitive(slots: usize) -> String {
    let names = args(slots);
    let params = names
        .iter()
        .map(|a| format!("{}: usize", a))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "pub unsafe fn syscall{}(f: usize, nargs: usize, {}) -> usize {{\n    dispatch(f, &[{}][..nargs])\n}}\n",
        slots,
        params,
        names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_contents() {
        let code = prelude("d3d11.dll");
        assert!(code.starts_with("// Code generated by sdkbind. DO NOT EDIT.\n"));
        assert!(code.contains("pub struct Error(pub i32);"));
        assert!(code.contains("fn to_result(ret: usize) -> Result<(), Error>"));
        assert!(code.contains("            0x80070057 => \"E_INVALIDARG\",\n"));
        assert!(code.contains("Some(name) => write!(f, \"{} ({:#010x})\", name, self.0 as u32),"));
        assert!(code.contains("static NATIVE_LIBRARY: LazyDll = LazyDll::new(\"d3d11.dll\\0\");"));
        for name in ["syscall3", "syscall6", "syscall9", "syscall12"] {
            assert!(code.contains(&format!("pub unsafe fn {}(", name)));
        }
    }

    #[test]
    fn test_primitive_slices_by_nargs() {
        assert_eq!(
            primitive(3),
            "pub unsafe fn syscall3(f: usize, nargs: usize, a1: usize, a2: usize, a3: usize) -> usize {\n    dispatch(f, &[a1, a2, a3][..nargs])\n}\n"
        );
    }

    #[test]
    fn test_dispatch_covers_every_arity() {
        let code = dispatch();
        assert!(code.contains("        [] => native_call!(f; ),\n"));
        assert!(code.contains("[a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12] => native_call!(f; a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12),"));
    }
}
