//! Generator configuration
//!
//! Loaded from a JSON file. Every field has a default, so a config file only
//! lists what differs from the stock D3D11 run:
//!
//! ```json
//! {
//!   "include_dir": "sdk/include",
//!   "output": "src/d3d11.rs",
//!   "jobs": 4,
//!   "rules": { "strip_prefixes": ["ID3D11", "D3D11_", "D3D11", "D3D_"] }
//! }
//! ```

use crate::error::{Error, Result};
use crate::transform::RuleSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Headers of the stock run, in emission order
pub const DEFAULT_HEADERS: &[&str] = &[
    "D3D11.h",
    "DXGI.h",
    "DXGIType.h",
    "D3Dcommon.h",
    "DXGIFormat.h",
    "D3D11SDKLayers.h",
    "D3D11Shader.h",
    "D3Dcompiler.h",
];

/// Settings for one generator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory the header names are relative to
    pub include_dir: PathBuf,
    /// Header files, in emission order
    pub headers: Vec<String>,
    /// Generated Rust module
    pub output: PathBuf,
    /// Directory for per-file JSON dumps, none if unset
    pub dump_dir: Option<PathBuf>,
    /// Library the generated functions are resolved from
    pub dll_name: String,
    /// Prepend GUID, Rect and the Windows handle aliases
    pub include_builtins: bool,
    /// Worker threads for per-file work, sequential when 1
    pub jobs: usize,
    /// Drop enum constants redefined with a different value instead of failing
    pub allow_conflicting_enum_duplicates: bool,
    /// Classification tables
    pub rules: RuleSet,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            include_dir: PathBuf::from("DXSDK_Jun10/include"),
            headers: DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
            output: PathBuf::from("dist/d3d11.rs"),
            dump_dir: Some(PathBuf::from("data")),
            dll_name: "d3d11.dll".to_string(),
            include_builtins: true,
            jobs: 1,
            allow_conflicting_enum_duplicates: false,
            rules: RuleSet::default(),
        }
    }
}

impl GeneratorConfig {
    /// Reads and validates a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_json(&text)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a JSON config
    pub fn from_json(text: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.headers.is_empty() {
            return Err(Error::Config("no headers configured".to_string()));
        }
        if self.jobs == 0 {
            return Err(Error::Config("jobs must be at least 1".to_string()));
        }
        if self.dll_name.is_empty() || self.dll_name.contains('\0') {
            return Err(Error::Config(format!("invalid library name `{}`", self.dll_name)));
        }
        self.rules.validate()
    }

    /// Paths of the configured headers
    pub fn header_paths(&self) -> Vec<PathBuf> {
        self.headers.iter().map(|h| self.include_dir.join(h)).collect()
    }
}
