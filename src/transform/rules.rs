//! Classification rule table
//!
//! Every name-based heuristic the parser, transformer and emitter apply lives
//! here, so a run over a different SDK only needs a different [`RuleSet`].
//!
//! | Rule | Default | Used by |
//! |------|---------|---------|
//! | `strip_prefixes` | `ID3D11`, `D3D11_`, `D3D11`, `D3D_` | identifier normalization |
//! | `array_length_params` | prefix `Num`, exact `FeatureLevels` | array/length pairing |
//! | `opaque_pointer_types` | `void`, `IUnknown` (at depth 2) | deref classification |
//! | `resource_pointer_types` | `ID3D11Resource`, `ID3D11Asynchronous`, ... (depth 1) | deref classification |
//! | `skip_macros` | DLL path strings, `INTERFACE` | `#define` evaluation |
//! | `ignored_constants` | suffix `_H_VERSION__` | constant emission |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Name matcher used by the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(s) => name == s,
            NamePattern::Prefix(s) => name.starts_with(s.as_str()),
            NamePattern::Suffix(s) => name.ends_with(s.as_str()),
        }
    }
}

/// Heuristic tables for one SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Removed from every identifier, in order. A longer prefix must come
    /// before any shorter prefix it contains.
    pub strip_prefixes: Vec<String>,
    /// Names of count parameters that pair with an adjacent `HasECount` pointer
    pub array_length_params: Vec<NamePattern>,
    /// Pointee types whose double pointers are accepted as raw addresses
    pub opaque_pointer_types: Vec<String>,
    /// Interface types whose single pointers are accepted as raw addresses
    pub resource_pointer_types: Vec<String>,
    /// `#define` names never evaluated
    pub skip_macros: Vec<NamePattern>,
    /// Constants never emitted
    pub ignored_constants: Vec<NamePattern>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            strip_prefixes: ["ID3D11", "D3D11_", "D3D11", "D3D_"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            array_length_params: vec![
                NamePattern::Prefix("Num".to_string()),
                NamePattern::Exact("FeatureLevels".to_string()),
            ],
            opaque_pointer_types: vec!["void".to_string(), "IUnknown".to_string()],
            resource_pointer_types: [
                "ID3D11Resource",
                "ID3D11Asynchronous",
                "ID3D11View",
                "IDXGIAdapter",
                "IUnknown",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            skip_macros: vec![
                NamePattern::Prefix("D3DCOMPILER_DLL".to_string()),
                NamePattern::Exact("INTERFACE".to_string()),
                NamePattern::Suffix("_H_VERSION__".to_string()),
            ],
            ignored_constants: vec![NamePattern::Suffix("_H_VERSION__".to_string())],
        }
    }
}

impl RuleSet {
    /// Checks the prefix ordering constraint
    pub fn validate(&self) -> Result<()> {
        for (i, short) in self.strip_prefixes.iter().enumerate() {
            if short.is_empty() {
                return Err(Error::Config("empty strip prefix".to_string()));
            }
            let shadowed = self.strip_prefixes[i + 1..]
                .iter()
                .find(|long| long.len() > short.len() && long.contains(short.as_str()));
            if let Some(long) = shadowed {
                return Err(Error::Config(format!(
                    "strip prefix `{}` must be listed after `{}`",
                    short, long
                )));
            }
        }
        Ok(())
    }

    /// Removes every configured prefix from `ident`
    pub fn normalize(&self, ident: &str) -> String {
        self.strip_prefixes
            .iter()
            .fold(ident.to_string(), |acc, prefix| acc.replace(prefix.as_str(), ""))
    }

    pub fn is_array_length(&self, name: &str) -> bool {
        self.array_length_params.iter().any(|p| p.matches(name))
    }

    /// Returns true if a pointer of `depth` levels to `ident` should be accepted
    /// as any value exposing a raw address
    pub fn is_deref(&self, ident: &str, depth: usize) -> bool {
        match depth {
            1 => self.resource_pointer_types.iter().any(|t| t == ident),
            2 => self.opaque_pointer_types.iter().any(|t| t == ident),
            _ => false,
        }
    }

    pub fn skips_macro(&self, name: &str) -> bool {
        self.skip_macros.iter().any(|p| p.matches(name))
    }

    pub fn ignores_constant(&self, name: &str) -> bool {
        self.ignored_constants.iter().any(|p| p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        assert!(RuleSet::default().validate().is_ok());
    }

    #[test]
    fn test_short_prefix_first_is_rejected() {
        let rules = RuleSet {
            strip_prefixes: vec!["D3D11".to_string(), "ID3D11".to_string()],
            ..RuleSet::default()
        };
        assert!(matches!(rules.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_normalize_longest_first() {
        let rules = RuleSet::default();
        assert_eq!(rules.normalize("ID3D11Device"), "Device");
        assert_eq!(rules.normalize("D3D11_BUFFER_DESC"), "BUFFER_DESC");
        assert_eq!(rules.normalize("D3D11CreateDevice"), "CreateDevice");
        assert_eq!(rules.normalize("D3D_FEATURE_LEVEL"), "FEATURE_LEVEL");
        assert_eq!(rules.normalize("IDXGIAdapter"), "IDXGIAdapter");
    }

    #[test]
    fn test_array_length_patterns() {
        let rules = RuleSet::default();
        assert!(rules.is_array_length("NumViews"));
        assert!(rules.is_array_length("FeatureLevels"));
        assert!(!rules.is_array_length("pFeatureLevels"));
    }

    #[test]
    fn test_deref_depths() {
        let rules = RuleSet::default();
        assert!(rules.is_deref("void", 2));
        assert!(!rules.is_deref("void", 1));
        assert!(rules.is_deref("ID3D11Resource", 1));
        assert!(!rules.is_deref("ID3D11Buffer", 1));
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"{ "strip_prefixes": ["DXGI_"], "skip_macros": [{ "exact": "FOO" }] }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(rules.normalize("DXGI_FORMAT"), "FORMAT");
        assert!(rules.skips_macro("FOO"));
        assert!(rules.is_array_length("NumViews"));
    }
}
