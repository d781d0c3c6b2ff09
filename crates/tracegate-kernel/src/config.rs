//! Registry configuration and module-prefix policy.
//!
//! Configuration is TOML. Every key is optional; missing keys fall back to
//! the defaults below.
//!
//! ```toml
//! allowed_roots = ["torch", "math"]
//! ignore_prefixes = ["torch.testing."]
//!
//! [overrides]
//! allow = ["mylib.fused_gelu"]
//! disallow = ["torch.sub"]
//! forbid = ["mylib.debug_dump"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Module roots whose contents may appear as opaque graph nodes.
pub const DEFAULT_ALLOWED_ROOTS: &[&str] = &["torch", "math"];

/// Subtrees excluded even when nominally under an allowed root. Their
/// callables mutate state the graph cannot represent (for example RNN
/// modules re-flatten parameters through storages), so they must be
/// traced through instead.
pub const DEFAULT_DENIED_MODULE_PREFIXES: &[&str] = &[
    "torch.optim.",
    "torch.nn.modules.rnn.",
    "torch._dynamo.",
    "torch._C._dynamo.",
    "torch._inductor.",
    "torch._C.inductor.",
    "torch.fx.",
    "torch.distributed.fsdp.",
];

/// Namespaces pruned from discovery entirely.
pub const DEFAULT_IGNORE_PREFIXES: &[&str] = &[
    "torch.distributions.",
    "torch.testing.",
    "torch._refs.",
    "torch._prims.",
    "torch._decomp.",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// User-facing override lists, by host object key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OverrideConfig {
    pub allow: Vec<String>,
    pub disallow: Vec<String>,
    pub forbid: Vec<String>,
}

impl OverrideConfig {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.disallow.is_empty() && self.forbid.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub allowed_roots: Vec<String>,
    pub denied_module_prefixes: Vec<String>,
    pub ignore_prefixes: Vec<String>,
    pub overrides: OverrideConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allowed_roots: to_owned_list(DEFAULT_ALLOWED_ROOTS),
            denied_module_prefixes: to_owned_list(DEFAULT_DENIED_MODULE_PREFIXES),
            ignore_prefixes: to_owned_list(DEFAULT_IGNORE_PREFIXES),
            overrides: OverrideConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Parse configuration text. `origin` is used in error messages only.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn policy(&self) -> ModulePolicy {
        ModulePolicy {
            allowed_roots: self.allowed_roots.clone(),
            denied_module_prefixes: self.denied_module_prefixes.clone(),
            ignore_prefixes: self.ignore_prefixes.clone(),
        }
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// `name` is matched by `prefix` when `name.` starts with it, so `A.sub.`
/// covers the namespace `A.sub` as well as everything below it.
fn prefix_covers(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix) || prefix.strip_suffix('.') == Some(name)
}

/// Prefix rules applied while walking the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePolicy {
    allowed_roots: Vec<String>,
    denied_module_prefixes: Vec<String>,
    ignore_prefixes: Vec<String>,
}

impl ModulePolicy {
    /// Whether `qualified_name` falls under an ignore-list prefix.
    pub fn ignores(&self, qualified_name: &str) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|prefix| prefix_covers(qualified_name, prefix))
    }

    /// Whether objects originating in `module` may be recorded.
    pub fn admits_module(&self, module: &str) -> bool {
        let under_root = self.allowed_roots.iter().any(|root| {
            module == root
                || module
                    .strip_prefix(root.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        });
        under_root
            && !self
                .denied_module_prefixes
                .iter()
                .any(|prefix| prefix_covers(module, prefix))
            && !self.ignores(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_framework_roots() {
        let policy = RegistryConfig::default().policy();
        assert!(policy.admits_module("torch"));
        assert!(policy.admits_module("torch.nn.functional"));
        assert!(policy.admits_module("math"));
        assert!(!policy.admits_module("torchvision"));
        assert!(!policy.admits_module("numpy"));
    }

    #[test]
    fn denied_prefixes_exclude_subtrees() {
        let policy = RegistryConfig::default().policy();
        assert!(!policy.admits_module("torch.optim"));
        assert!(!policy.admits_module("torch.optim.adam"));
        assert!(!policy.admits_module("torch.nn.modules.rnn"));
        assert!(policy.admits_module("torch.nn.modules.linear"));
        assert!(!policy.admits_module("torch._dynamo.eval_frame"));
    }

    #[test]
    fn ignore_prefix_covers_namespace_and_descendants() {
        let config = RegistryConfig {
            allowed_roots: vec!["A".to_string()],
            denied_module_prefixes: Vec::new(),
            ignore_prefixes: vec!["A.sub.".to_string()],
            overrides: OverrideConfig::default(),
        };
        let policy = config.policy();
        assert!(policy.ignores("A.sub"));
        assert!(policy.ignores("A.sub.g"));
        assert!(!policy.ignores("A.subtle"));
        assert!(!policy.ignores("A"));
        assert!(!policy.admits_module("A.sub"));
        assert!(policy.admits_module("A"));
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = RegistryConfig::from_toml_str(
            r#"
ignore_prefixes = ["torch.testing."]

[overrides]
allow = ["mylib.fused"]
"#,
            "inline",
        )
        .expect("config should parse");
        assert_eq!(config.allowed_roots, vec!["torch", "math"]);
        assert_eq!(config.ignore_prefixes, vec!["torch.testing."]);
        assert_eq!(config.overrides.allow, vec!["mylib.fused"]);
        assert!(config.overrides.disallow.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RegistryConfig::from_toml_str("allowed_modules = []", "inline")
            .expect_err("unknown key should fail");
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().starts_with("invalid toml at inline"));
    }
}
