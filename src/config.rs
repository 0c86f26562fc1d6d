//! Configuration for the stub responder.
//!
//! Defines stub expectations and static file fallback settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Top-level configuration file for a responder.
///
/// Bundles the stubs to preload into a registry with the static file
/// fallback settings. Usually loaded from YAML at suite start.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ResponderConfig {
    /// Stubs to preload into the registry
    #[serde(default)]
    pub stubs: Vec<Stub>,

    /// Static file fallback settings
    #[serde(default)]
    pub static_files: StaticFileConfig,
}

impl ResponderConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, stub) in self.stubs.iter().enumerate() {
            stub.validate()
                .map_err(|e| anyhow::anyhow!("Stub {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A single stub expectation: request pattern plus canned response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stub {
    /// Exact request path to match (e.g. "/api/users")
    pub url: String,

    /// HTTP method, matched case-insensitively
    pub method: String,

    /// Parameter constraints; an empty map accepts any parameters, a
    /// non-empty one requires every listed key/value to be present in the
    /// request (extra request parameters never disqualify a stub)
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,

    /// Canned value serialized as the JSON response body on a hit
    pub response: Value,
}

impl Stub {
    /// Create a stub matching `method url` with no parameter constraints.
    pub fn new(url: impl Into<String>, method: impl Into<String>, response: Value) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            params: serde_json::Map::new(),
            response,
        }
    }

    /// Add a parameter constraint.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Validate the stub definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("stub url cannot be empty");
        }
        if !self.url.starts_with('/') {
            anyhow::bail!("stub url must start with '/': {}", self.url);
        }
        if self.method.is_empty() {
            anyhow::bail!("stub method cannot be empty");
        }
        Ok(())
    }
}

/// Static file fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticFileConfig {
    /// Filesystem root that request paths map onto
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// URL prefix stripped from request paths before mapping onto `root_path`
    #[serde(default)]
    pub virtual_dir: Option<String>,
}

fn default_root_path() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            virtual_dir: None,
        }
    }
}

impl StaticFileConfig {
    /// Map a request path onto a candidate file under `root_path`.
    ///
    /// `/` maps to `{root_path}/index.html`; a path starting with the
    /// configured virtual directory prefix has that prefix stripped first;
    /// anything else joins the path to `root_path` directly. Returns `None`
    /// when the path would escape the root via a `..` component.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let remainder = if request_path == "/" {
            "index.html"
        } else if let Some(stripped) = self
            .virtual_dir
            .as_deref()
            .and_then(|vdir| request_path.strip_prefix(vdir))
        {
            stripped.trim_start_matches('/')
        } else {
            request_path.trim_start_matches('/')
        };

        let candidate = Path::new(remainder);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }
        Some(self.root_path.join(candidate))
    }
}
