//! Provider configuration loading from YAML files
//!
//! Configuration normally comes from a YAML file and may be overridden from
//! the environment (and, in the CLI, from flags).

use crate::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Request timeout used when the configuration does not set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_SPEC: &str = "OPENAPI_PROVIDER_SPEC";
const ENV_API_KEY: &str = "OPENAPI_PROVIDER_API_KEY";
const ENV_BASE_URL: &str = "OPENAPI_PROVIDER_BASE_URL";

/// Where the OpenAPI document is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(String),
    File(PathBuf),
}

impl SpecSource {
    /// Classify a user-supplied location: `http(s)://` is a URL, anything
    /// else a local path
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SpecSource::Url(trimmed.to_string())
        } else {
            SpecSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecSource::Url(url) => write!(f, "{}", url),
            SpecSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Prefix of every resource type name (e.g. "cdn" -> "cdn_cdns")
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Location of the OpenAPI document (URL or file path)
    #[serde(default)]
    pub spec: Option<String>,

    /// Overrides the base URL derived from the document
    #[serde(default)]
    pub base_url: Option<String>,

    /// Static API key sent on every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the API key header name derived from the document
    #[serde(default)]
    pub api_key_header: Option<String>,

    /// Values for header parameters declared by the document
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openapi".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            spec: None,
            base_url: None,
            api_key: None,
            api_key_header: None,
            headers: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            ProviderError::Config(format!("Failed to parse config YAML from {:?}: {}", path, e))
        })
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProviderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OPENAPI_PROVIDER_*` environment overrides
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(spec) = lookup(ENV_SPEC) {
            self.spec = Some(spec);
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        self
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The configured document location
    pub fn spec_source(&self) -> Result<SpecSource> {
        self.spec
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(SpecSource::parse)
            .ok_or_else(|| ProviderError::Config("No OpenAPI document location configured".into()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.provider_name.is_empty()
            || !self
                .provider_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ProviderError::Config(format!(
                "Provider name '{}' must be non-empty lowercase alphanumeric or underscore",
                self.provider_name
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ProviderError::Config(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = ProviderConfig::from_yaml("provider_name: cdn\napi_key: secret\n").unwrap();
        assert_eq!(config.provider_name, "cdn");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "provider_name: cdn\nspec: http://localhost:8080/swagger.json\nheaders:\n  X-Request-ID: abc\ntimeout_secs: 5"
        )
        .unwrap();

        let config = ProviderConfig::load(file.path()).unwrap();
        assert_eq!(config.headers.get("X-Request-ID").unwrap(), "abc");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.spec_source().unwrap(),
            SpecSource::Url("http://localhost:8080/swagger.json".to_string())
        );
    }

    #[test]
    fn test_invalid_provider_name() {
        let result = ProviderConfig::from_yaml("provider_name: My-Provider\n");
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(ProviderConfig::from_yaml("timeout_secs: 0\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = ProviderConfig::new("cdn").apply_overrides(|key| match key {
            "OPENAPI_PROVIDER_API_KEY" => Some("from-env".to_string()),
            "OPENAPI_PROVIDER_SPEC" => Some("./swagger.yaml".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.spec_source().unwrap(),
            SpecSource::File(PathBuf::from("./swagger.yaml"))
        );
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_missing_spec_source() {
        assert!(ProviderConfig::new("cdn").spec_source().is_err());
    }
}
