//! Configuration loading and environment fallback
//!
//! Blank configuration fields fall back to environment variables, then to
//! persisted settings. Component config bags are YAML or JSON, chosen by the
//! file extension.

use crate::error::{ArtifError, Result};
use crate::store::{ArtifactStore, RestStore, StoreConfig, DEFAULT_TIMEOUT_SECS};
use artif_types::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

static SERVER_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^/\s]+(/\S*)?$").expect("server URL pattern"));

/// Environment variable names consulted for blank fields
pub mod vars {
    pub const TOKEN: &str = "ARTIFACTORY_TOKEN";
    pub const SERVER: &str = "ARTIFACTORY_SERVER";
    pub const OUTPUT_DIR: &[&str] = &["ARTIFACTORY_OUTPUTDIR", "OUTPUTDIR"];
    pub const LOGGING: &[&str] = &["ARTIFACTORY_LOGGING", "LOGGING"];

    pub const VCENTER_SERVER: &str = "VCENTER_SERVER";
    pub const VCENTER_USER: &str = "VCENTER_USER";
    pub const VCENTER_PASSWORD: &str = "VCENTER_PASSWORD";
    pub const VCENTER_DATACENTER: &str = "VCENTER_DATACENTER";
    pub const VCENTER_DATASTORE: &str = "VCENTER_DATASTORE";
    pub const VCENTER_CLUSTER: &str = "VCENTER_CLUSTER";
    pub const VCENTER_FOLDER: &str = "VCENTER_FOLDER";
    pub const VCENTER_RESOURCE_POOL: &str = "VCENTER_RESOURCE_POOL";
}

/// Snapshot of environment variables
///
/// Captured once so configuration decoding is reproducible in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        std::env::vars().collect()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Non-blank value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value among `keys`
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// `value` unless blank, else the first non-blank variable among `keys`
    pub fn or_env(&self, value: &str, keys: &[&str]) -> String {
        let value = value.trim();
        if !value.is_empty() {
            return value.to_string();
        }
        self.first(keys).unwrap_or_default().to_string()
    }

    /// Log filter from the logging variables
    pub fn log_level(&self) -> Option<&str> {
        self.first(vars::LOGGING)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Defaults persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub log_level: String,
}

/// Repository connection fields shared by every component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, rename = "artifactory_token", alias = "token")]
    pub token: String,
    /// API base, e.g. `https://server.com:8081/artifactory/api`
    #[serde(default, rename = "artifactory_server", alias = "server")]
    pub server: String,
    #[serde(default, rename = "artifactory_timeout_secs", alias = "timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            server: server.into(),
            timeout_secs: None,
        }
    }

    /// Fill blank fields from the environment
    pub fn with_env(mut self, env: &Environment) -> Self {
        self.token = env.or_env(&self.token, &[vars::TOKEN]);
        self.server = env.or_env(&self.server, &[vars::SERVER]);
        self
    }

    /// Fill fields still blank from persisted settings
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if self.token.trim().is_empty() {
            self.token = settings.token.clone();
        }
        if self.server.trim().is_empty() {
            self.server = settings.server.clone();
        }
        if self.timeout_secs.is_none() {
            self.timeout_secs = settings.timeout_secs;
        }
        self
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::ok()
            .require("artifactory_token", &self.token)
            .require("artifactory_server", &self.server);

        let server = self.server.trim();
        if !server.is_empty() && !SERVER_URL.is_match(server) {
            result = result.with_error(ValidationError {
                field: "artifactory_server".to_string(),
                message: format!("'{}' is not an http(s) URL", server),
                code: "INVALID_URL".to_string(),
            });
        }
        result
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.server.trim(), self.token.trim()).with_timeout(self.timeout())
    }

    /// Open a REST store after checking the required fields
    pub fn connect(&self) -> Result<Arc<dyn ArtifactStore>> {
        let validation = self.validate();
        if !validation.valid {
            return Err(ArtifError::InvalidArgument(validation.error_summary()));
        }
        Ok(Arc::new(RestStore::new(self.store_config())?))
    }
}

/// Loads component configuration files
pub struct ConfigManager;

impl ConfigManager {
    fn is_json(path: &Path) -> bool {
        path.extension().map(|e| e == "json").unwrap_or(false)
    }

    /// Read a YAML or JSON file into an untyped value
    pub fn load_value(path: &Path) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(path)?;
        let value = if Self::is_json(path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(value)
    }

    pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
        Ok(serde_json::from_value(Self::load_value(path)?)?)
    }

    pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
        let content = if Self::is_json(path) {
            serde_json::to_string_pretty(value)?
        } else {
            serde_yaml::to_string(value)?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}
