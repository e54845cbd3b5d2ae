//! Plugin component trait and registry

use crate::config::{Environment, ServerConfig};
use crate::error::{ArtifError, Result};
use crate::store::{ArtifactStore, MemoryStore};
use artif_types::{ArtifactMetadata, Properties, ResolvedArtifact, ValidationResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Role a component plays in the host's build
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    DataSource,
    PostProcessor,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::DataSource => write!(f, "data source"),
            ComponentKind::PostProcessor => write!(f, "post-processor"),
        }
    }
}

/// What a component runs against
#[derive(Clone)]
pub struct ExecutionContext {
    pub store: Arc<dyn ArtifactStore>,
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Context for components that never touch the repository
    pub fn offline() -> Self {
        Self::new(Arc::new(MemoryStore::new("")))
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ArtifError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-file outcome of a multi-file transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// Local paths written or remote URIs created
    pub succeeded: Vec<String>,
    pub failed: Vec<TransferFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub file: String,
    pub error: String,
}

impl TransferReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Steps completed by an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub image_name: String,
    pub downloaded: Option<PathBuf>,
    pub converted: PathBuf,
    pub template: bool,
}

/// Values a component hands back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ComponentOutput {
    Artifact(ResolvedArtifact),
    Transfers(TransferReport),
    Uploaded(ArtifactMetadata),
    Imported(ImportReport),
    PropertiesUpdated {
        artifact_uri: String,
        properties: Properties,
    },
}

/// A data source or post-processor
///
/// `configure` decodes the host's config bag, fills blank fields from the
/// environment and fails on missing required inputs. `execute` does the work.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ComponentKind;

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()>;

    /// Repository connection after `configure`
    fn server(&self) -> &ServerConfig;

    /// Whether `execute` talks to the repository at all
    fn needs_store(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput>;
}

/// Decode a component's config bag
pub fn decode_config<T: DeserializeOwned>(component: &str, raw: serde_json::Value) -> Result<T> {
    let raw = match raw {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(raw)
        .map_err(|e| ArtifError::Config(format!("{}: {}", component, e)))
}

/// Log warnings and fail on errors
pub fn finish_validation(component: &str, validation: ValidationResult) -> Result<()> {
    for warning in &validation.warnings {
        match &warning.suggestion {
            Some(suggestion) => warn!("{}: {} ({})", component, warning.message, suggestion),
            None => warn!("{}: {}", component, warning.message),
        }
    }

    if validation.valid {
        Ok(())
    } else {
        Err(ArtifError::InvalidArgument(format!(
            "{}: {}",
            component,
            validation.error_summary()
        )))
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

struct Registration {
    kind: ComponentKind,
    factory: Factory,
}

/// Named component factories
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<&'static str, Registration>,
    default: Option<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under the name its components report
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        let probe = factory();
        self.entries.insert(
            probe.name(),
            Registration {
                kind: probe.kind(),
                factory: Box::new(factory),
            },
        );
    }

    /// Component used when the host names none
    pub fn set_default(&mut self, name: &'static str) {
        self.default = Some(name);
    }

    pub fn default_name(&self) -> Option<&'static str> {
        self.default
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Fresh, unconfigured component; `None` for an unknown name
    pub fn create(&self, name: &str) -> Option<Box<dyn Component>> {
        self.entries.get(name).map(|r| (r.factory)())
    }

    pub fn create_default(&self) -> Option<Box<dyn Component>> {
        self.default.and_then(|name| self.create(name))
    }

    /// Registered names with their kinds, sorted by name
    pub fn list(&self) -> Vec<(&'static str, ComponentKind)> {
        let mut all: Vec<_> = self.entries.iter().map(|(n, r)| (*n, r.kind)).collect();
        all.sort_by_key(|(name, _)| *name);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Echo {
        server: ServerConfig,
        message: String,
    }

    #[derive(Deserialize)]
    struct EchoConfig {
        #[serde(flatten)]
        server: ServerConfig,
        #[serde(default)]
        message: String,
    }

    #[async_trait]
    impl Component for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::PostProcessor
        }

        fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
            let config: EchoConfig = decode_config(self.name(), raw)?;
            self.server = config.server.with_env(env);
            self.message = config.message;
            finish_validation(
                self.name(),
                self.server
                    .validate()
                    .recommend("message", &self.message, "set a message"),
            )
        }

        fn server(&self) -> &ServerConfig {
            &self.server
        }

        async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
            ctx.check_cancelled()?;
            Ok(ComponentOutput::PropertiesUpdated {
                artifact_uri: self.message.clone(),
                properties: Properties::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_registry_creates_fresh_components() {
        let mut registry = ComponentRegistry::new();
        registry.register(|| Box::new(Echo::default()));
        registry.set_default("echo");

        assert!(registry.has("echo"));
        assert!(registry.create("nope").is_none());
        assert_eq!(registry.list(), vec![("echo", ComponentKind::PostProcessor)]);

        let mut echo = registry.create_default().unwrap();
        let env = Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", "http://mem/artifactory/api");
        echo.configure(serde_json::json!({"message": "hi"}), &env)
            .unwrap();
        assert_eq!(echo.server().token, "t");

        let ctx = ExecutionContext::new(Arc::new(MemoryStore::new("http://mem/artifactory/api")));
        let out = echo.execute(&ctx).await.unwrap();
        assert!(matches!(out, ComponentOutput::PropertiesUpdated { ref artifact_uri, .. } if artifact_uri == "hi"));

        ctx.cancel.cancel();
        assert!(matches!(echo.execute(&ctx).await, Err(ArtifError::Cancelled)));
    }

    #[test]
    fn test_configure_fails_fast_on_missing_fields() {
        let mut echo = Echo::default();
        let err = echo
            .configure(serde_json::Value::Null, &Environment::empty())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("echo"));
    }
}
