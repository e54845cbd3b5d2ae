//! `source-image` data source: resolve one image artifact

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{Environment, ServerConfig};
use artif_core::{
    resolve_artifact, Component, ComponentKind, ComponentOutput, ExecutionContext, ResolveRequest,
    Result,
};
use artif_types::{PropertyFilter, DEFAULT_FILE_TYPE};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceImageConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(default)]
    pub artifact_name: String,
    #[serde(default)]
    pub file_type: String,
    /// Shorthand for a `channel=<value>` filter entry
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
}

impl SourceImageConfig {
    pub fn request(&self) -> ResolveRequest {
        let mut properties: PropertyFilter = self.filter.clone().into();
        let channel = self.channel.trim();
        if !channel.is_empty() {
            properties.insert("channel", channel);
        }

        ResolveRequest {
            name: self.artifact_name.trim().to_string(),
            file_type: self.file_type.clone(),
            properties,
        }
    }
}

#[derive(Default)]
pub struct SourceImage {
    config: SourceImageConfig,
}

impl SourceImage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for SourceImage {
    fn name(&self) -> &'static str {
        "source-image"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::DataSource
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: SourceImageConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);

        let validation = config
            .server
            .validate()
            .require("artifact_name", &config.artifact_name)
            .recommend(
                "file_type",
                &config.file_type,
                &format!("{} is used", DEFAULT_FILE_TYPE),
            );

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        let request = self.config.request();
        let resolution = resolve_artifact(ctx.store.as_ref(), &request, &ctx.cancel).await?;

        info!(
            "{} resolved to {}",
            request.name, resolution.artifact.download_uri
        );
        Ok(ComponentOutput::Artifact(resolution.artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artif_core::{ErrorKind, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    const API: &str = "http://mem/artifactory/api";

    fn env() -> Environment {
        Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", API)
    }

    #[test]
    fn test_channel_becomes_property() {
        let config: SourceImageConfig = serde_json::from_value(json!({
            "artifact_name": " rhel9 ",
            "channel": "prod",
            "filter": {"release": "stable"}
        }))
        .unwrap();

        let request = config.request();
        assert_eq!(request.name, "rhel9");
        assert_eq!(
            request.properties.to_tokens(),
            vec!["channel=prod", "release=stable"]
        );
    }

    #[test]
    fn test_configure_requires_name() {
        let mut source = SourceImage::new();
        let err = source.configure(json!({}), &env()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("artifact_name"));
    }

    #[tokio::test]
    async fn test_execute_resolves_latest_in_channel() {
        let store = MemoryStore::new(API);
        store.add_artifact_with(
            "images/rhel9-a.vmxt",
            "2024-01-01T00:00:00Z",
            [("channel", "prod")].into_iter().collect(),
            Vec::new(),
        );
        store.add_artifact_with(
            "images/rhel9-b.vmxt",
            "2024-05-01T00:00:00Z",
            [("channel", "prod")].into_iter().collect(),
            Vec::new(),
        );
        store.add_artifact_with(
            "images/rhel9-c.vmxt",
            "2024-09-01T00:00:00Z",
            [("channel", "dev")].into_iter().collect(),
            Vec::new(),
        );

        let mut source = SourceImage::new();
        source
            .configure(json!({"artifact_name": "rhel9", "channel": "prod"}), &env())
            .unwrap();

        let ctx = ExecutionContext::new(Arc::new(store));
        let output = source.execute(&ctx).await.unwrap();
        match output {
            ComponentOutput::Artifact(artifact) => {
                assert_eq!(artifact.name, "rhel9-b");
                assert_eq!(artifact.created, "2024-05-01T00:00:00Z");
                assert_eq!(
                    artifact.artifact_uri,
                    "http://mem/artifactory/api/storage/images/rhel9-b.vmxt"
                );
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
