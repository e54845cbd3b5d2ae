//! `update-props` post-processor

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{Environment, ServerConfig};
use artif_core::{properties, Component, ComponentKind, ComponentOutput, ExecutionContext, Result};
use artif_types::{server, ArtifactRef, Properties, ValidationError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropsConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Storage URI or download URI of the artifact to tag
    #[serde(default)]
    pub artifact_uri: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct UpdateProps {
    config: UpdatePropsConfig,
}

impl UpdateProps {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for UpdateProps {
    fn name(&self) -> &'static str {
        "update-props"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::PostProcessor
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: UpdatePropsConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);

        let mut validation = config
            .server
            .validate()
            .require("artifact_uri", &config.artifact_uri);
        if config.properties.is_empty() {
            validation = validation.with_error(ValidationError::required("properties"));
        }

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        ctx.check_cancelled()?;

        let artifact = ArtifactRef::from_uri(&server::to_storage_uri(
            ctx.store.server_api(),
            &self.config.artifact_uri,
        ))?;

        let props: Properties = self.config.properties.clone().into_iter().collect();
        properties::set_properties(ctx.store.as_ref(), &artifact, &props).await?;

        Ok(ComponentOutput::PropertiesUpdated {
            artifact_uri: artifact.uri,
            properties: props,
        })
    }
}
