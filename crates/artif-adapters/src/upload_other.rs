//! `upload-other` post-processor: push arbitrary files into one folder

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{Environment, ServerConfig};
use artif_core::{
    transfer, Component, ComponentKind, ComponentOutput, ExecutionContext, Result, TransferReport,
    UploadRequest,
};
use artif_types::ValidationError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadOtherConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Local directory holding the files
    #[serde(default)]
    pub source_path: String,
    /// Repository folder, e.g. `/isos/tools/`
    #[serde(default)]
    pub artifactory_path: String,
    /// Optional subfolder created under `artifactory_path`
    #[serde(default)]
    pub folder_name: String,
    #[serde(default)]
    pub file_list: Vec<String>,
}

impl UploadOtherConfig {
    pub fn target_path(&self) -> String {
        let base = self.artifactory_path.trim().trim_end_matches('/');
        let folder = self.folder_name.trim().trim_matches('/');
        if folder.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, folder)
        }
    }
}

#[derive(Default)]
pub struct UploadOther {
    config: UploadOtherConfig,
}

impl UploadOther {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for UploadOther {
    fn name(&self) -> &'static str {
        "upload-other"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::PostProcessor
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: UploadOtherConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);
        config.file_list.retain(|f| !f.trim().is_empty());

        let mut validation = config
            .server
            .validate()
            .require("source_path", &config.source_path)
            .require("artifactory_path", &config.artifactory_path)
            .recommend(
                "folder_name",
                &config.folder_name,
                "files go directly into artifactory_path",
            );
        if config.file_list.is_empty() {
            validation = validation.with_error(ValidationError::required("file_list"));
        }

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    /// Stops at the first failed upload
    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        let source_dir = Path::new(&self.config.source_path);
        let target = self.config.target_path();
        let mut report = TransferReport::default();

        for file in &self.config.file_list {
            ctx.check_cancelled()?;
            info!("Uploading {} to {}", file, target);
            let request = UploadRequest::new(source_dir.join(file.trim()), target.clone());
            match transfer::upload(ctx.store.as_ref(), &request).await {
                Ok(metadata) => report.succeeded.push(metadata.download_uri),
                Err(e) => {
                    error!("Error uploading {}: {}", file, e);
                    return Err(e);
                }
            }
        }

        Ok(ComponentOutput::Transfers(report))
    }
}
