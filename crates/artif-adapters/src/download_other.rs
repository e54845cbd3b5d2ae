//! `download-other` data source: fetch a list of files from one folder

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{vars, Environment, ServerConfig};
use artif_core::{
    transfer, Component, ComponentKind, ComponentOutput, ExecutionContext, Result, TransferFailure,
    TransferReport,
};
use artif_types::ValidationError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadOtherConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output_dir: String,
    /// Repository folder, e.g. `/isos/tools/`
    #[serde(default)]
    pub artifactory_path: String,
    #[serde(default)]
    pub file_list: Vec<String>,
}

#[derive(Default)]
pub struct DownloadOther {
    config: DownloadOtherConfig,
}

impl DownloadOther {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Component for DownloadOther {
    fn name(&self) -> &'static str {
        "download-other"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::DataSource
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: DownloadOtherConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);
        config.output_dir = env.or_env(&config.output_dir, vars::OUTPUT_DIR);
        config.file_list.retain(|f| !f.trim().is_empty());

        let mut validation = config
            .server
            .validate()
            .require("output_dir", &config.output_dir)
            .require("artifactory_path", &config.artifactory_path);
        if config.file_list.is_empty() {
            validation = validation.with_error(ValidationError::required("file_list"));
        }

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    /// Failed files are logged and listed; the run itself succeeds
    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        let output_dir = Path::new(&self.config.output_dir);
        let mut report = TransferReport::default();

        for file in &self.config.file_list {
            ctx.check_cancelled()?;
            info!("Downloading {}", file);
            match transfer::download_from_path(
                ctx.store.as_ref(),
                &self.config.artifactory_path,
                file,
                output_dir,
            )
            .await
            {
                Ok(path) => report.succeeded.push(path.display().to_string()),
                Err(e) => {
                    warn!("Download of {} failed: {}", file, e);
                    report.failed.push(TransferFailure {
                        file: file.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.is_complete() {
            warn!("{} of {} downloads failed", report.failed.len(), self.config.file_list.len());
        }
        Ok(ComponentOutput::Transfers(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artif_core::{ErrorKind, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    const API: &str = "http://mem/artifactory/api";

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let store = MemoryStore::new(API);
        store.add_artifact_with(
            "isos/tools/drivers.iso",
            "2024-01-01T00:00:00Z",
            Default::default(),
            b"drivers".to_vec(),
        );

        let dir = tempfile::tempdir().unwrap();
        let env = Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", API)
            .with("OUTPUTDIR", dir.path().to_string_lossy().to_string());

        let mut component = DownloadOther::new();
        component
            .configure(
                json!({
                    "artifactory_path": "/isos/tools/",
                    "file_list": ["drivers.iso", "missing.iso", ""]
                }),
                &env,
            )
            .unwrap();

        let ctx = ExecutionContext::new(Arc::new(store));
        let output = component.execute(&ctx).await.unwrap();
        let ComponentOutput::Transfers(report) = output else {
            panic!("expected a transfer report");
        };

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file, "missing.iso");
        assert_eq!(
            std::fs::read(dir.path().join("drivers.iso")).unwrap(),
            b"drivers"
        );
    }

    #[test]
    fn test_requires_file_list() {
        let env = Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", API);
        let err = DownloadOther::new()
            .configure(json!({"output_dir": "/tmp", "artifactory_path": "/isos"}), &env)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("file_list"));
    }
}
