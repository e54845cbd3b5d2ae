//! `upload` post-processor: push a built VM image and its companion files

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{Environment, ServerConfig};
use artif_core::{
    transfer, ArtifError, Component, ComponentKind, ComponentOutput, ExecutionContext, Result,
    TransferReport, UploadRequest,
};
use artif_types::{server, ArtifactRef, ImageType, ValidationError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUploadConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Local directory holding the image files
    #[serde(default)]
    pub source_path: String,
    /// Repository folder, e.g. `/images/win22/`
    #[serde(default)]
    pub target_path: String,
    /// URI of an existing artifact whose folder becomes the target
    #[serde(default)]
    pub existing_uri_target: String,
    #[serde(default)]
    pub file_suffix: String,
    #[serde(default)]
    pub image_type: String,
    #[serde(default)]
    pub image_name: String,
}

#[derive(Default)]
pub struct ImageUpload {
    config: ImageUploadConfig,
    image_type: Option<ImageType>,
}

impl ImageUpload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository folder the files land in
    fn target_folder(&self, server_api: &str) -> Result<String> {
        if !self.config.target_path.trim().is_empty() {
            return Ok(server::normalize_repo_path(&self.config.target_path));
        }

        let existing = server::to_storage_uri(server_api, &self.config.existing_uri_target);
        Ok(ArtifactRef::from_uri(&existing)?.folder_path())
    }
}

/// The primary `<image_name>.<type>` file followed by its companions, sorted
async fn image_files(dir: &Path, image_name: &str, image_type: ImageType) -> Result<Vec<PathBuf>> {
    let prefix = image_name.to_lowercase();
    let mut primary = None;
    let mut companions = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_lowercase) else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if name == format!("{}.{}", prefix, image_type.as_str()) {
            primary = Some(path);
        } else if name.starts_with(&prefix)
            && image_type.companion_extensions().contains(&ext.as_str())
        {
            companions.push(path);
        }
    }

    let primary = primary.ok_or_else(|| {
        ArtifError::NotFound(format!(
            "{}.{} does not exist in {}",
            image_name,
            image_type,
            dir.display()
        ))
    })?;

    companions.sort();
    let mut files = vec![primary];
    files.extend(companions);
    Ok(files)
}

#[async_trait]
impl Component for ImageUpload {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::PostProcessor
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: ImageUploadConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);

        let mut validation = config
            .server
            .validate()
            .require("source_path", &config.source_path)
            .require("image_name", &config.image_name)
            .require("image_type", &config.image_type);

        if config.target_path.trim().is_empty() && config.existing_uri_target.trim().is_empty() {
            validation = validation.with_error(ValidationError {
                field: "target_path".to_string(),
                message: "either target_path or existing_uri_target must be set".to_string(),
                code: "REQUIRED".to_string(),
            });
        } else if !config.target_path.trim().is_empty()
            && !config.existing_uri_target.trim().is_empty()
        {
            warn!("Both target_path and existing_uri_target are set; using target_path");
        }

        self.image_type = None;
        if !config.image_type.trim().is_empty() {
            match config.image_type.parse::<ImageType>() {
                Ok(image_type) => self.image_type = Some(image_type),
                Err(e) => {
                    validation = validation.with_error(ValidationError {
                        field: "image_type".to_string(),
                        message: e.to_string(),
                        code: "INVALID".to_string(),
                    })
                }
            }
        }

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    /// Stops at the first failed upload
    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        let image_type = self.image_type.ok_or_else(|| {
            ArtifError::InvalidArgument("upload: image_type is not configured".to_string())
        })?;
        let target = self.target_folder(ctx.store.server_api())?;
        let files = image_files(
            Path::new(&self.config.source_path),
            &self.config.image_name,
            image_type,
        )
        .await?;
        info!("Uploading {} file(s) to {}", files.len(), target);

        let mut report = TransferReport::default();
        for file in files {
            ctx.check_cancelled()?;
            let mut request = UploadRequest::new(file, target.clone());
            if !self.config.file_suffix.trim().is_empty() {
                request = request.with_suffix(self.config.file_suffix.trim());
            }
            let metadata = transfer::upload(ctx.store.as_ref(), &request).await?;
            report.succeeded.push(metadata.download_uri);
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

    fn env() -> Environment {
        Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", API)
    }

    fn image_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["rhel9.ovf", "rhel9-disk1.vmdk", "rhel9.mf", "rhel9.log", "other.vmdk"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_uploads_image_with_companions() {
        let store = Arc::new(MemoryStore::new(API));
        store.add_repository("images");
        let dir = image_dir();

        let mut upload = ImageUpload::new();
        upload
            .configure(
                json!({
                    "source_path": dir.path().to_string_lossy(),
                    "target_path": "images/rhel9",
                    "image_type": "ovf",
                    "image_name": "rhel9",
                    "file_suffix": "b42"
                }),
                &env(),
            )
            .unwrap();

        let output = upload.execute(&ExecutionContext::new(store.clone())).await.unwrap();
        let ComponentOutput::Transfers(report) = output else {
            panic!("expected a transfer report");
        };

        assert_eq!(
            report.succeeded,
            vec![
                "http://mem/artifactory/images/rhel9/rhel9-b42.ovf",
                "http://mem/artifactory/images/rhel9/rhel9-disk1-b42.vmdk",
                "http://mem/artifactory/images/rhel9/rhel9-b42.mf",
            ]
        );
        assert_eq!(
            store.content("images/rhel9/rhel9-b42.ovf"),
            Some(b"rhel9.ovf".to_vec())
        );
        assert!(store.content("images/rhel9/rhel9-b42.log").is_none());
    }

    #[tokio::test]
    async fn test_target_from_existing_artifact() {
        let store = Arc::new(MemoryStore::new(API));
        store.add_repository("images");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("win22.ova"), b"ova").unwrap();

        let mut upload = ImageUpload::new();
        upload
            .configure(
                json!({
                    "source_path": dir.path().to_string_lossy(),
                    "existing_uri_target": "http://mem/artifactory/images/win22/base/win22-old.ova",
                    "image_type": "ova",
                    "image_name": "win22"
                }),
                &env(),
            )
            .unwrap();

        upload.execute(&ExecutionContext::new(store.clone())).await.unwrap();
        assert!(store.content("images/win22/base/win22.ova").is_some());
    }

    #[tokio::test]
    async fn test_missing_primary_file() {
        let store = Arc::new(MemoryStore::new(API));
        store.add_repository("images");
        let dir = image_dir();

        let mut upload = ImageUpload::new();
        upload
            .configure(
                json!({
                    "source_path": dir.path().to_string_lossy(),
                    "target_path": "/images/",
                    "image_type": "vmtx",
                    "image_name": "rhel9"
                }),
                &env(),
            )
            .unwrap();

        let err = upload.execute(&ExecutionContext::new(store)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_configure_rejects_bad_input() {
        let err = ImageUpload::new()
            .configure(
                json!({"source_path": "/out", "image_type": "iso", "image_name": "x"}),
                &env(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let message = err.to_string();
        assert!(message.contains("image_type"));
        assert!(message.contains("target_path"));
    }
}
