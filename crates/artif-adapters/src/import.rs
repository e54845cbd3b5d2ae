//! `import` data source: bring an image into the virtualization platform
//!
//! Download (unless `import_no_download`), convert, register, and mark the
//! registered VM as a template. The platform side sits behind
//! `VirtualizationPlatform`.

use artif_core::component::{decode_config, finish_validation};
use artif_core::config::{vars, Environment, ServerConfig};
use artif_core::{
    transfer, Component, ComponentKind, ComponentOutput, ExecutionContext, ImportReport, Result,
};
use artif_types::ValidationResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Connection and placement for the virtualization platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VCenterConfig {
    #[serde(default)]
    pub vcenter_server: String,
    #[serde(default)]
    pub vcenter_user: String,
    #[serde(default, skip_serializing)]
    pub vcenter_password: String,
    #[serde(default)]
    pub vcenter_datacenter: String,
    #[serde(default)]
    pub vcenter_datastore: String,
    #[serde(default)]
    pub vcenter_cluster: String,
    #[serde(default)]
    pub vcenter_folder: String,
    #[serde(default)]
    pub vcenter_resource_pool: String,
}

impl VCenterConfig {
    pub fn with_env(mut self, env: &Environment) -> Self {
        self.vcenter_server = env.or_env(&self.vcenter_server, &[vars::VCENTER_SERVER]);
        self.vcenter_user = env.or_env(&self.vcenter_user, &[vars::VCENTER_USER]);
        self.vcenter_password = env.or_env(&self.vcenter_password, &[vars::VCENTER_PASSWORD]);
        self.vcenter_datacenter =
            env.or_env(&self.vcenter_datacenter, &[vars::VCENTER_DATACENTER]);
        self.vcenter_datastore = env.or_env(&self.vcenter_datastore, &[vars::VCENTER_DATASTORE]);
        self.vcenter_cluster = env.or_env(&self.vcenter_cluster, &[vars::VCENTER_CLUSTER]);
        self.vcenter_folder = env.or_env(&self.vcenter_folder, &[vars::VCENTER_FOLDER]);
        self.vcenter_resource_pool =
            env.or_env(&self.vcenter_resource_pool, &[vars::VCENTER_RESOURCE_POOL]);
        self
    }

    pub fn validate(&self, result: ValidationResult) -> ValidationResult {
        result
            .require("vcenter_server", &self.vcenter_server)
            .require("vcenter_user", &self.vcenter_user)
            .require("vcenter_password", &self.vcenter_password)
            .require("vcenter_datacenter", &self.vcenter_datacenter)
            .require("vcenter_datastore", &self.vcenter_datastore)
            .recommend("vcenter_cluster", &self.vcenter_cluster, "the default cluster is used")
            .recommend("vcenter_folder", &self.vcenter_folder, "the datacenter VM folder is used")
            .recommend(
                "vcenter_resource_pool",
                &self.vcenter_resource_pool,
                "the cluster's root pool is used",
            )
    }
}

/// Where a registered VM lands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub folder: Option<String>,
    pub resource_pool: Option<String>,
}

/// Operations the import sequences on the virtualization platform
#[async_trait]
pub trait VirtualizationPlatform: Send + Sync {
    /// Resolve the configured folder and resource pool
    async fn placement(&self, vcenter: &VCenterConfig) -> Result<Placement>;

    /// Turn `image` into a registrable VM under `target_dir`, returning the VM descriptor
    async fn convert(&self, image: &Path, target_dir: &Path) -> Result<PathBuf>;

    async fn register(
        &self,
        vcenter: &VCenterConfig,
        vm: &Path,
        image_name: &str,
        placement: &Placement,
    ) -> Result<()>;

    async fn mark_as_template(&self, vcenter: &VCenterConfig, image_name: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(flatten)]
    pub vcenter: VCenterConfig,
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub download_uri: String,
    /// Import an image already on disk at `source_path`
    #[serde(default)]
    pub import_no_download: bool,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub target_path: String,
}

pub struct ArtifactImport {
    platform: Arc<dyn VirtualizationPlatform>,
    config: ImportConfig,
}

impl ArtifactImport {
    pub fn new(platform: Arc<dyn VirtualizationPlatform>) -> Self {
        Self {
            platform,
            config: ImportConfig::default(),
        }
    }

    /// Local image and conversion target, downloading first when configured
    async fn stage_image(&self, ctx: &ExecutionContext) -> Result<(PathBuf, PathBuf, Option<PathBuf>)> {
        if self.config.import_no_download {
            return Ok((
                PathBuf::from(&self.config.source_path),
                PathBuf::from(&self.config.target_path),
                None,
            ));
        }

        let output_dir = PathBuf::from(&self.config.output_dir);
        let image = transfer::download(ctx.store.as_ref(), &self.config.download_uri, &output_dir)
            .await?;
        info!("Image downloaded to {}", image.display());
        Ok((image.clone(), output_dir, Some(image)))
    }
}

fn image_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Component for ArtifactImport {
    fn name(&self) -> &'static str {
        "import"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::DataSource
    }

    fn configure(&mut self, raw: serde_json::Value, env: &Environment) -> Result<()> {
        let mut config: ImportConfig = decode_config(self.name(), raw)?;
        config.server = config.server.with_env(env);
        config.vcenter = config.vcenter.with_env(env);
        config.output_dir = env.or_env(&config.output_dir, vars::OUTPUT_DIR);

        let mut validation = config.vcenter.validate(ValidationResult::ok());
        if config.import_no_download {
            validation = validation
                .require("source_path", &config.source_path)
                .require("target_path", &config.target_path);
        } else {
            validation = validation
                .merge(config.server.validate())
                .require("output_dir", &config.output_dir)
                .require("download_uri", &config.download_uri);
        }

        self.config = config;
        finish_validation(self.name(), validation)
    }

    fn server(&self) -> &ServerConfig {
        &self.config.server
    }

    fn needs_store(&self) -> bool {
        !self.config.import_no_download
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<ComponentOutput> {
        let vcenter = &self.config.vcenter;

        let placement = match self.platform.placement(vcenter).await {
            Ok(placement) => placement,
            Err(e) => {
                warn!("Could not resolve VM placement, using defaults: {}", e);
                Placement::default()
            }
        };

        ctx.check_cancelled()?;
        let (image, target_dir, downloaded) = self.stage_image(ctx).await?;
        let name = image_name(&image);

        ctx.check_cancelled()?;
        info!("Converting {}", image.display());
        let converted = self.platform.convert(&image, &target_dir).await?;

        ctx.check_cancelled()?;
        info!("Registering {} as {}", converted.display(), name);
        self.platform
            .register(vcenter, &converted, &name, &placement)
            .await?;

        self.platform.mark_as_template(vcenter, &name).await?;
        info!("{} imported and marked as a template", name);

        Ok(ComponentOutput::Imported(ImportReport {
            image_name: name,
            downloaded,
            converted,
            template: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artif_core::{ArtifError, ErrorKind, MemoryStore};
    use serde_json::json;
    use std::sync::Mutex;

    const API: &str = "http://mem/artifactory/api";

    #[derive(Default)]
    struct RecordingPlatform {
        steps: Mutex<Vec<String>>,
        fail_register: bool,
    }

    impl RecordingPlatform {
        fn record(&self, step: String) {
            self.steps.lock().unwrap().push(step);
        }

        fn steps(&self) -> Vec<String> {
            self.steps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VirtualizationPlatform for RecordingPlatform {
        async fn placement(&self, vcenter: &VCenterConfig) -> Result<Placement> {
            self.record(format!("placement {}", vcenter.vcenter_folder));
            Ok(Placement {
                folder: Some(vcenter.vcenter_folder.clone()),
                resource_pool: None,
            })
        }

        async fn convert(&self, image: &Path, target_dir: &Path) -> Result<PathBuf> {
            self.record(format!("convert {}", image.file_name().unwrap().to_string_lossy()));
            Ok(target_dir.join("vm.vmx"))
        }

        async fn register(
            &self,
            _vcenter: &VCenterConfig,
            _vm: &Path,
            image_name: &str,
            _placement: &Placement,
        ) -> Result<()> {
            self.record(format!("register {}", image_name));
            if self.fail_register {
                return Err(ArtifError::unavailable("register refused"));
            }
            Ok(())
        }

        async fn mark_as_template(&self, _vcenter: &VCenterConfig, image_name: &str) -> Result<()> {
            self.record(format!("template {}", image_name));
            Ok(())
        }
    }

    fn env() -> Environment {
        Environment::empty()
            .with("ARTIFACTORY_TOKEN", "t")
            .with("ARTIFACTORY_SERVER", API)
            .with("VCENTER_SERVER", "vc.local")
            .with("VCENTER_USER", "admin")
            .with("VCENTER_PASSWORD", "secret")
            .with("VCENTER_DATACENTER", "dc1")
            .with("VCENTER_DATASTORE", "ds1")
            .with("VCENTER_FOLDER", "templates")
    }

    #[tokio::test]
    async fn test_download_then_convert_register_template() {
        let store = MemoryStore::new(API);
        store.add_artifact_with(
            "images/win22.ova",
            "2024-01-01T00:00:00Z",
            Default::default(),
            b"ova".to_vec(),
        );
        let dir = tempfile::tempdir().unwrap();

        let platform = Arc::new(RecordingPlatform::default());
        let mut import = ArtifactImport::new(platform.clone());
        import
            .configure(
                json!({
                    "output_dir": dir.path().to_string_lossy(),
                    "download_uri": "http://mem/artifactory/images/win22.ova"
                }),
                &env(),
            )
            .unwrap();

        let output = import
            .execute(&ExecutionContext::new(Arc::new(store)))
            .await
            .unwrap();

        assert_eq!(
            platform.steps(),
            vec![
                "placement templates",
                "convert win22.ova",
                "register win22",
                "template win22"
            ]
        );
        let ComponentOutput::Imported(report) = output else {
            panic!("expected an import report");
        };
        assert_eq!(report.image_name, "win22");
        assert_eq!(report.downloaded, Some(dir.path().join("win22.ova")));
        assert!(report.template);
    }

    #[tokio::test]
    async fn test_no_download_uses_local_image() {
        let platform = Arc::new(RecordingPlatform::default());
        let mut import = ArtifactImport::new(platform.clone());
        import
            .configure(
                json!({
                    "import_no_download": true,
                    "source_path": "/data/images/rhel9.ovf",
                    "target_path": "/data/vms"
                }),
                &Environment::empty()
                    .with("VCENTER_SERVER", "vc.local")
                    .with("VCENTER_USER", "admin")
                    .with("VCENTER_PASSWORD", "secret")
                    .with("VCENTER_DATACENTER", "dc1")
                    .with("VCENTER_DATASTORE", "ds1"),
            )
            .unwrap();

        assert!(!import.needs_store());
        let output = import.execute(&ExecutionContext::offline()).await.unwrap();

        let ComponentOutput::Imported(report) = output else {
            panic!("expected an import report");
        };
        assert_eq!(report.downloaded, None);
        assert_eq!(report.converted, PathBuf::from("/data/vms/vm.vmx"));
        assert_eq!(platform.steps()[1], "convert rhel9.ovf");
    }

    #[tokio::test]
    async fn test_failed_register_stops_before_template() {
        let platform = Arc::new(RecordingPlatform {
            fail_register: true,
            ..Default::default()
        });
        let mut import = ArtifactImport::new(platform.clone());
        import
            .configure(
                json!({
                    "import_no_download": true,
                    "source_path": "/data/images/rhel9.ovf",
                    "target_path": "/data/vms"
                }),
                &env(),
            )
            .unwrap();

        let err = import
            .execute(&ExecutionContext::new(Arc::new(MemoryStore::new(API))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(!platform.steps().iter().any(|s| s.starts_with("template")));
    }

    #[test]
    fn test_configure_requires_vcenter_fields() {
        let mut import = ArtifactImport::new(Arc::new(RecordingPlatform::default()));
        let err = import
            .configure(
                json!({"import_no_download": true, "source_path": "a.ova", "target_path": "b"}),
                &Environment::empty(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("vcenter_password"));
    }
}
