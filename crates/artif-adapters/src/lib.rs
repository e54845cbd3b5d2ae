//! Plugin components for the artifact plugin
//!
//! Data sources resolve or fetch artifacts before a build; post-processors
//! publish and tag what the build produced.

mod download_other;
mod import;
mod platform;
mod source_image;
mod update_props;
mod upload;
mod upload_other;

pub use download_other::{DownloadOther, DownloadOtherConfig};
pub use import::{ArtifactImport, ImportConfig, Placement, VCenterConfig, VirtualizationPlatform};
pub use platform::GovcPlatform;
pub use source_image::{SourceImage, SourceImageConfig};
pub use update_props::{UpdateProps, UpdatePropsConfig};
pub use upload::{ImageUpload, ImageUploadConfig};
pub use upload_other::{UploadOther, UploadOtherConfig};

use artif_core::ComponentRegistry;
use std::sync::Arc;

/// Name of the component used when the host names none
pub const DEFAULT_COMPONENT: &str = "source-image";

/// Create a registry with every component registered
pub fn create_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(|| Box::new(SourceImage::new()));
    registry.register(|| Box::new(DownloadOther::new()));
    registry.register(|| Box::new(ArtifactImport::new(Arc::new(GovcPlatform::new()))));
    registry.register(|| Box::new(ImageUpload::new()));
    registry.register(|| Box::new(UpdateProps::new()));
    registry.register(|| Box::new(UploadOther::new()));
    registry.set_default(DEFAULT_COMPONENT);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use artif_core::ComponentKind;

    #[test]
    fn test_registry_contents() {
        let registry = create_registry();
        assert_eq!(
            registry.list(),
            vec![
                ("download-other", ComponentKind::DataSource),
                ("import", ComponentKind::DataSource),
                ("source-image", ComponentKind::DataSource),
                ("update-props", ComponentKind::PostProcessor),
                ("upload", ComponentKind::PostProcessor),
                ("upload-other", ComponentKind::PostProcessor),
            ]
        );
        assert_eq!(
            registry.create_default().map(|c| c.name()),
            Some("source-image")
        );
    }
}
