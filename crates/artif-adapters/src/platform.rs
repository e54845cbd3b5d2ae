//! `VirtualizationPlatform` driven by the `ovftool` and `govc` command-line tools

use crate::import::{Placement, VCenterConfig, VirtualizationPlatform};
use artif_core::{ArtifError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

pub struct GovcPlatform {
    govc: PathBuf,
    ovftool: PathBuf,
}

impl Default for GovcPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl GovcPlatform {
    /// Use `govc` and `ovftool` from `PATH`
    pub fn new() -> Self {
        Self {
            govc: PathBuf::from("govc"),
            ovftool: PathBuf::from("ovftool"),
        }
    }

    pub fn with_tools(govc: impl Into<PathBuf>, ovftool: impl Into<PathBuf>) -> Self {
        Self {
            govc: govc.into(),
            ovftool: ovftool.into(),
        }
    }

    fn govc(&self, vcenter: &VCenterConfig) -> Command {
        let mut cmd = Command::new(&self.govc);
        cmd.env("GOVC_URL", &vcenter.vcenter_server)
            .env("GOVC_USERNAME", &vcenter.vcenter_user)
            .env("GOVC_PASSWORD", &vcenter.vcenter_password)
            .env("GOVC_DATACENTER", &vcenter.vcenter_datacenter)
            .env("GOVC_INSECURE", "1");
        cmd
    }
}

/// Run `cmd`, returning stdout or an `Unavailable` error carrying stderr
async fn run(mut cmd: Command, what: &str) -> Result<String> {
    debug!("Running {:?}", cmd.as_std());
    let output = cmd.output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArtifError::unavailable(format!(
            "{} failed: {}",
            what,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Inventory path of the VM folder
fn folder_path(vcenter: &VCenterConfig) -> Option<String> {
    let folder = vcenter.vcenter_folder.trim().trim_matches('/');
    (!folder.is_empty()).then(|| format!("/{}/vm/{}", vcenter.vcenter_datacenter, folder))
}

/// Inventory path of the resource pool
fn pool_path(vcenter: &VCenterConfig) -> Option<String> {
    let pool = vcenter.vcenter_resource_pool.trim().trim_matches('/');
    let cluster = vcenter.vcenter_cluster.trim();
    if pool.is_empty() || cluster.is_empty() {
        return None;
    }
    Some(format!(
        "/{}/host/{}/Resources/{}",
        vcenter.vcenter_datacenter, cluster, pool
    ))
}

/// `<target>/<name>/<name>.vmx` for an image named `<name>.<ext>`
fn vmx_target(image: &Path, target_dir: &Path) -> Result<PathBuf> {
    let name = image
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ArtifError::InvalidArgument(format!("{} has no image name", image.display()))
        })?;
    Ok(target_dir.join(name).join(format!("{}.vmx", name)))
}

#[async_trait]
impl VirtualizationPlatform for GovcPlatform {
    async fn placement(&self, vcenter: &VCenterConfig) -> Result<Placement> {
        let placement = Placement {
            folder: folder_path(vcenter),
            resource_pool: pool_path(vcenter),
        };

        for path in placement.folder.iter().chain(placement.resource_pool.iter()) {
            let mut cmd = self.govc(vcenter);
            cmd.arg("ls").arg(path);
            let listed = run(cmd, "govc ls").await?;
            if listed.trim().is_empty() {
                return Err(ArtifError::NotFound(format!("{} does not exist", path)));
            }
        }

        Ok(placement)
    }

    async fn convert(&self, image: &Path, target_dir: &Path) -> Result<PathBuf> {
        let ext = image
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "vmx" => Ok(image.to_path_buf()),
            "ova" | "ovf" => {
                let vmx = vmx_target(image, target_dir)?;
                if let Some(parent) = vmx.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let mut cmd = Command::new(&self.ovftool);
                cmd.arg("--acceptAllEulas")
                    .arg("--overwrite")
                    .arg(image)
                    .arg(&vmx);
                run(cmd, "ovftool").await?;
                Ok(vmx)
            }
            other => Err(ArtifError::InvalidArgument(format!(
                "cannot convert '{}' images, expected ova, ovf or vmx",
                other
            ))),
        }
    }

    async fn register(
        &self,
        vcenter: &VCenterConfig,
        vm: &Path,
        image_name: &str,
        placement: &Placement,
    ) -> Result<()> {
        let vm_dir = vm.parent().unwrap_or(Path::new("."));
        let vmx_name = vm
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArtifError::InvalidArgument(format!("{} is not a file", vm.display())))?;

        // Copy the VM directory to the datastore, then register its descriptor
        let mut entries = tokio::fs::read_dir(vm_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let remote = format!("{}/{}", image_name, entry.file_name().to_string_lossy());
            let mut cmd = self.govc(vcenter);
            cmd.arg("datastore.upload")
                .arg("-ds")
                .arg(&vcenter.vcenter_datastore)
                .arg(entry.path())
                .arg(&remote);
            run(cmd, "govc datastore.upload").await?;
        }

        let mut cmd = self.govc(vcenter);
        cmd.arg("vm.register")
            .arg("-ds")
            .arg(&vcenter.vcenter_datastore)
            .arg("-name")
            .arg(image_name);
        if let Some(folder) = &placement.folder {
            cmd.arg("-folder").arg(folder);
        }
        if let Some(pool) = &placement.resource_pool {
            cmd.arg("-pool").arg(pool);
        }
        cmd.arg(format!("{}/{}", image_name, vmx_name));
        run(cmd, "govc vm.register").await?;

        Ok(())
    }

    async fn mark_as_template(&self, vcenter: &VCenterConfig, image_name: &str) -> Result<()> {
        let mut cmd = self.govc(vcenter);
        cmd.arg("vm.markastemplate").arg(image_name);
        run(cmd, "govc vm.markastemplate").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artif_core::ErrorKind;

    fn vcenter() -> VCenterConfig {
        VCenterConfig {
            vcenter_datacenter: "dc1".to_string(),
            vcenter_cluster: "c1".to_string(),
            vcenter_folder: "/templates/".to_string(),
            vcenter_resource_pool: "builds".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_inventory_paths() {
        let vc = vcenter();
        assert_eq!(folder_path(&vc).as_deref(), Some("/dc1/vm/templates"));
        assert_eq!(
            pool_path(&vc).as_deref(),
            Some("/dc1/host/c1/Resources/builds")
        );

        let bare = VCenterConfig {
            vcenter_datacenter: "dc1".to_string(),
            vcenter_resource_pool: "builds".to_string(),
            ..Default::default()
        };
        assert_eq!(folder_path(&bare), None);
        assert_eq!(pool_path(&bare), None);
    }

    #[test]
    fn test_vmx_target() {
        assert_eq!(
            vmx_target(Path::new("/dl/win22.ova"), Path::new("/vms")).unwrap(),
            PathBuf::from("/vms/win22/win22.vmx")
        );
    }

    #[tokio::test]
    async fn test_convert_passes_vmx_through_and_rejects_unknown() {
        let platform = GovcPlatform::new();
        let vmx = Path::new("/vms/a/a.vmx");
        assert_eq!(platform.convert(vmx, Path::new("/vms")).await.unwrap(), vmx);

        let err = platform
            .convert(Path::new("/dl/a.iso"), Path::new("/vms"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_missing_tool_is_io_error() {
        let platform = GovcPlatform::with_tools("/nonexistent/govc", "/nonexistent/ovftool");
        let err = platform.mark_as_template(&vcenter(), "win22").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
