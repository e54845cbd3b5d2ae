//! Artifact downloads and uploads

use crate::error::{ArtifError, Result};
use crate::store::ArtifactStore;
use artif_types::{server, ArtifactMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Download `download_uri` into `output_dir`, named after the URI's last segment
///
/// An existing file with that name is overwritten. A blank `output_dir`
/// means the current directory.
pub async fn download(
    store: &dyn ArtifactStore,
    download_uri: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let download_uri = download_uri.trim();
    if download_uri.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "a download URI is required".to_string(),
        ));
    }
    let file_name = server::file_name_from_uri(download_uri).ok_or_else(|| {
        ArtifError::InvalidArgument(format!("{} does not name a file", download_uri))
    })?;

    let output_dir = if output_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        output_dir
    };
    tokio::fs::create_dir_all(output_dir).await?;

    let dest = output_dir.join(file_name);
    info!("Downloading {} to {}", download_uri, dest.display());
    let bytes = store.download(download_uri, &dest).await?;
    debug!("Wrote {} bytes", bytes);

    Ok(dest)
}

/// Download `file` from the repository folder `repo_path`
pub async fn download_from_path(
    store: &dyn ArtifactStore,
    repo_path: &str,
    file: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let file = file.trim();
    if file.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "a file name is required".to_string(),
        ));
    }

    let uri = server::content_uri(store.server_api(), repo_path, file);
    download(store, &uri, output_dir).await
}

/// File to push into a repository folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source_path: PathBuf,
    /// Repository folder, e.g. `/images/win22/`
    pub target_path: String,
    /// Inserted before the extension as `name-suffix.ext`
    pub file_suffix: Option<String>,
}

impl UploadRequest {
    pub fn new(source_path: impl Into<PathBuf>, target_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: target_path.into(),
            file_suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = Some(suffix.into());
        self
    }
}

/// Upload a file, returning the metadata of the new artifact
pub async fn upload(store: &dyn ArtifactStore, request: &UploadRequest) -> Result<ArtifactMetadata> {
    let target = request.target_path.trim().trim_matches('/');
    if target.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "a target repository path is required".to_string(),
        ));
    }

    let source = locate_source(&request.source_path).await?;
    let on_disk = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ArtifError::InvalidArgument(format!("{} has no file name", source.display()))
        })?;

    let file_name = match request.file_suffix.as_deref().map(str::trim) {
        Some(suffix) if !suffix.is_empty() => insert_suffix(on_disk, suffix),
        _ => on_disk.to_string(),
    };

    let target_uri = server::content_uri(store.server_api(), target, &file_name);
    info!("Uploading {} to {}", source.display(), target_uri);

    let metadata = store.upload(&source, &target_uri).await?;
    if metadata.download_uri.trim().is_empty() {
        return Err(ArtifError::unavailable(format!(
            "upload of {} returned no download URI",
            file_name
        )));
    }

    Ok(metadata)
}

/// Remove an artifact, given its download URI or its storage URI
pub async fn delete_artifact(store: &dyn ArtifactStore, uri: &str) -> Result<()> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "an artifact URI is required".to_string(),
        ));
    }

    let download_uri = server::to_content_uri(uri);
    store.delete_artifact(&download_uri).await?;
    info!("Deleted {}", download_uri);
    Ok(())
}

/// `name.ext` becomes `name-suffix.ext`
pub fn insert_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{}-{}{}", &file_name[..idx], suffix, &file_name[idx..]),
        _ => format!("{}-{}", file_name, suffix),
    }
}

/// Find the source file, matching its name without regard to case
async fn locate_source(path: &Path) -> Result<PathBuf> {
    let wanted = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            ArtifError::InvalidArgument(format!("{} has no file name", path.display()))
        })?;

    if Path::new(wanted).extension().is_none() {
        return Err(ArtifError::InvalidArgument(format!(
            "{} has no file extension",
            path.display()
        )));
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.eq_ignore_ascii_case(wanted) && entry.file_type().await?.is_file() {
            return Ok(dir.join(name));
        }
    }

    Err(ArtifError::NotFound(format!(
        "{} does not exist",
        path.display()
    )))
}
