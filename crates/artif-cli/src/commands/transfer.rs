//! Download, upload and delete commands

use super::Session;
use anyhow::{Context, Result};
use artif_core::resolve::cancellable;
use artif_core::{transfer, UploadRequest};
use colored::Colorize;
use std::path::PathBuf;

pub async fn download(session: &Session, uri: &str, output_dir: Option<PathBuf>) -> Result<()> {
    let store = session.store()?;
    let output_dir = session.output_dir(output_dir);

    let path = cancellable(
        &session.cancel,
        transfer::download(store.as_ref(), uri, &output_dir),
    )
    .await
    .with_context(|| format!("Failed to download {}", uri))?;

    println!("{} Downloaded to {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}

pub async fn upload(
    session: &Session,
    source: PathBuf,
    target: &str,
    suffix: Option<String>,
) -> Result<()> {
    let store = session.store()?;
    let mut request = UploadRequest::new(source, target);
    if let Some(suffix) = suffix {
        request = request.with_suffix(suffix);
    }

    let metadata = cancellable(&session.cancel, transfer::upload(store.as_ref(), &request))
        .await
        .with_context(|| format!("Failed to upload {}", request.source_path.display()))?;

    println!("{} Uploaded {}", "✓".green(), metadata.download_uri.cyan());
    Ok(())
}

pub async fn delete(session: &Session, uri: &str) -> Result<()> {
    let store = session.store()?;

    cancellable(&session.cancel, transfer::delete_artifact(store.as_ref(), uri))
        .await
        .with_context(|| format!("Failed to delete {}", uri))?;

    println!("{} Deleted {}", "✓".green(), uri.cyan());
    Ok(())
}
