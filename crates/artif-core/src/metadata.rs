//! Artifact metadata and property reads

use crate::error::{ArtifError, Result};
use crate::store::ArtifactStore;
use artif_types::{check_property_text, ArtifactMetadata, ArtifactRef, Properties};

pub async fn get_metadata(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
) -> Result<ArtifactMetadata> {
    store.get_metadata(&artifact.uri).await
}

/// Creation timestamp as reported by the repository
pub async fn created_date(store: &dyn ArtifactStore, artifact: &ArtifactRef) -> Result<String> {
    let metadata = get_metadata(store, artifact).await?;
    required_field(metadata.created, "creation date", artifact)
}

pub async fn download_uri(store: &dyn ArtifactStore, artifact: &ArtifactRef) -> Result<String> {
    let metadata = get_metadata(store, artifact).await?;
    required_field(metadata.download_uri, "download URI", artifact)
}

/// Properties of `artifact`, restricted to `keys` when any are given
///
/// Fails with `NotFound` when nothing matches, and with `InvalidArgument`
/// when a key holds a character the repository disallows.
pub async fn get_properties(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
    keys: &[String],
) -> Result<Properties> {
    let keys: Vec<String> = keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    for key in &keys {
        check_property_text(key)?;
    }

    let properties = store.get_properties(&artifact.uri, &keys).await?;
    if properties.is_empty() {
        let detail = if keys.is_empty() {
            "no properties".to_string()
        } else {
            format!("none of the properties {}", keys.join(", "))
        };
        return Err(ArtifError::NotFound(format!("{} has {}", artifact, detail)));
    }

    Ok(properties)
}

fn required_field(value: String, field: &str, artifact: &ArtifactRef) -> Result<String> {
    if value.trim().is_empty() {
        Err(ArtifError::NotFound(format!("{} has no {}", artifact, field)))
    } else {
        Ok(value)
    }
}
