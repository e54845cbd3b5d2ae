//! Property assignment and removal

use crate::error::{ArtifError, Result};
use crate::store::ArtifactStore;
use artif_types::{check_property_text, format_token, ArtifactRef, Properties};
use tracing::info;

/// Assign every key/value pair in `properties` to `artifact`
///
/// Keys and values are checked against the repository's disallowed
/// characters before anything is sent.
pub async fn set_properties(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
    properties: &Properties,
) -> Result<()> {
    if properties.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "at least one property is required".to_string(),
        ));
    }

    let mut tokens = Vec::with_capacity(properties.len());
    for (key, value) in properties.iter() {
        if key.trim().is_empty() {
            return Err(ArtifError::InvalidArgument(
                "property keys must not be blank".to_string(),
            ));
        }
        check_property_text(key)?;
        check_property_text(value)?;
        tokens.push(format_token(key, value));
    }

    store.set_properties(&artifact.uri, &tokens).await?;
    info!("Set {} on {}", tokens.join(";"), artifact);
    Ok(())
}

/// Remove `keys` from `artifact`; keys it does not carry are ignored
pub async fn delete_properties(
    store: &dyn ArtifactStore,
    artifact: &ArtifactRef,
    keys: &[String],
) -> Result<()> {
    let keys: Vec<String> = keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "at least one property key is required".to_string(),
        ));
    }
    for key in &keys {
        check_property_text(key)?;
    }

    store.delete_properties(&artifact.uri, &keys).await?;
    info!("Deleted {} from {}", keys.join(","), artifact);
    Ok(())
}
