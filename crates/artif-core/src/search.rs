//! Catalog search and file-type filtering

use crate::error::{ArtifError, Result};
use crate::store::ArtifactStore;
use artif_types::{ArtifactRef, FileType};
use tracing::{debug, warn};

/// Artifacts whose name contains `partial`
pub async fn search_by_name(store: &dyn ArtifactStore, partial: &str) -> Result<Vec<ArtifactRef>> {
    let partial = partial.trim();
    if partial.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "an artifact name is required to search".to_string(),
        ));
    }

    let uris = store.search_by_name(partial).await?;
    let refs = parse_results(uris);
    if refs.is_empty() {
        return Err(ArtifError::NotFound(format!(
            "no artifact name contains '{}'",
            partial
        )));
    }

    debug!("Name search '{}' returned {} artifact(s)", partial, refs.len());
    Ok(refs)
}

/// Artifacts matching `key=value` or bare `key` tokens
///
/// How several tokens combine is up to the repository's index; use the
/// resolver's property filter when every pair must hold.
pub async fn search_by_properties(
    store: &dyn ArtifactStore,
    tokens: &[String],
) -> Result<Vec<ArtifactRef>> {
    let tokens: Vec<String> = tokens
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "at least one property is required to search".to_string(),
        ));
    }

    let uris = store.search_by_properties(&tokens).await?;
    let refs = parse_results(uris);
    if refs.is_empty() {
        return Err(ArtifError::NotFound(format!(
            "no artifact carries {}",
            tokens.join(", ")
        )));
    }

    debug!("Property search returned {} artifact(s)", refs.len());
    Ok(refs)
}

/// Candidates whose extension equals `ext` exactly
///
/// A blank `ext` means the default `.vmxt`; a missing dot is added.
pub fn filter_by_extension(candidates: &[ArtifactRef], ext: &str) -> Vec<ArtifactRef> {
    let file_type = FileType::new(ext);
    candidates
        .iter()
        .filter(|c| file_type.matches(c))
        .cloned()
        .collect()
}

fn parse_results(uris: Vec<String>) -> Vec<ArtifactRef> {
    uris.into_iter()
        .filter_map(|uri| match ArtifactRef::from_uri(&uri) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Ignoring search result: {}", e);
                None
            }
        })
        .collect()
}
