//! Repository browsing and recursive name search

use crate::error::{ArtifError, Result};
use crate::store::ArtifactStore;
use artif_types::ChildEntry;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Default maximum folder depth below a repository root
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Bounds for the recursive name search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Folders deeper than this below the repository root are not listed
    pub max_depth: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Keys of every visible repository
pub async fn list_repositories(store: &dyn ArtifactStore) -> Result<Vec<String>> {
    let keys: Vec<String> = store
        .list_repositories()
        .await?
        .into_iter()
        .map(|repo| repo.key)
        .filter(|key| !key.trim().is_empty())
        .collect();

    if keys.is_empty() {
        return Err(ArtifError::NotFound(
            "no repositories are visible with the supplied credentials".to_string(),
        ));
    }

    debug!("Found {} repositories", keys.len());
    Ok(keys)
}

/// Direct children of `repo/folder/...`
pub async fn list_children(store: &dyn ArtifactStore, item_path: &str) -> Result<Vec<ChildEntry>> {
    let item = item_path.trim().trim_matches('/');
    if item.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "item path is required to list children".to_string(),
        ));
    }

    store.list_children(item).await
}

/// Folder paths (`repo/folder/...`) holding a file whose name contains `target`
///
/// Matching ignores case. Every repository is walked; listing failures in a
/// subtree are logged and that subtree is skipped. The result is sorted and
/// free of duplicates.
pub async fn find_paths_containing_name(
    store: &dyn ArtifactStore,
    target: &str,
    limits: SearchLimits,
) -> Result<Vec<String>> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ArtifError::InvalidArgument(
            "a target name is required to search the repositories".to_string(),
        ));
    }
    let needle = target.to_lowercase();

    let repos = list_repositories(store).await?;
    let mut stack: Vec<(String, usize)> = repos.into_iter().rev().map(|r| (r, 0)).collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut found: BTreeSet<String> = BTreeSet::new();

    while let Some((path, depth)) = stack.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }

        let children = match store.list_children(&path).await {
            Ok(children) => children,
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                continue;
            }
        };

        for child in children {
            let name = child.name.trim_matches('/');
            if name.is_empty() {
                continue;
            }

            if child.is_folder {
                if depth >= limits.max_depth {
                    warn!(
                        "Not descending into {}/{}: depth limit {} reached",
                        path, name, limits.max_depth
                    );
                    continue;
                }
                stack.push((format!("{}/{}", path, name), depth + 1));
            } else if name.to_lowercase().contains(&needle) {
                debug!("Match {} in {}", name, path);
                found.insert(path.clone());
            }
        }
    }

    if found.is_empty() {
        return Err(ArtifError::NotFound(format!(
            "no file containing '{}' was found in any repository",
            target
        )));
    }

    info!("Found '{}' in {} folder(s)", target, found.len());
    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    const API: &str = "http://mem/artifactory/api";
    const T: &str = "2024-01-01T00:00:00Z";

    #[tokio::test]
    async fn test_find_paths_ignores_case() {
        let store = MemoryStore::new(API);
        store.add_artifact("repoA/folder1/Win22-Base.ova", T);
        store.add_artifact("repoA/folder2/other.txt", T);

        let paths = find_paths_containing_name(&store, "win22", SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(paths, vec!["repoA/folder1"]);
    }

    #[tokio::test]
    async fn test_find_paths_deduplicates_and_spans_repos() {
        let store = MemoryStore::new(API);
        store.add_artifact("repoA/f/WIN22-a.ova", T);
        store.add_artifact("repoA/f/win22-b.ova", T);
        store.add_artifact("repoB/deep/er/Win22.vmxt", T);

        let paths = find_paths_containing_name(&store, "Win22", SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(paths, vec!["repoA/f", "repoB/deep/er"]);
    }

    #[tokio::test]
    async fn test_find_paths_respects_depth_limit() {
        let store = MemoryStore::new(API);
        store.add_artifact("repoA/a/b/target.ova", T);

        let err = find_paths_containing_name(&store, "target", SearchLimits { max_depth: 1 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let paths = find_paths_containing_name(&store, "target", SearchLimits { max_depth: 2 })
            .await
            .unwrap();
        assert_eq!(paths, vec!["repoA/a/b"]);
    }

    #[tokio::test]
    async fn test_argument_and_empty_checks() {
        let store = MemoryStore::new(API);

        let err = find_paths_containing_name(&store, "  ", SearchLimits::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = list_repositories(&store).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = list_children(&store, "/").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_children() {
        let store = MemoryStore::new(API);
        store.add_repository("empty");

        assert_eq!(list_repositories(&store).await.unwrap(), vec!["empty"]);
        assert!(list_children(&store, "empty").await.unwrap().is_empty());
    }
}
