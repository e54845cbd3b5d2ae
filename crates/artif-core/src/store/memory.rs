//! In-memory artifact store
//!
//! Holds repositories and artifacts in `DashMap`s keyed by item path
//! (`repo/folder/file`). Used by the engine tests and for dry runs; URIs are
//! minted against the configured API base so they round-trip through the
//! same helpers as the REST store.

use super::ArtifactStore;
use crate::error::{ArtifError, Result};
use artif_types::{
    server, ArtifactMetadata, ArtifactRef, Checksums, ChildEntry, Properties, RepositoryInfo,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
struct StoredArtifact {
    created: String,
    properties: Properties,
    content: Vec<u8>,
}

pub struct MemoryStore {
    server_api: String,
    repositories: DashSet<String>,
    artifacts: DashMap<String, StoredArtifact>,
    unavailable: DashSet<String>,
}

impl MemoryStore {
    pub fn new(server_api: impl Into<String>) -> Self {
        Self {
            server_api: server_api.into(),
            repositories: DashSet::new(),
            artifacts: DashMap::new(),
            unavailable: DashSet::new(),
        }
    }

    pub fn add_repository(&self, key: impl Into<String>) {
        self.repositories.insert(key.into());
    }

    /// Store an empty artifact without properties
    pub fn add_artifact(&self, item_path: &str, created: &str) -> ArtifactRef {
        self.add_artifact_with(item_path, created, Properties::new(), Vec::new())
    }

    /// Store an artifact at `repo/folder/file`, creating the repository if needed
    pub fn add_artifact_with(
        &self,
        item_path: &str,
        created: &str,
        properties: Properties,
        content: impl Into<Vec<u8>>,
    ) -> ArtifactRef {
        let item = item_path.trim_matches('/').to_string();
        if let Some((repo, _)) = item.split_once('/') {
            self.add_repository(repo);
        }

        let uri = server::storage_uri(&self.server_api, &item);
        self.artifacts.insert(
            item,
            StoredArtifact {
                created: created.to_string(),
                properties,
                content: content.into(),
            },
        );

        ArtifactRef::from_uri(&uri).unwrap_or(ArtifactRef {
            repo: String::new(),
            path: Vec::new(),
            file_name: item_path.to_string(),
            uri,
        })
    }

    /// Make metadata and property reads for `artifact_uri` fail as unavailable
    pub fn mark_unavailable(&self, artifact_uri: &str) {
        self.unavailable.insert(artifact_uri.to_string());
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Stored bytes of the artifact at `repo/folder/file`
    pub fn content(&self, item_path: &str) -> Option<Vec<u8>> {
        self.artifacts
            .get(item_path.trim_matches('/'))
            .map(|a| a.content.clone())
    }

    fn item_from_storage_uri(&self, uri: &str) -> Option<String> {
        let prefix = format!("{}/storage/", server::api_base(&self.server_api));
        uri.strip_prefix(&prefix)
            .map(|item| item.trim_matches('/').to_string())
    }

    fn item_from_content_uri(&self, uri: &str) -> Option<String> {
        let prefix = format!("{}/", server::content_base(&self.server_api));
        uri.strip_prefix(&prefix)
            .map(|item| item.trim_matches('/').to_string())
    }

    fn check_available(&self, artifact_uri: &str) -> Result<()> {
        if self.unavailable.contains(artifact_uri) {
            return Err(ArtifError::unavailable(format!(
                "{} is not reachable",
                artifact_uri
            )));
        }
        Ok(())
    }

    fn lookup(&self, artifact_uri: &str) -> Result<(String, StoredArtifact)> {
        self.check_available(artifact_uri)?;
        self.item_from_storage_uri(artifact_uri)
            .and_then(|item| {
                self.artifacts
                    .get(&item)
                    .map(|stored| (item.clone(), stored.value().clone()))
            })
            .ok_or_else(|| ArtifError::NotFound(format!("{} not found", artifact_uri)))
    }

    fn metadata_for(&self, item: &str, stored: &StoredArtifact) -> ArtifactMetadata {
        let (repo, rest) = item.split_once('/').unwrap_or((item, ""));
        ArtifactMetadata {
            repo: repo.to_string(),
            path: format!("/{}", rest),
            created: stored.created.clone(),
            created_by: "memory".to_string(),
            last_modified: stored.created.clone(),
            download_uri: server::content_uri(&self.server_api, "", item),
            mime_type: "application/octet-stream".to_string(),
            size: stored.content.len().to_string(),
            checksums: Checksums::default(),
            original_checksums: Checksums::default(),
            uri: server::storage_uri(&self.server_api, item),
        }
    }
}

fn token_matches(properties: &Properties, token: &str) -> bool {
    match token.split_once('=') {
        Some((key, value)) => properties.get(key) == Some(value),
        None => properties.get(token).is_some(),
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    fn server_api(&self) -> &str {
        &self.server_api
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>> {
        let mut keys: Vec<String> = self.repositories.iter().map(|k| k.key().clone()).collect();
        keys.sort();

        Ok(keys
            .into_iter()
            .map(|key| RepositoryInfo {
                key,
                repo_type: "LOCAL".to_string(),
                package_type: "Generic".to_string(),
                description: None,
                url: None,
            })
            .collect())
    }

    async fn list_children(&self, item_path: &str) -> Result<Vec<ChildEntry>> {
        let item = item_path.trim_matches('/');
        let prefix = format!("{}/", item);
        let mut found = self.repositories.contains(item);
        let mut children: BTreeMap<String, bool> = BTreeMap::new();

        for entry in self.artifacts.iter() {
            let key = entry.key();
            if key == item {
                found = true;
            } else if let Some(rest) = key.strip_prefix(&prefix) {
                found = true;
                match rest.split_once('/') {
                    Some((folder, _)) => children.entry(folder.to_string()).or_insert(true),
                    None => children.entry(rest.to_string()).or_insert(false),
                };
            }
        }

        if !found {
            return Err(ArtifError::NotFound(format!("{} not found", item_path)));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_folder)| ChildEntry { name, is_folder })
            .collect())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<String>> {
        let needle = name.to_lowercase();
        let mut uris: Vec<String> = self
            .artifacts
            .iter()
            .filter(|entry| {
                let file = entry.key().rsplit('/').next().unwrap_or_default();
                file.to_lowercase().contains(&needle)
            })
            .map(|entry| server::storage_uri(&self.server_api, entry.key()))
            .collect();
        uris.sort();
        Ok(uris)
    }

    async fn search_by_properties(&self, tokens: &[String]) -> Result<Vec<String>> {
        let mut uris: Vec<String> = self
            .artifacts
            .iter()
            .filter(|entry| {
                tokens
                    .iter()
                    .all(|token| token_matches(&entry.value().properties, token))
            })
            .map(|entry| server::storage_uri(&self.server_api, entry.key()))
            .collect();
        uris.sort();
        Ok(uris)
    }

    async fn get_metadata(&self, artifact_uri: &str) -> Result<ArtifactMetadata> {
        let (item, stored) = self.lookup(artifact_uri)?;
        Ok(self.metadata_for(&item, &stored))
    }

    async fn get_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<Properties> {
        let (_, stored) = self.lookup(artifact_uri)?;
        let mut properties = stored.properties;
        if !keys.is_empty() {
            properties.retain_keys(keys);
        }
        Ok(properties)
    }

    async fn set_properties(&self, artifact_uri: &str, tokens: &[String]) -> Result<()> {
        let (item, _) = self.lookup(artifact_uri)?;
        if let Some(mut stored) = self.artifacts.get_mut(&item) {
            for token in tokens {
                let (key, value) = token.split_once('=').unwrap_or((token.as_str(), ""));
                stored.properties.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<()> {
        let (item, _) = self.lookup(artifact_uri)?;
        if let Some(mut stored) = self.artifacts.get_mut(&item) {
            for key in keys {
                stored.properties.remove(key);
            }
        }
        Ok(())
    }

    async fn download(&self, download_uri: &str, dest: &Path) -> Result<u64> {
        let content = self
            .item_from_content_uri(download_uri)
            .and_then(|item| self.artifacts.get(&item).map(|a| a.content.clone()))
            .ok_or_else(|| ArtifError::NotFound(format!("{} not found", download_uri)))?;

        tokio::fs::write(dest, &content).await?;
        Ok(content.len() as u64)
    }

    async fn upload(&self, source: &Path, target_uri: &str) -> Result<ArtifactMetadata> {
        let item = self
            .item_from_content_uri(target_uri)
            .filter(|item| item.contains('/'))
            .ok_or_else(|| {
                ArtifError::InvalidArgument(format!("{} is not a repository path", target_uri))
            })?;

        let repo = item.split('/').next().unwrap_or_default();
        if !self.repositories.contains(repo) {
            return Err(ArtifError::NotFound(format!("repository {} not found", repo)));
        }

        let content = tokio::fs::read(source).await?;
        let stored = StoredArtifact {
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            properties: Properties::new(),
            content,
        };
        let metadata = self.metadata_for(&item, &stored);
        self.artifacts.insert(item, stored);

        Ok(metadata)
    }

    async fn delete_artifact(&self, download_uri: &str) -> Result<()> {
        self.item_from_content_uri(download_uri)
            .and_then(|item| self.artifacts.remove(&item))
            .map(|_| ())
            .ok_or_else(|| ArtifError::NotFound(format!("{} not found", download_uri)))
    }
}
