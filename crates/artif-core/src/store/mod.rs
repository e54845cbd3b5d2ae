//! Repository store port
//!
//! `ArtifactStore` is the raw transport seam: one method per REST call, no
//! validation beyond what the transport needs. The browse/search/resolve
//! modules layer the contracts (empty-input checks, zero-result handling)
//! on top, so the REST store and the in-memory store share them.

pub mod http;
pub mod memory;

pub use http::{RestStore, StoreConfig, DEFAULT_TIMEOUT_SECS};
pub use memory::MemoryStore;

use crate::error::Result;
use artif_types::{ArtifactMetadata, ChildEntry, Properties, RepositoryInfo};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// REST API base address, e.g. `https://host/artifactory/api`
    fn server_api(&self) -> &str;

    /// All repositories visible to the caller
    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>>;

    /// Direct children of `repo/folder/...`; `NotFound` when the item is missing
    async fn list_children(&self, item_path: &str) -> Result<Vec<ChildEntry>>;

    /// Storage URIs of artifacts whose name contains `name`
    async fn search_by_name(&self, name: &str) -> Result<Vec<String>>;

    /// Storage URIs of artifacts matching `key=value` or bare `key` tokens
    async fn search_by_properties(&self, tokens: &[String]) -> Result<Vec<String>>;

    /// Metadata of the artifact at `artifact_uri`
    async fn get_metadata(&self, artifact_uri: &str) -> Result<ArtifactMetadata>;

    /// Properties of the artifact, restricted to `keys` when non-empty
    async fn get_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<Properties>;

    /// Assign `key=value` tokens to the artifact
    async fn set_properties(&self, artifact_uri: &str, tokens: &[String]) -> Result<()>;

    /// Remove property keys from the artifact; unknown keys are ignored
    async fn delete_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<()>;

    /// Write the content at `download_uri` to `dest`, returning bytes written
    async fn download(&self, download_uri: &str, dest: &Path) -> Result<u64>;

    /// Upload `source` to the content URI `target_uri`
    async fn upload(&self, source: &Path, target_uri: &str) -> Result<ArtifactMetadata>;

    /// Remove the artifact at the content URI `download_uri`
    async fn delete_artifact(&self, download_uri: &str) -> Result<()>;
}
