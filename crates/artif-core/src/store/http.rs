//! REST store for the artifact repository
//!
//! Every call carries the bearer token and the configured timeout. A 404 maps
//! to `NotFound` (property removal treats it as nothing to delete), any other
//! non-success status or decode failure maps to `Unavailable`.

use super::ArtifactStore;
use crate::error::{ArtifError, Result};
use artif_types::{server, ArtifactMetadata, ChildEntry, Properties, RepositoryInfo};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header::CONTENT_LENGTH, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the REST store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// API base, e.g. `https://server.com:8081/artifactory/api`
    pub server_api: String,
    /// Identity token sent as bearer credentials
    pub token: String,
    /// Timeout for API calls; transfers only use it for connecting
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(server_api: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_api: server_api.into(),
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `ArtifactStore` backed by the repository's REST API
pub struct RestStore {
    http: Client,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct StorageItem {
    #[serde(default)]
    children: Vec<StorageChild>,
}

#[derive(Debug, Deserialize)]
struct StorageChild {
    uri: String,
    #[serde(default)]
    folder: bool,
}

#[derive(Debug, Deserialize)]
struct PropertiesResponse {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        if config.server_api.trim().is_empty() {
            return Err(ArtifError::InvalidArgument(
                "server address is required".to_string(),
            ));
        }

        let http = Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(format!("artif/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArtifError::unavailable_with_source("failed to create HTTP client", e))?;

        Ok(Self { http, config })
    }

    fn api(&self) -> &str {
        server::api_base(&self.config.server_api)
    }

    /// Send an API call with the request timeout applied
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        self.send_raw(request.timeout(self.config.timeout), what).await
    }

    async fn send_raw(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| ArtifError::unavailable_with_source(format!("{} request failed", what), e))?;

        let status = response.status();
        debug!("{} -> {}", what, status);

        if status == StatusCode::NOT_FOUND {
            return Err(ArtifError::NotFound(format!(
                "{}: {} not found",
                what,
                response.url()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArtifError::unavailable(format!(
                "{} returned {}: {}",
                what,
                status,
                body.trim()
            )));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request, what).await?;
        response.json::<T>().await.map_err(|e| {
            ArtifError::unavailable_with_source(format!("could not decode {} response", what), e)
        })
    }
}

#[async_trait]
impl ArtifactStore for RestStore {
    fn server_api(&self) -> &str {
        &self.config.server_api
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>> {
        let url = format!("{}/repositories", self.api());
        self.get_json(self.http.get(url), "list repositories").await
    }

    async fn list_children(&self, item_path: &str) -> Result<Vec<ChildEntry>> {
        let url = server::storage_uri(self.api(), item_path);
        let item: StorageItem = self.get_json(self.http.get(url), "list children").await?;

        Ok(item
            .children
            .into_iter()
            .map(|c| ChildEntry {
                name: c.uri.trim_start_matches('/').to_string(),
                is_folder: c.folder,
            })
            .collect())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<String>> {
        let url = format!("{}/search/artifact", self.api());
        let results: SearchResults = self
            .get_json(self.http.get(url).query(&[("name", name)]), "artifact search")
            .await?;
        Ok(results.results.into_iter().map(|hit| hit.uri).collect())
    }

    async fn search_by_properties(&self, tokens: &[String]) -> Result<Vec<String>> {
        let mut url = Url::parse(&format!("{}/search/prop", self.api())).map_err(|e| {
            ArtifError::InvalidArgument(format!("invalid server address {}: {}", self.api(), e))
        })?;
        {
            // A bare key asks for artifacts that carry it, whatever the value
            let mut query = url.query_pairs_mut();
            for token in tokens {
                match token.split_once('=') {
                    Some((key, value)) => query.append_pair(key, value),
                    None => query.append_key_only(token),
                };
            }
        }
        let results: SearchResults = self
            .get_json(self.http.get(url), "property search")
            .await?;
        Ok(results.results.into_iter().map(|hit| hit.uri).collect())
    }

    async fn get_metadata(&self, artifact_uri: &str) -> Result<ArtifactMetadata> {
        self.get_json(self.http.get(artifact_uri), "artifact metadata")
            .await
    }

    async fn get_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<Properties> {
        let url = if keys.is_empty() {
            format!("{}?properties", artifact_uri)
        } else {
            format!("{}?properties={}", artifact_uri, keys.join(","))
        };
        let response: PropertiesResponse =
            self.get_json(self.http.get(url), "artifact properties").await?;
        Ok(Properties::from_json_map(&response.properties))
    }

    async fn set_properties(&self, artifact_uri: &str, tokens: &[String]) -> Result<()> {
        let url = format!("{}?properties={}", artifact_uri, tokens.join(";"));
        self.send(self.http.put(url), "set properties").await?;
        Ok(())
    }

    async fn delete_properties(&self, artifact_uri: &str, keys: &[String]) -> Result<()> {
        let url = format!("{}?properties={}", artifact_uri, keys.join(","));
        match self.send(self.http.delete(url), "delete properties").await {
            Ok(_) => Ok(()),
            Err(ArtifError::NotFound(message)) => {
                debug!("{}, nothing to delete", message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn download(&self, download_uri: &str, dest: &Path) -> Result<u64> {
        let response = self.send_raw(self.http.get(download_uri), "download").await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| ArtifError::unavailable_with_source("download interrupted", e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn upload(&self, source: &Path, target_uri: &str) -> Result<ArtifactMetadata> {
        let file = tokio::fs::File::open(source).await?;
        let len = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .send_raw(
                self.http.put(target_uri).header(CONTENT_LENGTH, len).body(body),
                "upload",
            )
            .await?;

        response.json::<ArtifactMetadata>().await.map_err(|e| {
            ArtifError::unavailable_with_source("could not decode upload response", e)
        })
    }

    async fn delete_artifact(&self, download_uri: &str) -> Result<()> {
        self.send(self.http.delete(download_uri), "delete artifact")
            .await?;
        Ok(())
    }
}
