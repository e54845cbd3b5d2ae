//! Artifact references and metadata

use crate::TypeError;
use serde::{Deserialize, Deserializer, Serialize};

/// Marker separating the API base from `repo/path/file` in a storage URI
pub const STORAGE_MARKER: &str = "/api/storage/";

/// Identifies one stored artifact
///
/// Built from the storage URI returned by search endpoints, e.g.
/// `https://host/artifactory/api/storage/images/win22/Win22-Base.ova`
/// becomes repo `images`, path `["win22"]`, file `Win22-Base.ova`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub repo: String,
    pub path: Vec<String>,
    pub file_name: String,
    pub uri: String,
}

impl ArtifactRef {
    /// Parse a storage URI into its components
    ///
    /// A URI without the storage marker keeps its last segment as the file
    /// name, its inner segments as the path and an empty repository key.
    pub fn from_uri(uri: &str) -> Result<Self, TypeError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(TypeError::EmptyUri);
        }

        let without_query = uri.split(['?', '#']).next().unwrap_or(uri);

        let (repo, mut segments) = match without_query.find(STORAGE_MARKER) {
            Some(idx) => {
                let tail = &without_query[idx + STORAGE_MARKER.len()..];
                let mut segments = split_segments(tail);
                if segments.len() < 2 {
                    return Err(TypeError::MissingFileName(uri.to_string()));
                }
                let repo = segments.remove(0);
                (repo, segments)
            }
            None => {
                let after_scheme = without_query
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(without_query);
                // Drop the authority part
                let tail = after_scheme.split_once('/').map(|(_, p)| p).unwrap_or("");
                (String::new(), split_segments(tail))
            }
        };

        let file_name = segments
            .pop()
            .ok_or_else(|| TypeError::MissingFileName(uri.to_string()))?;

        Ok(Self {
            repo,
            path: segments,
            file_name,
            uri: uri.to_string(),
        })
    }

    /// File extension including the leading dot, if any
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rfind('.')
            .map(|idx| &self.file_name[idx..])
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(idx) => &self.file_name[..idx],
            None => &self.file_name,
        }
    }

    /// `repo/folder/...` without leading or trailing slash
    pub fn parent_path(&self) -> String {
        let mut parts = Vec::with_capacity(self.path.len() + 1);
        if !self.repo.is_empty() {
            parts.push(self.repo.as_str());
        }
        parts.extend(self.path.iter().map(String::as_str));
        parts.join("/")
    }

    /// `/repo/folder/.../` as used for upload targets
    pub fn folder_path(&self) -> String {
        let parent = self.parent_path();
        if parent.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", parent)
        }
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Content checksums
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub sha256: String,
}

/// Per-artifact metadata as returned by the storage endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub path: String,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub download_uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size: String,
    #[serde(default)]
    pub checksums: Checksums,
    #[serde(default)]
    pub original_checksums: Checksums,
    #[serde(default)]
    pub uri: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Outcome of a successful resolution, handed back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub name: String,
    #[serde(rename = "creation_date")]
    pub created: String,
    pub artifact_uri: String,
    pub download_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_uri() {
        let r = ArtifactRef::from_uri(
            "https://host:8081/artifactory/api/storage/images/win22/2024/Win22-Base.ova",
        )
        .unwrap();
        assert_eq!(r.repo, "images");
        assert_eq!(r.path, vec!["win22", "2024"]);
        assert_eq!(r.file_name, "Win22-Base.ova");
        assert_eq!(r.extension(), Some(".ova"));
        assert_eq!(r.stem(), "Win22-Base");
        assert_eq!(r.parent_path(), "images/win22/2024");
        assert_eq!(r.folder_path(), "/images/win22/2024/");
    }

    #[test]
    fn test_parse_uri_without_marker() {
        let r = ArtifactRef::from_uri("http://host/artifactory/repo/rhel9.vmxt").unwrap();
        assert_eq!(r.repo, "");
        assert_eq!(r.path, vec!["artifactory", "repo"]);
        assert_eq!(r.file_name, "rhel9.vmxt");
    }

    #[test]
    fn test_parse_rejects_empty_and_bare_repo() {
        assert_eq!(ArtifactRef::from_uri("  "), Err(TypeError::EmptyUri));
        assert!(matches!(
            ArtifactRef::from_uri("http://h/artifactory/api/storage/images"),
            Err(TypeError::MissingFileName(_))
        ));
    }

    #[test]
    fn test_extension_absent() {
        let r = ArtifactRef::from_uri("http://h/api/storage/repo/README").unwrap();
        assert_eq!(r.extension(), None);
        assert_eq!(r.stem(), "README");
    }

    #[test]
    fn test_metadata_accepts_numeric_size() {
        let meta: ArtifactMetadata = serde_json::from_str(
            r#"{"repo":"images","created":"2024-06-01T10:00:00.000Z","size":1024,
                "downloadUri":"http://h/artifactory/images/a.ova",
                "checksums":{"sha256":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(meta.size, "1024");
        assert_eq!(meta.checksums.sha256, "abc");
        assert_eq!(meta.download_uri, "http://h/artifactory/images/a.ova");
    }
}
