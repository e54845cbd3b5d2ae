//! Repository listing types

use serde::{Deserialize, Serialize};

/// One repository as listed by the repositories endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub key: String,
    #[serde(default, rename = "type")]
    pub repo_type: String,
    #[serde(default)]
    pub package_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Child of a folder or repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    /// Child name without leading slash
    pub name: String,
    pub is_folder: bool,
}

impl ChildEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: false,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
        }
    }
}
