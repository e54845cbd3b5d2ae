//! File-type specs and image kinds

use crate::{ArtifactRef, TypeError};
use serde::{Deserialize, Serialize};

/// Extension used when the caller gives none (VM templates)
pub const DEFAULT_FILE_TYPE: &str = ".vmxt";

/// Normalized file extension, always with a leading dot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileType(String);

impl FileType {
    /// Normalize `ext`: blank becomes the default, a missing dot is added
    pub fn new(ext: &str) -> Self {
        let ext = ext.trim();
        if ext.is_empty() {
            Self(DEFAULT_FILE_TYPE.to_string())
        } else if ext.starts_with('.') {
            Self(ext.to_string())
        } else {
            Self(format!(".{}", ext))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-sensitive extension equality
    pub fn matches(&self, artifact: &ArtifactRef) -> bool {
        artifact.extension() == Some(self.as_str())
    }
}

impl Default for FileType {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual-machine image packaging accepted by the image upload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Ova,
    Ovf,
    Vmtx,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Ova => "ova",
            ImageType::Ovf => "ovf",
            ImageType::Vmtx => "vmtx",
        }
    }

    /// Extensions of the files that travel with the primary image file
    pub fn companion_extensions(&self) -> &'static [&'static str] {
        match self {
            ImageType::Ova => &[],
            ImageType::Ovf => &["vmdk", "mf"],
            ImageType::Vmtx => &["vmdk", "nvram", "vmsd", "vmxf"],
        }
    }
}

impl std::str::FromStr for ImageType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "ova" => Ok(ImageType::Ova),
            "ovf" => Ok(ImageType::Ovf),
            "vmtx" => Ok(ImageType::Vmtx),
            _ => Err(TypeError::UnknownImageType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(FileType::new("").as_str(), ".vmxt");
        assert_eq!(FileType::new("  ").as_str(), ".vmxt");
        assert_eq!(FileType::new("ova").as_str(), ".ova");
        assert_eq!(FileType::new(".ova").as_str(), ".ova");
        assert_eq!(FileType::new(""), FileType::new(DEFAULT_FILE_TYPE));
    }

    #[test]
    fn test_matches_is_case_sensitive() {
        let upper = ArtifactRef::from_uri("http://h/api/storage/r/IMG.OVA").unwrap();
        let lower = ArtifactRef::from_uri("http://h/api/storage/r/img.ova").unwrap();
        let ova = FileType::new("ova");
        assert!(ova.matches(&lower));
        assert!(!ova.matches(&upper));
    }

    #[test]
    fn test_image_type_parse() {
        assert_eq!("OVA".parse::<ImageType>(), Ok(ImageType::Ova));
        assert_eq!(".vmtx".parse::<ImageType>(), Ok(ImageType::Vmtx));
        assert!("iso".parse::<ImageType>().is_err());
    }
}
