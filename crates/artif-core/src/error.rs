//! Error types for the artifact plugin

use artif_types::TypeError;
use thiserror::Error;

/// Coarse failure category, independent of where the error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Unavailable,
    AmbiguousResult,
    Cancelled,
    Config,
    Io,
}

/// Resolution stage an error was raised in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolveStage {
    NameSearch,
    TypeFilter,
    PropertyFilter,
    TieBreak,
    Metadata,
}

impl ResolveStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveStage::NameSearch => "name search",
            ResolveStage::TypeFilter => "type filter",
            ResolveStage::PropertyFilter => "property filter",
            ResolveStage::TieBreak => "tie-break",
            ResolveStage::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for ResolveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the artifact plugin
#[derive(Error, Debug)]
pub enum ArtifError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Ambiguous result: {0}")]
    AmbiguousResult(String),

    #[error("Resolution failed at {stage} with {candidates} candidate(s): {source}")]
    Resolution {
        stage: ResolveStage,
        candidates: usize,
        #[source]
        source: Box<ArtifError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtifError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ArtifError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ArtifError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap with the stage and candidate count it failed at
    pub fn at_stage(self, stage: ResolveStage, candidates: usize) -> Self {
        match self {
            // Cancellation is reported as-is
            ArtifError::Cancelled => ArtifError::Cancelled,
            other => ArtifError::Resolution {
                stage,
                candidates,
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ArtifError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ArtifError::NotFound(_) => ErrorKind::NotFound,
            ArtifError::Unavailable { .. } => ErrorKind::Unavailable,
            ArtifError::AmbiguousResult(_) => ErrorKind::AmbiguousResult,
            ArtifError::Resolution { source, .. } => source.kind(),
            ArtifError::Cancelled => ErrorKind::Cancelled,
            ArtifError::Config(_) => ErrorKind::Config,
            ArtifError::Io(_) => ErrorKind::Io,
            ArtifError::Yaml(_) | ArtifError::Json(_) => ErrorKind::Config,
        }
    }

    /// Stage and candidate count, for errors raised by the resolution chain
    pub fn stage(&self) -> Option<(ResolveStage, usize)> {
        match self {
            ArtifError::Resolution {
                stage, candidates, ..
            } => Some((*stage, *candidates)),
            _ => None,
        }
    }
}

impl From<TypeError> for ArtifError {
    fn from(e: TypeError) -> Self {
        ArtifError::InvalidArgument(e.to_string())
    }
}

impl From<reqwest::Error> for ArtifError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_decode() {
            "failed to decode response".to_string()
        } else {
            "request failed".to_string()
        };
        ArtifError::unavailable_with_source(message, e)
    }
}

pub type Result<T> = std::result::Result<T, ArtifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_reports_stage_and_source_kind() {
        let err = ArtifError::NotFound("no candidate has all properties".to_string())
            .at_stage(ResolveStage::PropertyFilter, 3);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.stage(), Some((ResolveStage::PropertyFilter, 3)));
        assert!(err.to_string().contains("property filter"));
        assert!(err.to_string().contains("3 candidate(s)"));
    }

    #[test]
    fn test_cancelled_is_not_wrapped() {
        let err = ArtifError::Cancelled.at_stage(ResolveStage::TieBreak, 2);
        assert!(matches!(err, ArtifError::Cancelled));
    }
}
