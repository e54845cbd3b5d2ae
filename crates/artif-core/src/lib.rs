//! Artif Core - artifact resolution engine and repository access
//!
//! Resolves a partial artifact name, a file type and a set of required
//! properties to exactly one artifact in a binary repository, and provides
//! the browse, search, property, and transfer operations the plugin
//! components are built from.

pub mod browse;
pub mod component;
pub mod config;
pub mod error;
pub mod metadata;
pub mod properties;
pub mod resolve;
pub mod search;
pub mod store;
pub mod transfer;

pub use browse::{find_paths_containing_name, SearchLimits};
pub use component::{
    Component, ComponentKind, ComponentOutput, ComponentRegistry, ExecutionContext, ImportReport,
    TransferFailure, TransferReport,
};
pub use config::{ConfigManager, Environment, ServerConfig, Settings};
pub use error::{ArtifError, ErrorKind, ResolveStage, Result};
pub use resolve::{resolve_artifact, Resolution, ResolutionReport, ResolveRequest, Resolver};
pub use store::{ArtifactStore, MemoryStore, RestStore, StoreConfig};
pub use transfer::UploadRequest;

// Re-export the data model
pub use artif_types;
