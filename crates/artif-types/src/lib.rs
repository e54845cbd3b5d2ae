//! Artif Types - Pure type definitions for the artifact resolution plugin
//!
//! This crate contains only plain data types and their parsing rules, with no
//! async runtime or HTTP dependencies, so every other crate can share them.

pub mod artifact;
pub mod file_type;
pub mod property;
pub mod repository;
pub mod server;
pub mod validation;

pub use artifact::*;
pub use file_type::*;
pub use property::*;
pub use repository::*;
pub use validation::*;

use thiserror::Error;

/// Errors raised while parsing or validating plain data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Artifact URI is empty")]
    EmptyUri,

    #[error("Artifact URI has no file name: {0}")]
    MissingFileName(String),

    #[error("Invalid property token '{0}': expected key=value")]
    InvalidPropertyToken(String),

    #[error("Property '{text}' contains disallowed character '{ch}'")]
    DisallowedCharacter { text: String, ch: char },

    #[error("Unknown image type '{0}': expected ova, ovf or vmtx")]
    UnknownImageType(String),
}
