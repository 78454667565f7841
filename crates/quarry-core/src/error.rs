//! Error types for descriptor reading and version resolution.

use miette::Diagnostic;
use thiserror::Error;

/// Reading an artifact descriptor failed.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum DescriptorError {
    /// No repository had a descriptor for the artifact.
    #[error("artifact descriptor for {artifact} not found")]
    NotFound { artifact: String },

    /// A descriptor was found but could not be understood.
    #[error("invalid artifact descriptor for {artifact}: {message}")]
    Invalid { artifact: String, message: String },

    /// Transfer-level failure while fetching the descriptor.
    #[error("failed to retrieve artifact descriptor for {artifact}: {message}")]
    Retrieval { artifact: String, message: String },
}

/// Expanding a version or version range failed.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum VersionRangeError {
    /// The range contains no versions, possibly after managed narrowing or
    /// filtering.
    #[error("no versions available for {artifact} within range {range}")]
    #[diagnostic(help("the range may have been narrowed by dependency management or a version filter"))]
    Empty { artifact: String, range: String },

    #[error("malformed version range {range} for {artifact}")]
    Malformed { artifact: String, range: String },

    #[error("failed to enumerate versions for {artifact}: {message}")]
    Enumeration { artifact: String, message: String },
}

/// Resolving a meta version (`LATEST`, `RELEASE`, `SNAPSHOT`) failed.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("failed to resolve version {version} of {artifact}: {message}")]
pub struct VersionError {
    pub artifact: String,
    pub version: String,
    pub message: String,
}
