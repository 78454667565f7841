//! Supplier traits the resolution engine consumes: descriptor reading,
//! version resolution, version-range enumeration, and repository aggregation.
//!
//! Implementations come from the embedding application; the engine only
//! depends on the contracts here.

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::dependency::Dependency;
use crate::error::{DescriptorError, VersionError, VersionRangeError};
use crate::repository::RemoteRepository;
use crate::session::Session;
use crate::version::Version;

/// Request for the descriptor of one artifact.
#[derive(Debug, Clone)]
pub struct DescriptorRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

impl DescriptorRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
            context: String::new(),
        }
    }
}

/// The metadata a descriptor contributes to graph building.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    /// Replacement coordinates when the artifact has moved.
    pub relocation: Option<Artifact>,
    /// Repositories the descriptor declares for its own dependencies.
    pub repositories: Vec<RemoteRepository>,
}

/// Reads artifact descriptors. Parsing the on-the-wire descriptor format is
/// entirely the implementor's business.
#[async_trait]
pub trait DescriptorReader: Send + Sync {
    async fn read_descriptor(
        &self,
        session: &Session,
        request: &DescriptorRequest,
    ) -> Result<Descriptor, DescriptorError>;
}

#[derive(Debug, Clone)]
pub struct VersionRangeRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

impl VersionRangeRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
            context: String::new(),
        }
    }
}

/// Candidate versions for a (possibly ranged) version spec, ascending.
#[derive(Debug, Clone, Default)]
pub struct VersionRangeResult {
    pub versions: Vec<Version>,
}

/// Expands version specs to the ordered list of matching concrete versions.
/// A bare version yields a single-element list.
#[async_trait]
pub trait VersionRangeResolver: Send + Sync {
    async fn resolve_range(
        &self,
        session: &Session,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, VersionRangeError>;
}

#[derive(Debug, Clone)]
pub struct VersionRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

#[derive(Debug, Clone)]
pub struct VersionResult {
    /// The concrete version the meta token resolved to.
    pub version: String,
    /// Id of the repository that answered, when known.
    pub repository: Option<String>,
}

/// Resolves meta versions (`LATEST`, `RELEASE`, `SNAPSHOT`) to concrete ones.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve_version(
        &self,
        session: &Session,
        request: &VersionRequest,
    ) -> Result<VersionResult, VersionError>;
}

/// Merges repositories a descriptor declares with those inherited from the
/// parent request, applying session policy (authentication selection,
/// dominance, de-duplication).
pub trait RemoteRepositoryManager: Send + Sync {
    /// `recessive_is_raw` marks the recessive list as coming straight out of
    /// a descriptor, i.e. not yet passed through session policy.
    fn aggregate_repositories(
        &self,
        session: &Session,
        dominant: &[RemoteRepository],
        recessive: &[RemoteRepository],
        recessive_is_raw: bool,
    ) -> Vec<RemoteRepository>;
}
