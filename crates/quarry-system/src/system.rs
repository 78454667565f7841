//! The `RepositorySystem`: typed entry points for dependency collection and
//! artifact resolution.

use std::sync::Arc;

use quarry_core::artifact::Artifact;
use quarry_core::descriptor::{
    DescriptorReader, VersionRangeResolver, VersionRequest, VersionResolver,
};
use quarry_core::session::Session;
use quarry_resolver::collector::{CollectError, CollectRequest, CollectResult, Collector};
use quarry_transport::http::HttpTransporterFactory;

use crate::download::{self, ArtifactError, ArtifactRequest, ArtifactResult};
use crate::local::LocalRepository;

/// Facade over the dependency graph engine, the transporter, and the local
/// repository. One instance serves any number of sessions.
pub struct RepositorySystem {
    collector: Collector,
    factory: HttpTransporterFactory,
    local: LocalRepository,
    version_resolver: Option<Arc<dyn VersionResolver>>,
}

impl RepositorySystem {
    pub fn new(
        descriptor_reader: Arc<dyn DescriptorReader>,
        version_range_resolver: Arc<dyn VersionRangeResolver>,
        local: LocalRepository,
    ) -> Self {
        Self {
            collector: Collector::new(descriptor_reader, version_range_resolver),
            factory: HttpTransporterFactory::new(),
            local,
            version_resolver: None,
        }
    }

    /// Supply a resolver for `LATEST`/`RELEASE`/`SNAPSHOT` meta versions.
    pub fn with_version_resolver(mut self, resolver: Arc<dyn VersionResolver>) -> Self {
        self.version_resolver = Some(resolver);
        self
    }

    pub fn local_repository(&self) -> &LocalRepository {
        &self.local
    }

    /// Build the transitive dependency graph for `request`.
    pub async fn collect_dependencies(
        &self,
        session: &Session,
        request: CollectRequest,
    ) -> Result<CollectResult, CollectError> {
        self.collector.collect(session, request).await
    }

    /// Resolve one artifact's payload into the local repository, downloading
    /// it when missing.
    pub async fn resolve_artifact(
        &self,
        session: &Session,
        request: ArtifactRequest,
    ) -> Result<ArtifactResult, ArtifactError> {
        let mut request = request;
        if request.artifact.is_meta_version() {
            let resolver =
                self.version_resolver
                    .as_ref()
                    .ok_or_else(|| ArtifactError::UnresolvedVersion {
                        artifact: request.artifact.to_string(),
                    })?;
            let resolved = resolver
                .resolve_version(
                    session,
                    &VersionRequest {
                        artifact: request.artifact.clone(),
                        repositories: request.repositories.clone(),
                    },
                )
                .await
                .map_err(|e| ArtifactError::Retrieval {
                    artifact: request.artifact.to_string(),
                    message: e.to_string(),
                })?;
            request.artifact = request.artifact.with_version(resolved.version);
        }
        download::download_artifact(session, &self.factory, &self.local, &request).await
    }

    /// Convenience for callers holding a coordinate string.
    pub fn parse_artifact(&self, coordinate: &str) -> Option<Artifact> {
        Artifact::parse(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quarry_core::descriptor::{
        Descriptor, DescriptorRequest, VersionRangeRequest, VersionRangeResult,
    };
    use quarry_core::error::{DescriptorError, VersionRangeError};

    struct EmptyUniverse;

    #[async_trait]
    impl DescriptorReader for EmptyUniverse {
        async fn read_descriptor(
            &self,
            _session: &Session,
            request: &DescriptorRequest,
        ) -> Result<Descriptor, DescriptorError> {
            Err(DescriptorError::NotFound {
                artifact: request.artifact.to_string(),
            })
        }
    }

    #[async_trait]
    impl VersionRangeResolver for EmptyUniverse {
        async fn resolve_range(
            &self,
            _session: &Session,
            request: &VersionRangeRequest,
        ) -> Result<VersionRangeResult, VersionRangeError> {
            Ok(VersionRangeResult {
                versions: vec![quarry_core::version::Version::parse(
                    &request.artifact.version,
                )],
            })
        }
    }

    fn system(root: &std::path::Path) -> RepositorySystem {
        let universe = Arc::new(EmptyUniverse);
        RepositorySystem::new(universe.clone(), universe, LocalRepository::new(root))
    }

    #[tokio::test]
    async fn resolve_artifact_prefers_the_local_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let system = system(tmp.path());
        let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
        system
            .local_repository()
            .install_bytes(&artifact, b"cached")
            .unwrap();

        let result = system
            .resolve_artifact(
                &Session::new(),
                ArtifactRequest::new(artifact.clone(), Vec::new()),
            )
            .await
            .unwrap();

        assert_eq!(result.repository, None);
        assert_eq!(std::fs::read(result.path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn meta_version_without_resolver_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let system = system(tmp.path());
        let artifact = Artifact::parse("org.example:lib:LATEST").unwrap();

        let error = system
            .resolve_artifact(&Session::new(), ArtifactRequest::new(artifact, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(error, ArtifactError::UnresolvedVersion { .. }));
    }

    #[tokio::test]
    async fn missing_artifact_with_no_repositories_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let system = system(tmp.path());
        let artifact = Artifact::parse("org.example:lib:1.0").unwrap();

        let error = system
            .resolve_artifact(&Session::new(), ArtifactRequest::new(artifact, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(error, ArtifactError::NotFound { .. }));
    }
}
