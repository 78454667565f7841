//! Artifact resolution against a mock remote repository.

use std::sync::Arc;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quarry_core::artifact::Artifact;
use quarry_core::descriptor::{
    Descriptor, DescriptorReader, DescriptorRequest, VersionRangeRequest, VersionRangeResolver,
    VersionRangeResult,
};
use quarry_core::error::{DescriptorError, VersionRangeError};
use quarry_core::repository::RemoteRepository;
use quarry_core::session::Session;
use quarry_core::version::Version;
use quarry_system::download::{ArtifactError, ArtifactRequest};
use quarry_system::local::LocalRepository;
use quarry_system::system::RepositorySystem;

struct NoDescriptors;

#[async_trait]
impl DescriptorReader for NoDescriptors {
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
impl VersionRangeResolver for NoDescriptors {
    async fn resolve_range(
        &self,
        _session: &Session,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, VersionRangeError> {
        Ok(VersionRangeResult {
            versions: vec![Version::parse(&request.artifact.version)],
        })
    }
}

fn system(root: &std::path::Path) -> RepositorySystem {
    let stub = Arc::new(NoDescriptors);
    RepositorySystem::new(stub.clone(), stub, LocalRepository::new(root))
}

#[tokio::test]
async fn download_installs_into_the_local_repository() {
    let server = MockServer::start().await;
    let payload = b"jar-bytes".to_vec();
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload.clone())
                .insert_header(
                    "x-checksum-sha1",
                    quarry_util::hash::sha1_hex(&payload).as_str(),
                ),
        )
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let system = system(tmp.path());
    let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
    let repo = RemoteRepository::new("releases", format!("{}/releases", server.uri()));

    let result = system
        .resolve_artifact(
            &Session::new(),
            ArtifactRequest::new(artifact.clone(), vec![repo]),
        )
        .await
        .expect("download succeeds");

    assert_eq!(result.repository.as_deref(), Some("releases"));
    assert_eq!(std::fs::read(&result.path).unwrap(), payload);
    assert_eq!(
        result.path,
        tmp.path().join("org/example/lib/1.0/lib-1.0.jar")
    );

    // a second resolution is a pure local hit
    let again = system
        .resolve_artifact(
            &Session::new(),
            ArtifactRequest::new(artifact, Vec::new()),
        )
        .await
        .expect("local hit");
    assert_eq!(again.repository, None);
}

#[tokio::test]
async fn resolution_falls_through_to_the_next_repository() {
    let empty = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&empty)
        .await;

    let stocked = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&stocked)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let system = system(tmp.path());
    let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
    let repos = vec![
        RemoteRepository::new("empty", format!("{}/releases", empty.uri())),
        RemoteRepository::new("stocked", format!("{}/releases", stocked.uri())),
    ];

    let result = system
        .resolve_artifact(&Session::new(), ArtifactRequest::new(artifact, repos))
        .await
        .expect("second repository answers");
    assert_eq!(result.repository.as_deref(), Some("stocked"));
}

#[tokio::test]
async fn sidecar_checksum_verifies_the_download() {
    let server = MockServer::start().await;
    let payload = b"sidecar-checked".to_vec();
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar.sha1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("{}  lib-1.0.jar", quarry_util::hash::sha1_hex(&payload))),
        )
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let system = system(tmp.path());
    let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
    let repo = RemoteRepository::new("releases", format!("{}/releases", server.uri()));

    let result = system
        .resolve_artifact(
            &Session::new(),
            ArtifactRequest::new(artifact, vec![repo]),
        )
        .await
        .expect("sidecar verification passes");
    assert_eq!(std::fs::read(result.path).unwrap(), payload);
}

#[tokio::test]
async fn mismatching_sidecar_rejects_the_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar.sha1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("00".repeat(20)))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let system = system(tmp.path());
    let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
    let repo = RemoteRepository::new("releases", format!("{}/releases", server.uri()));

    let error = system
        .resolve_artifact(
            &Session::new(),
            ArtifactRequest::new(artifact.clone(), vec![repo]),
        )
        .await
        .expect_err("sidecar mismatch rejected");
    assert!(matches!(error, ArtifactError::ChecksumMismatch { .. }));
    assert!(system.local_repository().find(&artifact).is_none());
}

#[tokio::test]
async fn corrupt_payload_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/org/example/lib/1.0/lib-1.0.jar"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"tampered".to_vec())
                .insert_header("x-checksum-sha1", "00".repeat(20).as_str()),
        )
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let system = system(tmp.path());
    let artifact = Artifact::parse("org.example:lib:1.0").unwrap();
    let repo = RemoteRepository::new("releases", format!("{}/releases", server.uri()));

    let error = system
        .resolve_artifact(
            &Session::new(),
            ArtifactRequest::new(artifact.clone(), vec![repo]),
        )
        .await
        .expect_err("mismatch rejected");
    assert!(matches!(error, ArtifactError::ChecksumMismatch { .. }));
    assert!(system.local_repository().find(&artifact).is_none());
}
