//! Payload download: fetch an artifact from the first repository that has
//! it, verify checksums, install into the local repository.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use quarry_core::artifact::Artifact;
use quarry_core::repository::RemoteRepository;
use quarry_core::session::Session;
use quarry_transport::error::ErrorKind;
use quarry_transport::http::HttpTransporterFactory;
use quarry_transport::task::{GetTask, TransferListener};

use crate::local::LocalRepository;
use crate::progress::ProgressListener;

/// Ask for one artifact's payload.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
        }
    }
}

/// Where the payload ended up.
#[derive(Debug, Clone)]
pub struct ArtifactResult {
    pub artifact: Artifact,
    pub path: PathBuf,
    /// Id of the repository that supplied it; `None` for local hits.
    pub repository: Option<String>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ArtifactError {
    #[error("artifact {artifact} not found in any remote repository")]
    NotFound { artifact: String },

    #[error("artifact {artifact} could not be retrieved: {message}")]
    Retrieval { artifact: String, message: String },

    #[error("checksum mismatch for {artifact} from {repository}: {algorithm} expected {expected}, got {actual}")]
    #[diagnostic(help("the repository copy may be corrupt; try another repository"))]
    ChecksumMismatch {
        artifact: String,
        repository: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("the version of {artifact} must be resolved before download")]
    UnresolvedVersion { artifact: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Download `request.artifact` into `local`, trying repositories in order.
/// 404-ish outcomes move on to the next repository; the last non-404 failure
/// is reported when every repository came up empty-handed.
pub async fn download_artifact(
    session: &Session,
    factory: &HttpTransporterFactory,
    local: &LocalRepository,
    request: &ArtifactRequest,
) -> Result<ArtifactResult, ArtifactError> {
    let artifact = &request.artifact;
    if artifact.is_meta_version() {
        return Err(ArtifactError::UnresolvedVersion {
            artifact: artifact.to_string(),
        });
    }

    if let Some(path) = local.find(artifact) {
        return Ok(ArtifactResult {
            artifact: artifact.clone(),
            path,
            repository: None,
        });
    }

    let destination = local.path_for(artifact);
    let location = remote_location(artifact);
    let mut last_failure: Option<String> = None;

    for repository in &request.repositories {
        let transporter = match factory.new_instance(session, repository) {
            Ok(transporter) => transporter,
            Err(error) => {
                tracing::debug!(repository = %repository.id, error = %error, "skipping repository");
                continue;
            }
        };

        let listener: Arc<dyn TransferListener> =
            Arc::new(ProgressListener::new(LocalRepository::file_name(artifact)));
        let mut task = GetTask::new(&location)
            .with_destination(&destination)
            .with_listener(listener);

        match transporter.get(&mut task).await {
            Ok(()) => {
                if task.checksums().is_empty() {
                    verify_against_sidecar(&transporter, artifact, repository, &location, &destination)
                        .await?;
                } else {
                    verify_checksums(artifact, repository, &destination, task.checksums())?;
                }
                tracing::debug!(artifact = %artifact, repository = %repository.id, "resolved");
                return Ok(ArtifactResult {
                    artifact: artifact.clone(),
                    path: destination,
                    repository: Some(repository.id.clone()),
                });
            }
            Err(error) => match transporter.classify(&error) {
                ErrorKind::NotFound => continue,
                ErrorKind::Other => {
                    tracing::warn!(artifact = %artifact, repository = %repository.id, error = %error, "transfer failed");
                    last_failure = Some(error.to_string());
                }
            },
        }
    }

    match last_failure {
        Some(message) => Err(ArtifactError::Retrieval {
            artifact: artifact.to_string(),
            message,
        }),
        None => Err(ArtifactError::NotFound {
            artifact: artifact.to_string(),
        }),
    }
}

/// Repository-relative location of an artifact's payload.
pub fn remote_location(artifact: &Artifact) -> String {
    format!(
        "{}/{}/{}/{}",
        artifact.group_id.replace('.', "/"),
        artifact.artifact_id,
        artifact.version,
        LocalRepository::file_name(artifact)
    )
}

/// Verify against a `.sha1` or `.md5` sidecar when the response metadata
/// carried no checksum hints. A missing sidecar is only logged; a present
/// but mismatching one rejects the download.
async fn verify_against_sidecar(
    transporter: &quarry_transport::http::HttpTransporter,
    artifact: &Artifact,
    repository: &RemoteRepository,
    location: &str,
    path: &std::path::Path,
) -> Result<(), ArtifactError> {
    for (extension, algorithm) in [("sha1", "SHA-1"), ("md5", "MD5")] {
        let mut task = GetTask::new(format!("{location}.{extension}"));
        match transporter.get(&mut task).await {
            Ok(()) => {
                let expected = extract_hash(&task.data_string());
                if expected.is_empty() {
                    continue;
                }
                let mut hints = HashMap::new();
                hints.insert(algorithm.to_string(), expected);
                return verify_checksums(artifact, repository, path, &hints);
            }
            Err(error) => match transporter.classify(&error) {
                ErrorKind::NotFound => continue,
                ErrorKind::Other => {
                    tracing::warn!(artifact = %artifact, error = %error, "checksum sidecar fetch failed");
                    return Ok(());
                }
            },
        }
    }
    tracing::warn!(artifact = %artifact, "no checksum sidecar found");
    Ok(())
}

/// Extract the hex hash from a sidecar file, which may contain just the hash
/// or `hash  filename`.
fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

/// Compare the downloaded file against the checksums the transporter pulled
/// out of response metadata. Files failing verification are deleted.
fn verify_checksums(
    artifact: &Artifact,
    repository: &RemoteRepository,
    path: &std::path::Path,
    hints: &HashMap<String, String>,
) -> Result<(), ArtifactError> {
    if hints.is_empty() {
        tracing::debug!(artifact = %artifact, "no checksum hints in response metadata");
        return Ok(());
    }
    for (algorithm, expected) in hints {
        let actual = match algorithm.as_str() {
            "SHA-1" => quarry_util::hash::sha1_file(path)?,
            "SHA-256" => quarry_util::hash::sha256_file(path)?,
            "MD5" => quarry_util::hash::md5_file(path)?,
            other => {
                tracing::debug!(algorithm = other, "skipping unknown checksum algorithm");
                continue;
            }
        };
        if !actual.eq_ignore_ascii_case(expected) {
            let _ = std::fs::remove_file(path);
            return Err(ArtifactError::ChecksumMismatch {
                artifact: artifact.to_string(),
                repository: repository.id.clone(),
                algorithm: algorithm.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        tracing::debug!(artifact = %artifact, algorithm = %algorithm, "checksum verified");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_hash_tolerates_filenames() {
        assert_eq!(extract_hash("abc123\n"), "abc123");
        assert_eq!(extract_hash("abc123  lib-1.0.jar\n"), "abc123");
        assert_eq!(extract_hash("   "), "");
    }

    #[test]
    fn remote_location_follows_the_layout() {
        let artifact = Artifact::parse("org.example.demo:lib:1.2.0").unwrap();
        assert_eq!(
            remote_location(&artifact),
            "org/example/demo/lib/1.2.0/lib-1.2.0.jar"
        );
    }

    #[test]
    fn checksum_verification_deletes_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lib.jar");
        std::fs::write(&path, b"content").unwrap();

        let artifact = Artifact::parse("g:lib:1.0").unwrap();
        let repository = RemoteRepository::new("central", "https://repo.example/releases");
        let mut hints = HashMap::new();
        hints.insert("SHA-1".to_string(), "00".repeat(20));

        let error = verify_checksums(&artifact, &repository, &path, &hints).unwrap_err();
        assert!(matches!(error, ArtifactError::ChecksumMismatch { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn checksum_verification_accepts_matching_hints() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lib.jar");
        std::fs::write(&path, b"hello world").unwrap();

        let artifact = Artifact::parse("g:lib:1.0").unwrap();
        let repository = RemoteRepository::new("central", "https://repo.example/releases");
        let mut hints = HashMap::new();
        hints.insert(
            "SHA-1".to_string(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed".to_string(),
        );

        verify_checksums(&artifact, &repository, &path, &hints).unwrap();
        assert!(path.exists());
    }
}
