//! The local repository: an on-disk artifact cache mirroring the remote
//! layout (`group/…/artifact/version/artifact-version[-classifier].ext`).

use std::path::{Path, PathBuf};

use quarry_core::artifact::Artifact;
use quarry_util::errors::QuarryError;

#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every file of one artifact version.
    pub fn version_dir(&self, artifact: &Artifact) -> PathBuf {
        self.root
            .join(artifact.group_id.replace('.', "/"))
            .join(&artifact.artifact_id)
            .join(&artifact.version)
    }

    /// The artifact's file name within its version directory.
    pub fn file_name(artifact: &Artifact) -> String {
        if artifact.classifier.is_empty() {
            format!(
                "{}-{}.{}",
                artifact.artifact_id, artifact.version, artifact.extension
            )
        } else {
            format!(
                "{}-{}-{}.{}",
                artifact.artifact_id, artifact.version, artifact.classifier, artifact.extension
            )
        }
    }

    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.version_dir(artifact).join(Self::file_name(artifact))
    }

    /// The artifact's path if it is already cached.
    pub fn find(&self, artifact: &Artifact) -> Option<PathBuf> {
        let path = self.path_for(artifact);
        path.is_file().then_some(path)
    }

    pub fn contains(&self, artifact: &Artifact) -> bool {
        self.find(artifact).is_some()
    }

    /// Store artifact content, creating directories as needed.
    pub fn install_bytes(
        &self,
        artifact: &Artifact,
        data: &[u8],
    ) -> Result<PathBuf, QuarryError> {
        let path = self.path_for(artifact);
        quarry_util::fs::write_atomic(&path, data)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_mirrors_remote_repositories() {
        let tmp = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(tmp.path());
        let artifact = Artifact::parse("org.example.demo:lib:1.2.0").unwrap();
        assert_eq!(
            local.path_for(&artifact),
            tmp.path().join("org/example/demo/lib/1.2.0/lib-1.2.0.jar")
        );
    }

    #[test]
    fn classifier_lands_in_the_file_name() {
        let artifact = Artifact::parse("g:lib:jar:sources:1.0").unwrap();
        assert_eq!(LocalRepository::file_name(&artifact), "lib-1.0-sources.jar");
    }

    #[test]
    fn install_and_find() {
        let tmp = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(tmp.path());
        let artifact = Artifact::parse("org.example:lib:1.0").unwrap();

        assert!(!local.contains(&artifact));
        let path = local.install_bytes(&artifact, b"jar bytes").unwrap();
        assert_eq!(local.find(&artifact), Some(path.clone()));
        assert_eq!(std::fs::read(path).unwrap(), b"jar bytes");
    }
}
