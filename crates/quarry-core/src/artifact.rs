//! Artifact coordinates: the `group:artifact[:extension[:classifier]]:version`
//! tuple that addresses every binary asset in a repository.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Extension assumed when a coordinate does not spell one out.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Meta version resolved to the newest available version, snapshot or not.
pub const LATEST_VERSION: &str = "LATEST";

/// Meta version resolved to the newest released (non-snapshot) version.
pub const RELEASE_VERSION: &str = "RELEASE";

/// A fully addressed artifact.
///
/// The version is kept as the raw string it was declared with: it may be a
/// concrete version, a range expression like `[1.0,2.0)`, or one of the meta
/// tokens `LATEST`/`RELEASE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    /// Possibly empty; distinguishes secondary artifacts such as `sources`.
    pub classifier: String,
    pub extension: String,
    pub version: String,
    /// Free attributes attached by dependency management.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            version: version.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Parse `group:artifact[:extension[:classifier]]:version`.
    ///
    /// Returns `None` when group, artifact, or version is missing or empty.
    pub fn parse(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        let (group, artifact, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, DEFAULT_EXTENSION, "", *v),
            [g, a, e, v] => (*g, *a, *e, "", *v),
            [g, a, e, c, v] => (*g, *a, *e, *c, *v),
            _ => return None,
        };
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            classifier: classifier.to_string(),
            extension: extension.to_string(),
            version: version.to_string(),
            properties: BTreeMap::new(),
        })
    }

    /// Version-independent identity used for conflict grouping and cycle
    /// detection.
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            classifier: self.classifier.clone(),
            extension: self.extension.clone(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }

    /// Whether the version is one of the `LATEST`/`RELEASE` meta tokens that
    /// must be resolved before the artifact can be fetched.
    pub fn is_meta_version(&self) -> bool {
        self.version == LATEST_VERSION || self.version == RELEASE_VERSION
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// The `(group, artifact, classifier, extension)` quadruple: two artifacts
/// with equal keys denote the same dependency identity at possibly different
/// versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    pub extension: String,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_three_part() {
        let a = Artifact::parse("org.example:lib:1.0").unwrap();
        assert_eq!(a.group_id, "org.example");
        assert_eq!(a.artifact_id, "lib");
        assert_eq!(a.version, "1.0");
        assert_eq!(a.extension, "jar");
        assert_eq!(a.classifier, "");
    }

    #[test]
    fn parse_with_extension_and_classifier() {
        let a = Artifact::parse("org.example:lib:zip:sources:2.1").unwrap();
        assert_eq!(a.extension, "zip");
        assert_eq!(a.classifier, "sources");
        assert_eq!(a.version, "2.1");
    }

    #[test]
    fn parse_rejects_empty_fields() {
        assert!(Artifact::parse("org.example::1.0").is_none());
        assert!(Artifact::parse(":lib:1.0").is_none());
        assert!(Artifact::parse("org.example:lib:").is_none());
        assert!(Artifact::parse("just-a-name").is_none());
    }

    #[test]
    fn display_round_trip() {
        let a = Artifact::parse("org.example:lib:zip:sources:2.1").unwrap();
        assert_eq!(a.to_string(), "org.example:lib:zip:sources:2.1");
        let b = Artifact::new("org.example", "lib", "1.0");
        assert_eq!(b.to_string(), "org.example:lib:jar:1.0");
    }

    #[test]
    fn key_ignores_version() {
        let a = Artifact::new("g", "a", "1.0");
        let b = Artifact::new("g", "a", "2.0");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn meta_versions() {
        assert!(Artifact::new("g", "a", "LATEST").is_meta_version());
        assert!(Artifact::new("g", "a", "RELEASE").is_meta_version());
        assert!(!Artifact::new("g", "a", "1.0").is_meta_version());
        assert!(Artifact::new("g", "a", "1.0-SNAPSHOT").is_snapshot());
    }
}
