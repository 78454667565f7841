//! Dependencies: an artifact plus the scope, optionality, and exclusions it
//! was declared with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactKey};

/// The recognized dependency scopes. Scope is a free string; anything outside
/// this set is carried through untouched.
pub mod scopes {
    pub const COMPILE: &str = "compile";
    pub const PROVIDED: &str = "provided";
    pub const RUNTIME: &str = "runtime";
    pub const TEST: &str = "test";
    pub const SYSTEM: &str = "system";
}

/// A declared dependency on an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub artifact: Artifact,
    /// Empty means unspecified, which downstream consumers read as `compile`.
    pub scope: String,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: Artifact, scope: impl Into<String>) -> Self {
        Self {
            artifact,
            scope: scope.into(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// The declared scope, with the empty string normalized to `compile`.
    pub fn effective_scope(&self) -> &str {
        if self.scope.is_empty() {
            scopes::COMPILE
        } else {
            &self.scope
        }
    }

    pub fn key(&self) -> ArtifactKey {
        self.artifact.key()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.artifact, self.effective_scope())?;
        if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

/// A `(group, artifact)` pattern cutting a subtree out of the graph. Either
/// field may be the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub const WILDCARD: &'static str = "*";

    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Exclude every transitive dependency.
    pub fn all() -> Self {
        Self::new(Self::WILDCARD, Self::WILDCARD)
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        (self.group_id == Self::WILDCARD || self.group_id == artifact.group_id)
            && (self.artifact_id == Self::WILDCARD || self.artifact_id == artifact.artifact_id)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_reads_as_compile() {
        let dep = Dependency::new(Artifact::new("g", "a", "1.0"), "");
        assert_eq!(dep.effective_scope(), "compile");
        let dep = Dependency::new(Artifact::new("g", "a", "1.0"), "test");
        assert_eq!(dep.effective_scope(), "test");
    }

    #[test]
    fn exclusion_exact_match() {
        let excl = Exclusion::new("org.example", "lib");
        assert!(excl.matches(&Artifact::new("org.example", "lib", "1.0")));
        assert!(!excl.matches(&Artifact::new("org.example", "other", "1.0")));
        assert!(!excl.matches(&Artifact::new("org.other", "lib", "1.0")));
    }

    #[test]
    fn exclusion_wildcards() {
        let group_wide = Exclusion::new("org.example", "*");
        assert!(group_wide.matches(&Artifact::new("org.example", "anything", "1.0")));
        assert!(!group_wide.matches(&Artifact::new("org.other", "anything", "1.0")));
        assert!(Exclusion::all().matches(&Artifact::new("a", "b", "1.0")));
    }
}
