//! Default implementations of the session's graph-building hooks: selectors,
//! dependency management, version filtering, traversal, and repository
//! aggregation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use quarry_core::artifact::ArtifactKey;
use quarry_core::dependency::{scopes, Dependency, Exclusion};
use quarry_core::descriptor::RemoteRepositoryManager;
use quarry_core::repository::RemoteRepository;
use quarry_core::session::{
    DependencyManager, DependencySelector, DependencyTraverser, ManagementUpdate, Session,
    VersionFilter,
};
use quarry_core::version::Version;

/// Rejects optional dependencies below the direct level.
pub struct OptionalitySelector {
    transitive: bool,
}

impl OptionalitySelector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { transitive: false })
    }
}

impl DependencySelector for OptionalitySelector {
    fn select(&self, dependency: &Dependency) -> bool {
        !self.transitive || !dependency.optional
    }

    fn derive_child_selector(&self, _parent: &Dependency) -> Arc<dyn DependencySelector> {
        Arc::new(Self { transitive: true })
    }
}

/// Rejects dependencies with non-transitive scopes (`test`, `provided` by
/// default) once past the direct level.
pub struct TransitiveScopeSelector {
    excluded: Vec<String>,
    transitive: bool,
}

impl TransitiveScopeSelector {
    pub fn new() -> Arc<Self> {
        Self::with_excluded(&[scopes::TEST, scopes::PROVIDED])
    }

    pub fn with_excluded(excluded: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            excluded: excluded.iter().map(|s| s.to_string()).collect(),
            transitive: false,
        })
    }
}

impl DependencySelector for TransitiveScopeSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        !self.transitive || !self.excluded.iter().any(|s| s == dependency.effective_scope())
    }

    fn derive_child_selector(&self, _parent: &Dependency) -> Arc<dyn DependencySelector> {
        Arc::new(Self {
            excluded: self.excluded.clone(),
            transitive: true,
        })
    }
}

/// Applies the exclusion patterns accumulated along the path from the root.
pub struct ExclusionSelector {
    exclusions: BTreeSet<Exclusion>,
}

impl ExclusionSelector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            exclusions: BTreeSet::new(),
        })
    }
}

impl DependencySelector for ExclusionSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        !self
            .exclusions
            .iter()
            .any(|e| e.matches(&dependency.artifact))
    }

    fn derive_child_selector(&self, parent: &Dependency) -> Arc<dyn DependencySelector> {
        if parent.exclusions.is_empty() {
            return Arc::new(Self {
                exclusions: self.exclusions.clone(),
            });
        }
        let mut merged = self.exclusions.clone();
        merged.extend(parent.exclusions.iter().cloned());
        Arc::new(Self { exclusions: merged })
    }
}

/// Conjunction of several selectors; derivation derives every member.
pub struct CompositeSelector {
    selectors: Vec<Arc<dyn DependencySelector>>,
}

impl CompositeSelector {
    pub fn new(selectors: Vec<Arc<dyn DependencySelector>>) -> Arc<Self> {
        Arc::new(Self { selectors })
    }
}

impl DependencySelector for CompositeSelector {
    fn select(&self, dependency: &Dependency) -> bool {
        self.selectors.iter().all(|s| s.select(dependency))
    }

    fn derive_child_selector(&self, parent: &Dependency) -> Arc<dyn DependencySelector> {
        Arc::new(Self {
            selectors: self
                .selectors
                .iter()
                .map(|s| s.derive_child_selector(parent))
                .collect(),
        })
    }
}

/// The selector a session falls back to: optional, non-transitive-scope, and
/// excluded dependencies are skipped.
pub fn default_selector() -> Arc<dyn DependencySelector> {
    CompositeSelector::new(vec![
        OptionalitySelector::new(),
        TransitiveScopeSelector::new(),
        ExclusionSelector::new(),
    ])
}

#[derive(Debug, Clone)]
struct ManagedEntry {
    version: Option<String>,
    scope: Option<String>,
    optional: Option<bool>,
    exclusions: Option<Vec<Exclusion>>,
    properties: Option<BTreeMap<String, String>>,
}

/// The classic dependency manager: management declared by an ancestor applies
/// to nodes two or more levels below the declaration, and entries closer to
/// the root dominate.
pub struct ClassicManager {
    depth: usize,
    entries: HashMap<ArtifactKey, ManagedEntry>,
}

impl ClassicManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            depth: 0,
            entries: HashMap::new(),
        })
    }

    /// A manager primed with a root request's managed dependencies.
    pub fn with_managed(managed: &[Dependency]) -> Arc<Self> {
        let root = Self {
            depth: 0,
            entries: HashMap::new(),
        };
        let derived = root.derive(managed);
        Arc::new(derived)
    }

    fn derive(&self, managed: &[Dependency]) -> Self {
        let mut entries = self.entries.clone();
        for dep in managed {
            entries.entry(dep.key()).or_insert_with(|| ManagedEntry {
                version: (!dep.artifact.version.is_empty()).then(|| dep.artifact.version.clone()),
                scope: (!dep.scope.is_empty()).then(|| dep.scope.clone()),
                optional: dep.optional.then_some(true),
                exclusions: (!dep.exclusions.is_empty()).then(|| dep.exclusions.clone()),
                properties: (!dep.artifact.properties.is_empty())
                    .then(|| dep.artifact.properties.clone()),
            });
        }
        Self {
            depth: self.depth + 1,
            entries,
        }
    }
}

impl DependencyManager for ClassicManager {
    fn manage(&self, dependency: &Dependency) -> Option<ManagementUpdate> {
        if self.depth < 2 {
            return None;
        }
        let entry = self.entries.get(&dependency.key())?;
        let mut update = ManagementUpdate::default();
        if let Some(ref version) = entry.version {
            if *version != dependency.artifact.version {
                update.version = Some(version.clone());
            }
        }
        if let Some(ref scope) = entry.scope {
            if *scope != dependency.scope {
                update.scope = Some(scope.clone());
            }
        }
        if let Some(optional) = entry.optional {
            if optional != dependency.optional {
                update.optional = Some(optional);
            }
        }
        if let Some(ref exclusions) = entry.exclusions {
            // managed exclusions extend the declared ones
            let mut merged = dependency.exclusions.clone();
            for exclusion in exclusions {
                if !merged.contains(exclusion) {
                    merged.push(exclusion.clone());
                }
            }
            if merged != dependency.exclusions {
                update.exclusions = Some(merged);
            }
        }
        if let Some(ref properties) = entry.properties {
            if *properties != dependency.artifact.properties {
                update.properties = Some(properties.clone());
            }
        }
        (!update.is_empty()).then_some(update)
    }

    fn derive_child_manager(&self, managed: &[Dependency]) -> Arc<dyn DependencyManager> {
        Arc::new(self.derive(managed))
    }
}

/// Traverses everything. Sessions override this to stop expansion below
/// self-contained artifacts.
pub struct ConstantTraverser {
    traverse: bool,
}

impl ConstantTraverser {
    pub fn new(traverse: bool) -> Arc<Self> {
        Arc::new(Self { traverse })
    }
}

impl DependencyTraverser for ConstantTraverser {
    fn should_traverse(&self, _dependency: &Dependency) -> bool {
        self.traverse
    }
}

/// Drops snapshot candidates from ranges whenever a release candidate is
/// also available.
pub struct SnapshotVersionFilter;

impl SnapshotVersionFilter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl VersionFilter for SnapshotVersionFilter {
    fn filter_versions(&self, _dependency: &Dependency, candidates: &mut Vec<Version>) {
        if candidates.iter().any(|v| !v.is_snapshot()) {
            candidates.retain(|v| !v.is_snapshot());
        }
    }
}

/// Dominant-first aggregation with de-duplication by repository id. Raw
/// recessive repositories (straight out of a descriptor) are stripped of
/// credentials they cannot legitimately carry.
pub struct DefaultRemoteRepositoryManager;

impl DefaultRemoteRepositoryManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl RemoteRepositoryManager for DefaultRemoteRepositoryManager {
    fn aggregate_repositories(
        &self,
        _session: &Session,
        dominant: &[RemoteRepository],
        recessive: &[RemoteRepository],
        recessive_is_raw: bool,
    ) -> Vec<RemoteRepository> {
        let mut result: Vec<RemoteRepository> = dominant.to_vec();
        for repo in recessive {
            if result.iter().any(|r| r.id == repo.id) {
                continue;
            }
            let mut repo = repo.clone();
            if recessive_is_raw {
                repo.credentials = None;
            }
            result.push(repo);
        }
        result
    }
}
