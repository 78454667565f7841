//! The session: configuration, graph-building policy hooks, and a typed
//! data map shared by all components driven by one caller.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::config::ConfigMap;
use crate::dependency::{Dependency, Exclusion};
use crate::version::Version;

/// Decides whether the children of a node should be expanded at all. A node
/// whose dependency is rejected is still added to the graph, as a leaf.
pub trait DependencyTraverser: Send + Sync {
    fn should_traverse(&self, dependency: &Dependency) -> bool;
}

/// Per-child filter: rejected dependencies are skipped entirely.
///
/// Selectors are derived as the collector descends, so path-dependent policy
/// (exclusions, transitive-scope gating) lives in the derived instances.
pub trait DependencySelector: Send + Sync {
    fn select(&self, dependency: &Dependency) -> bool;

    /// The selector applied to children of the node declaring `parent`.
    fn derive_child_selector(&self, parent: &Dependency) -> Arc<dyn DependencySelector>;
}

/// What dependency management changed about a dependency. `None` fields were
/// left alone; the graph records the pre-management values of the rest.
#[derive(Debug, Clone, Default)]
pub struct ManagementUpdate {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub exclusions: Option<Vec<Exclusion>>,
    pub properties: Option<BTreeMap<String, String>>,
}

impl ManagementUpdate {
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.optional.is_none()
            && self.exclusions.is_none()
            && self.properties.is_none()
    }
}

/// Applies dependency management declared by ancestors to a child dependency.
pub trait DependencyManager: Send + Sync {
    fn manage(&self, dependency: &Dependency) -> Option<ManagementUpdate>;

    /// The manager applied one level further down, with `managed` being the
    /// management section of the descriptor just read.
    fn derive_child_manager(&self, managed: &[Dependency]) -> Arc<dyn DependencyManager>;
}

/// Filters the candidate versions a range expanded to, e.g. to drop
/// snapshots.
pub trait VersionFilter: Send + Sync {
    fn filter_versions(&self, dependency: &Dependency, candidates: &mut Vec<Version>);
}

/// Per-invocation bundle of configuration and policy.
///
/// Sessions are cheap to clone; the config map is cloned by value while the
/// hook objects and the data map are shared.
#[derive(Clone, Default)]
pub struct Session {
    pub config: ConfigMap,
    pub traverser: Option<Arc<dyn DependencyTraverser>>,
    pub selector: Option<Arc<dyn DependencySelector>>,
    pub manager: Option<Arc<dyn DependencyManager>>,
    pub version_filter: Option<Arc<dyn VersionFilter>>,
    data: SessionData,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session-scoped typed data map. Components use this to share state
    /// tied to the session's lifetime, keyed by type.
    pub fn data(&self) -> &SessionData {
        &self.data
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("traverser", &self.traverser.is_some())
            .field("selector", &self.selector.is_some())
            .field("manager", &self.manager.is_some())
            .field("version_filter", &self.version_filter.is_some())
            .finish()
    }
}

/// Type-keyed map of session-scoped singletons.
///
/// Install is serialized by the map's write lock so concurrent first use
/// cannot double-initialize; reads after install take the read path only.
#[derive(Clone, Default)]
pub struct SessionData {
    entries: Arc<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl SessionData {
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let entries = self.entries.read().ok()?;
        entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|any| any.downcast::<T>().ok())
    }

    /// Fetch the `T` singleton, creating it with `init` on first use.
    pub fn get_or_insert_with<T, F>(&self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // re-check under the write lock
        if let Some(existing) = entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|any| any.downcast::<T>().ok())
        {
            return existing;
        }
        let value = Arc::new(init());
        entries.insert(TypeId::of::<T>(), value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_map_initializes_once() {
        let session = Session::new();
        let first = session.data().get_or_insert_with(|| 7u32);
        let second = session.data().get_or_insert_with(|| 8u32);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 7);
    }

    #[test]
    fn data_map_shared_across_clones() {
        let session = Session::new();
        let cloned = session.clone();
        session.data().get_or_insert_with(|| 42u32);
        assert_eq!(cloned.data().get::<u32>().as_deref(), Some(&42));
    }
}
