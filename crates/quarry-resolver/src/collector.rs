//! Transitive dependency collection: depth-first expansion of artifact
//! descriptors under the session's policy hooks, followed by the graph
//! transformation chain.

use std::collections::HashMap;
use std::sync::Arc;

use async_recursion::async_recursion;
use miette::Diagnostic;
use thiserror::Error;

use quarry_core::artifact::{Artifact, ArtifactKey};
use quarry_core::dependency::Dependency;
use quarry_core::descriptor::{
    Descriptor, DescriptorReader, DescriptorRequest, RemoteRepositoryManager,
    VersionRangeRequest, VersionRangeResolver,
};
use quarry_core::error::{DescriptorError, VersionRangeError};
use quarry_core::repository::RemoteRepository;
use quarry_core::session::{
    DependencyManager, DependencySelector, DependencyTraverser, Session,
};
use quarry_core::version::VersionRange;

use crate::conflict::ConflictResolver;
use crate::graph::{
    DataValue, Graph, ManagedBits, NodeId, KEY_CYCLIC_PARENT, KEY_RELOCATED_FROM,
    KEY_VERSION_RANGE,
};
use crate::hooks::{default_selector, ClassicManager, ConstantTraverser, DefaultRemoteRepositoryManager};
use crate::marker::ConflictMarker;
use crate::refiner::ContextRefiner;
use crate::sorter::ConflictIdSorter;
use crate::transformer::{GraphTransformer, TransformContext, TransformError};

/// Config key turning on verbose conflict resolution (losers retained as
/// childless markers).
pub const CONFIG_VERBOSE: &str = "quarry.conflictResolver.verbose";

/// How many relocation hops a single dependency may take before the chain is
/// treated as broken.
const MAX_RELOCATIONS: usize = 5;

/// What to collect: a root (dependency or bare artifact), direct and managed
/// dependencies, and the repositories to resolve against.
#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    pub root: Option<Dependency>,
    pub root_artifact: Option<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    pub request_context: String,
}

impl CollectRequest {
    pub fn for_root(root: Dependency) -> Self {
        Self {
            root: Some(root),
            ..Self::default()
        }
    }

    pub fn for_dependencies(dependencies: Vec<Dependency>) -> Self {
        Self {
            dependencies,
            ..Self::default()
        }
    }

    pub fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn with_managed(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }
}

/// Collection failures. Per-node failures are accumulated in
/// [`CollectResult::errors`]; only root and transformation failures surface
/// as `Err`.
#[derive(Debug, Error, Diagnostic)]
pub enum CollectError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    VersionRange(#[from] VersionRangeError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("relocation chain for {artifact} exceeds {limit} hops")]
    RelocationCycle { artifact: String, limit: usize },
}

/// The collected graph plus everything non-fatal that went wrong on the way.
#[derive(Debug)]
pub struct CollectResult {
    pub graph: Graph,
    pub root: NodeId,
    pub errors: Vec<CollectError>,
    pub request: CollectRequest,
}

/// The dependency collector. Descriptor reading and version enumeration are
/// supplied; traversal policy comes from the session.
pub struct Collector {
    descriptor_reader: Arc<dyn DescriptorReader>,
    version_range_resolver: Arc<dyn VersionRangeResolver>,
    repository_manager: Arc<dyn RemoteRepositoryManager>,
    transformers: Option<Vec<Arc<dyn GraphTransformer>>>,
}

impl Collector {
    pub fn new(
        descriptor_reader: Arc<dyn DescriptorReader>,
        version_range_resolver: Arc<dyn VersionRangeResolver>,
    ) -> Self {
        Self {
            descriptor_reader,
            version_range_resolver,
            repository_manager: DefaultRemoteRepositoryManager::new(),
            transformers: None,
        }
    }

    pub fn with_repository_manager(
        mut self,
        repository_manager: Arc<dyn RemoteRepositoryManager>,
    ) -> Self {
        self.repository_manager = repository_manager;
        self
    }

    /// Replace the transformation chain run after collection. The default is
    /// marker → sorter → conflict resolver → context refiner.
    pub fn with_transformers(mut self, transformers: Vec<Arc<dyn GraphTransformer>>) -> Self {
        self.transformers = Some(transformers);
        self
    }

    /// Build the full dependency graph for `request` and run the
    /// transformation chain over it.
    ///
    /// Fails only when the root itself cannot be resolved or a transformer
    /// aborts; everything else lands in [`CollectResult::errors`].
    pub async fn collect(
        &self,
        session: &Session,
        request: CollectRequest,
    ) -> Result<CollectResult, CollectError> {
        let mut state = CollectState {
            graph: Graph::new(),
            errors: Vec::new(),
            descriptors: HashMap::new(),
        };
        let context = if request.request_context.is_empty() {
            "project".to_string()
        } else {
            request.request_context.clone()
        };

        let mut managed = request.managed_dependencies.clone();
        let mut direct = request.dependencies.clone();
        let mut repositories = request.repositories.clone();
        let mut ancestors: Vec<(ArtifactKey, NodeId)> = Vec::new();

        let root_id = match request.root {
            Some(ref root_dep) => {
                // the root resolves hard: no partial result without it
                let range = self
                    .version_range_resolver
                    .resolve_range(
                        session,
                        &VersionRangeRequest::new(
                            root_dep.artifact.clone(),
                            request.repositories.clone(),
                        ),
                    )
                    .await?;
                let version = range.versions.last().cloned().ok_or_else(|| {
                    VersionRangeError::Empty {
                        artifact: root_dep.artifact.to_string(),
                        range: root_dep.artifact.version.clone(),
                    }
                })?;
                let pinned = Dependency {
                    artifact: root_dep.artifact.clone().with_version(version.raw()),
                    ..root_dep.clone()
                };
                let descriptor = self
                    .descriptor_reader
                    .read_descriptor(
                        session,
                        &DescriptorRequest::new(
                            pinned.artifact.clone(),
                            request.repositories.clone(),
                        ),
                    )
                    .await?;

                managed.extend(descriptor.managed_dependencies.iter().cloned());
                if direct.is_empty() {
                    direct = descriptor.dependencies.clone();
                }
                repositories = self.repository_manager.aggregate_repositories(
                    session,
                    &request.repositories,
                    &descriptor.repositories,
                    true,
                );

                let id = state.graph.add_node(Some(pinned.clone()));
                state.graph.node_mut(id).repositories = repositories.clone();
                state.graph.node_mut(id).request_context = context.clone();
                ancestors.push((pinned.artifact.key(), id));
                id
            }
            None => {
                let id = state.graph.add_node(None);
                state.graph.node_mut(id).repositories = repositories.clone();
                state.graph.node_mut(id).request_context = context.clone();
                if let Some(ref artifact) = request.root_artifact {
                    ancestors.push((artifact.key(), id));
                }
                id
            }
        };

        let traverser: Arc<dyn DependencyTraverser> = match session.traverser.clone() {
            Some(traverser) => traverser,
            None => ConstantTraverser::new(true),
        };
        let selector: Arc<dyn DependencySelector> = match session.selector.clone() {
            Some(selector) => selector,
            None => default_selector(),
        };
        let base_manager: Arc<dyn DependencyManager> = match session.manager.clone() {
            Some(manager) => manager,
            None => ClassicManager::new(),
        };
        let manager = base_manager.derive_child_manager(&managed);

        self.process(
            session,
            &mut state,
            root_id,
            direct,
            repositories,
            selector,
            manager,
            traverser,
            &mut ancestors,
            &context,
        )
        .await;

        let mut graph = state.graph;
        let mut transform_context = TransformContext::default();
        match self.transformers {
            Some(ref chain) => {
                for transformer in chain {
                    transformer.transform(&mut graph, root_id, &mut transform_context)?;
                }
            }
            None => {
                for transformer in default_transformers(session) {
                    transformer.transform(&mut graph, root_id, &mut transform_context)?;
                }
            }
        }

        Ok(CollectResult {
            graph,
            root: root_id,
            errors: state.errors,
            request,
        })
    }

    #[async_recursion]
    #[allow(clippy::too_many_arguments)]
    async fn process(
        &self,
        session: &Session,
        state: &mut CollectState,
        parent: NodeId,
        dependencies: Vec<Dependency>,
        repositories: Vec<RemoteRepository>,
        selector: Arc<dyn DependencySelector>,
        manager: Arc<dyn DependencyManager>,
        traverser: Arc<dyn DependencyTraverser>,
        ancestors: &mut Vec<(ArtifactKey, NodeId)>,
        context: &str,
    ) {
        for declared in dependencies {
            if !selector.select(&declared) {
                continue;
            }

            let mut dep = declared.clone();
            let mut bits = ManagedBits::default();
            let mut premanaged = Premanaged::default();
            if let Some(update) = manager.manage(&dep) {
                if let Some(version) = update.version {
                    premanaged.version = Some(dep.artifact.version.clone());
                    dep.artifact.version = version;
                    bits.insert(ManagedBits::VERSION);
                }
                if let Some(scope) = update.scope {
                    premanaged.scope = Some(dep.scope.clone());
                    dep.scope = scope;
                    bits.insert(ManagedBits::SCOPE);
                }
                if let Some(optional) = update.optional {
                    premanaged.optional = Some(dep.optional);
                    dep.optional = optional;
                    bits.insert(ManagedBits::OPTIONAL);
                }
                if let Some(exclusions) = update.exclusions {
                    premanaged.exclusions = Some(dep.exclusions.clone());
                    dep.exclusions = exclusions;
                    bits.insert(ManagedBits::EXCLUSIONS);
                }
                if let Some(properties) = update.properties {
                    premanaged.properties = Some(dep.artifact.properties.clone());
                    dep.artifact.properties = properties;
                    bits.insert(ManagedBits::PROPERTIES);
                }
            }

            let version_spec = dep.artifact.version.clone();
            let was_range = VersionRange::is_range(&version_spec);
            let mut versions = match self
                .version_range_resolver
                .resolve_range(
                    session,
                    &VersionRangeRequest::new(dep.artifact.clone(), repositories.clone()),
                )
                .await
            {
                Ok(result) => result.versions,
                Err(error) => {
                    state.errors.push(CollectError::VersionRange(error));
                    continue;
                }
            };
            if let Some(ref filter) = session.version_filter {
                filter.filter_versions(&dep, &mut versions);
            }
            if versions.is_empty() {
                state.errors.push(CollectError::VersionRange(VersionRangeError::Empty {
                    artifact: dep.artifact.to_string(),
                    range: version_spec.clone(),
                }));
                continue;
            }

            for version in versions {
                let mut child_dep = dep.clone();
                child_dep.artifact.version = version.raw().to_string();

                // a child matching an ancestor closes a cycle; keep the edge
                // but never expand it
                if let Some(&(_, ancestor)) = ancestors
                    .iter()
                    .find(|(key, _)| *key == child_dep.artifact.key())
                {
                    let leaf = state.graph.add_node(Some(child_dep.clone()));
                    let node = state.graph.node_mut(leaf);
                    node.repositories = repositories.clone();
                    node.request_context = context.to_string();
                    node.managed = bits;
                    premanaged.apply(node);
                    node.data
                        .insert(KEY_CYCLIC_PARENT.to_string(), DataValue::Node(ancestor));
                    state.graph.add_child(parent, leaf);
                    continue;
                }

                let mut relocated_from: Option<Artifact> = None;
                let descriptor = match self
                    .read_with_relocations(session, state, &mut child_dep, &repositories, &mut relocated_from)
                    .await
                {
                    Ok(descriptor) => Some(descriptor),
                    Err(error) => {
                        state.errors.push(error);
                        None
                    }
                };

                if relocated_from.is_some() && !selector.select(&child_dep) {
                    continue;
                }

                let node_id = state.graph.add_node(Some(child_dep.clone()));
                {
                    let node = state.graph.node_mut(node_id);
                    node.request_context = context.to_string();
                    node.managed = bits;
                    premanaged.apply(node);
                    if was_range {
                        node.data.insert(
                            KEY_VERSION_RANGE.to_string(),
                            DataValue::Str(version_spec.clone()),
                        );
                    }
                    if let Some(ref original) = relocated_from {
                        node.data.insert(
                            KEY_RELOCATED_FROM.to_string(),
                            DataValue::Str(original.to_string()),
                        );
                    }
                }
                state.graph.add_child(parent, node_id);

                let Some(descriptor) = descriptor else {
                    // descriptor failure: the node stays as a leaf
                    state.graph.node_mut(node_id).repositories = repositories.clone();
                    continue;
                };

                let child_repositories = self.repository_manager.aggregate_repositories(
                    session,
                    &repositories,
                    &descriptor.repositories,
                    true,
                );
                state.graph.node_mut(node_id).repositories = child_repositories.clone();

                if !traverser.should_traverse(&child_dep) {
                    continue;
                }

                let child_selector = selector.derive_child_selector(&child_dep);
                let child_manager = manager.derive_child_manager(&descriptor.managed_dependencies);
                ancestors.push((child_dep.artifact.key(), node_id));
                self.process(
                    session,
                    state,
                    node_id,
                    descriptor.dependencies.clone(),
                    child_repositories,
                    child_selector,
                    child_manager,
                    traverser.clone(),
                    ancestors,
                    context,
                )
                .await;
                ancestors.pop();
            }
        }
    }

    /// Read the descriptor for `dep`, following relocation redirects. On a
    /// relocation the dependency is rewritten to the target coordinates and
    /// the original ones are reported through `relocated_from`.
    async fn read_with_relocations(
        &self,
        session: &Session,
        state: &mut CollectState,
        dep: &mut Dependency,
        repositories: &[RemoteRepository],
        relocated_from: &mut Option<Artifact>,
    ) -> Result<Descriptor, CollectError> {
        let original = dep.artifact.clone();
        for _ in 0..MAX_RELOCATIONS {
            let descriptor = self
                .read_descriptor_cached(session, state, &dep.artifact, repositories)
                .await?;
            match descriptor.relocation {
                Some(ref target) => {
                    tracing::debug!(from = %dep.artifact, to = %target, "following relocation");
                    *relocated_from = Some(original.clone());
                    dep.artifact = target.clone();
                }
                None => return Ok(descriptor),
            }
        }
        Err(CollectError::RelocationCycle {
            artifact: original.to_string(),
            limit: MAX_RELOCATIONS,
        })
    }

    async fn read_descriptor_cached(
        &self,
        session: &Session,
        state: &mut CollectState,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
    ) -> Result<Descriptor, CollectError> {
        if let Some(descriptor) = state.descriptors.get(artifact) {
            return Ok(descriptor.clone());
        }
        let descriptor = self
            .descriptor_reader
            .read_descriptor(
                session,
                &DescriptorRequest::new(artifact.clone(), repositories.to_vec()),
            )
            .await?;
        state
            .descriptors
            .insert(artifact.clone(), descriptor.clone());
        Ok(descriptor)
    }
}

/// The transformation chain used when the collector was not given one.
pub fn default_transformers(session: &Session) -> Vec<Arc<dyn GraphTransformer>> {
    let verbose = session
        .config
        .get_bool(CONFIG_VERBOSE, None)
        .unwrap_or(false);
    vec![
        Arc::new(ConflictMarker),
        Arc::new(ConflictIdSorter),
        Arc::new(ConflictResolver::standard().verbose(verbose)),
        Arc::new(ContextRefiner),
    ]
}

struct CollectState {
    graph: Graph,
    errors: Vec<CollectError>,
    descriptors: HashMap<Artifact, Descriptor>,
}

#[derive(Default)]
struct Premanaged {
    version: Option<String>,
    scope: Option<String>,
    optional: Option<bool>,
    exclusions: Option<Vec<quarry_core::dependency::Exclusion>>,
    properties: Option<std::collections::BTreeMap<String, String>>,
}

impl Premanaged {
    fn apply(&self, node: &mut crate::graph::Node) {
        node.premanaged_version = self.version.clone();
        node.premanaged_scope = self.scope.clone();
        node.premanaged_optional = self.optional;
        node.premanaged_exclusions = self.exclusions.clone();
        node.premanaged_properties = self.properties.clone();
    }
}
