//! Conflict resolution: reduce the collected graph to a tree with annotated
//! back-edges by selecting one winner per conflict group and deriving
//! effective scopes.
//!
//! Groups are processed in the sorter's parents-first order. For each group
//! the resolver walks the graph, gathers the candidate occurrences into
//! [`ConflictItem`]s, asks the version selector for a winner and the scope
//! selector for the winner's effective scope, then splices the losers out of
//! their parents' child lists (or, in verbose mode, replaces them with
//! childless markers pointing at the winner).
//!
//! The walk keys its bookkeeping on *child-list identity*: two logical nodes
//! sharing one list are deliberately treated as one visit target.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use quarry_core::dependency::scopes;
use quarry_core::version::{Version, VersionRange};

use crate::graph::{
    DataValue, Graph, ListId, NodeId, KEY_CONFLICT_WINNER, KEY_ORIGINAL_SCOPE, KEY_VERSION_RANGE,
};
use crate::sorter::ConflictIdSorter;
use crate::transformer::{ConflictId, GraphTransformer, TransformContext, TransformError};

/// One occurrence of the current conflict group in the graph: the child list
/// it hangs in, the node, its smallest-path depth, and every scope derived
/// for it along distinct paths.
#[derive(Debug, Clone)]
pub struct ConflictItem {
    /// The parent's child list, `None` for the graph root.
    pub parent_list: Option<ListId>,
    pub node: NodeId,
    pub depth: usize,
    pub scopes: Vec<String>,
}

/// What the selectors get to look at when deciding a group.
pub struct ConflictContext<'a> {
    pub graph: &'a Graph,
    pub id: ConflictId,
    pub items: &'a [ConflictItem],
}

/// A selector refused to decide.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SelectorError(pub String);

/// Picks the winning item of a conflict group. Returning `Ok(None)` is a
/// fatal resolution error.
pub trait VersionSelector: Send + Sync {
    fn select_winner(&self, context: &ConflictContext<'_>) -> Result<Option<usize>, SelectorError>;
}

/// Picks the effective scope of the winner, given everything the walk saw.
pub trait ScopeSelector: Send + Sync {
    fn select_scope(
        &self,
        context: &ConflictContext<'_>,
        winner: usize,
    ) -> Result<String, SelectorError>;
}

/// Computes the scope a child takes on underneath a parent with an already
/// derived scope.
pub trait ScopeDeriver: Send + Sync {
    fn derive_scope(&self, parent_scope: &str, child_scope: &str) -> String;
}

/// Smallest depth wins, declaration order breaks ties; hard version ranges
/// declared anywhere on a path constrain the choice.
pub struct NearestVersionSelector;

impl VersionSelector for NearestVersionSelector {
    fn select_winner(&self, context: &ConflictContext<'_>) -> Result<Option<usize>, SelectorError> {
        let items = context.items;
        if items.is_empty() {
            return Ok(None);
        }
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by_key(|&i| (items[i].depth, i));

        let ranges: Vec<VersionRange> = items
            .iter()
            .filter_map(|item| {
                context
                    .graph
                    .node(item.node)
                    .data
                    .get(KEY_VERSION_RANGE)
                    .and_then(DataValue::as_str)
                    .and_then(VersionRange::parse)
            })
            .collect();
        if ranges.is_empty() {
            return Ok(Some(order[0]));
        }

        for &i in &order {
            let node = context.graph.node(items[i].node);
            let version = node
                .dependency
                .as_ref()
                .map(|d| Version::parse(&d.artifact.version));
            if let Some(version) = version {
                if ranges.iter().all(|r| r.contains(&version)) {
                    return Ok(Some(i));
                }
            }
        }
        Err(SelectorError(
            "no candidate version satisfies all declared ranges".to_string(),
        ))
    }
}

/// A direct dependency's declared scope wins outright; otherwise the
/// dominance order `compile > runtime > provided > test` decides, with
/// `system` dropped when several scopes compete.
pub struct DominantScopeSelector;

impl ScopeSelector for DominantScopeSelector {
    fn select_scope(
        &self,
        context: &ConflictContext<'_>,
        winner: usize,
    ) -> Result<String, SelectorError> {
        if let Some(direct) = context.items.iter().find(|item| item.depth <= 1) {
            return Ok(context.graph.node(direct.node).scope().to_string());
        }

        let mut seen: Vec<&str> = Vec::new();
        for item in context.items {
            for scope in &item.scopes {
                if !seen.contains(&scope.as_str()) {
                    seen.push(scope);
                }
            }
        }
        if seen.len() > 1 {
            seen.retain(|s| *s != scopes::SYSTEM);
        }
        for candidate in [scopes::COMPILE, scopes::RUNTIME, scopes::PROVIDED, scopes::TEST] {
            if seen.contains(&candidate) {
                return Ok(candidate.to_string());
            }
        }
        // only custom scopes in play, keep the winner's own
        Ok(context.graph.node(context.items[winner].node).scope().to_string())
    }
}

/// The conventional derivation table. `provided` and `test` children keep
/// their scope; `compile` children take the parent's scope where the parent
/// is weaker than `compile`.
pub struct ClassicScopeDeriver;

impl ScopeDeriver for ClassicScopeDeriver {
    fn derive_scope(&self, parent_scope: &str, child_scope: &str) -> String {
        if child_scope == scopes::SYSTEM
            || child_scope == scopes::PROVIDED
            || child_scope == scopes::TEST
        {
            return child_scope.to_string();
        }
        match parent_scope {
            scopes::RUNTIME => {
                if child_scope == scopes::COMPILE {
                    scopes::RUNTIME.to_string()
                } else {
                    child_scope.to_string()
                }
            }
            scopes::PROVIDED => scopes::PROVIDED.to_string(),
            scopes::TEST => scopes::TEST.to_string(),
            _ => child_scope.to_string(),
        }
    }
}

/// The conflict-resolution transformer. Strategies are supplied at
/// construction; there is no registry.
pub struct ConflictResolver {
    version_selector: Arc<dyn VersionSelector>,
    scope_selector: Arc<dyn ScopeSelector>,
    scope_deriver: Arc<dyn ScopeDeriver>,
    verbose: bool,
}

impl ConflictResolver {
    pub fn new(
        version_selector: Arc<dyn VersionSelector>,
        scope_selector: Arc<dyn ScopeSelector>,
        scope_deriver: Arc<dyn ScopeDeriver>,
    ) -> Self {
        Self {
            version_selector,
            scope_selector,
            scope_deriver,
            verbose: false,
        }
    }

    /// The conventional strategy set.
    pub fn standard() -> Self {
        Self::new(
            Arc::new(NearestVersionSelector),
            Arc::new(DominantScopeSelector),
            Arc::new(ClassicScopeDeriver),
        )
    }

    /// In verbose mode losers are retained as childless markers carrying a
    /// back-reference to the winner.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl GraphTransformer for ConflictResolver {
    fn transform(
        &self,
        graph: &mut Graph,
        root: NodeId,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        let conflict_ids = context
            .conflict_ids
            .clone()
            .ok_or(TransformError::MissingConflictIds)?;
        if context.sorted_conflict_ids.is_none() {
            ConflictIdSorter.transform(graph, root, context)?;
        }
        let sorted = context
            .sorted_conflict_ids
            .clone()
            .ok_or(TransformError::MissingConflictIds)?;
        let cyclic = context.cyclic_conflict_ids.clone().unwrap_or_default();

        let mut state = State {
            conflict_ids,
            current_id: None,
            resolved_ids: HashMap::new(),
            potential_ancestors: HashSet::new(),
            infos: HashMap::new(),
            stack: HashSet::new(),
            items: Vec::new(),
            verbose: self.verbose,
            deriver: self.scope_deriver.clone(),
        };

        let mut last_winner = None;
        for id in sorted {
            state.prepare(Some(id));
            if let Some(group) = cyclic.iter().find(|group| group.contains(&id)) {
                state.potential_ancestors.extend(group.iter().copied());
            }
            state.walk(graph, root);
            state.finish();
            if let Some(winner) = self.resolve_group(graph, id, &mut state)? {
                last_winner = Some(winner);
            }
            state.potential_ancestors.insert(id);
        }

        // cycles can hide stray losers from the ordered walks
        if !cyclic.is_empty() {
            state.prepare(None);
            state.walk(graph, last_winner.unwrap_or(root));
        }

        context.conflict_ids = Some(state.conflict_ids);
        Ok(())
    }
}

impl ConflictResolver {
    fn resolve_group(
        &self,
        graph: &mut Graph,
        id: ConflictId,
        state: &mut State,
    ) -> Result<Option<NodeId>, TransformError> {
        if state.items.is_empty() {
            return Ok(None);
        }

        let (winner_index, effective_scope) = {
            let ctx = ConflictContext {
                graph,
                id,
                items: &state.items,
            };
            let winner_index = self
                .version_selector
                .select_winner(&ctx)
                .map_err(|e| TransformError::VersionSelection {
                    id,
                    message: e.0,
                })?
                .ok_or(TransformError::NoWinner { id })?;
            let effective_scope = self
                .scope_selector
                .select_scope(&ctx, winner_index)
                .map_err(|e| TransformError::ScopeSelection { id, message: e.0 })?;
            (winner_index, effective_scope)
        };

        let winner = state.items[winner_index].node;
        let current_scope = graph.node(winner).scope().to_string();
        if self.verbose {
            graph
                .node_mut(winner)
                .data
                .insert(KEY_ORIGINAL_SCOPE.to_string(), DataValue::Str(current_scope.clone()));
        }
        if effective_scope != current_scope {
            graph.set_scope(winner, &effective_scope);
        }

        state.remove_losers(graph, winner_index, winner);
        state.resolved_ids.insert(id, winner);
        Ok(Some(winner))
    }
}

/// Per-node visit record for one walk: the smallest depth the node was seen
/// at, the derived scopes it was visited with, and the conflict items it
/// parents.
struct NodeInfo {
    min_depth: usize,
    derived_scopes: Vec<String>,
    items: Vec<usize>,
}

impl NodeInfo {
    fn new(depth: usize, scope: String) -> Self {
        Self {
            min_depth: depth,
            derived_scopes: vec![scope],
            items: Vec::new(),
        }
    }

    /// Returns whether the visit contributed anything new.
    fn update(&mut self, depth: usize, scope: &str) -> bool {
        let mut changed = false;
        if depth < self.min_depth {
            self.min_depth = depth;
            changed = true;
        }
        if !self.derived_scopes.iter().any(|s| s == scope) {
            self.derived_scopes.push(scope.to_string());
            changed = true;
        }
        changed
    }
}

struct State {
    conflict_ids: HashMap<NodeId, ConflictId>,
    current_id: Option<ConflictId>,
    /// Already-decided group → winner, used to cull stray leftovers.
    resolved_ids: HashMap<ConflictId, NodeId>,
    /// Groups whose nodes may still be ancestors of current-group nodes.
    potential_ancestors: HashSet<ConflictId>,
    infos: HashMap<ListId, NodeInfo>,
    stack: HashSet<ListId>,
    items: Vec<ConflictItem>,
    verbose: bool,
    deriver: Arc<dyn ScopeDeriver>,
}

impl State {
    fn prepare(&mut self, id: Option<ConflictId>) {
        self.current_id = id;
        self.infos.clear();
        self.stack.clear();
        self.items.clear();
        if id.is_none() {
            // cycle flush sees everything
            self.potential_ancestors
                .extend(self.conflict_ids.values().copied());
        }
    }

    fn walk(&mut self, graph: &mut Graph, start: NodeId) {
        let start_scope = graph.node(start).scope().to_string();
        if self.current_id.is_some() && self.conflict_ids.get(&start).copied() == self.current_id {
            self.items.push(ConflictItem {
                parent_list: None,
                node: start,
                depth: 0,
                scopes: vec![start_scope],
            });
            return;
        }
        let list = graph.node(start).children;
        self.infos.insert(list, NodeInfo::new(0, start_scope.clone()));
        self.stack.insert(list);
        self.visit_children(graph, start, 1, &start_scope);
        self.stack.remove(&list);
    }

    fn visit_children(
        &mut self,
        graph: &mut Graph,
        parent: NodeId,
        depth: usize,
        parent_scope: &str,
    ) {
        let parent_list = graph.node(parent).children;
        let mut index = 0;
        while index < graph.list(parent_list).len() {
            let child = graph.list(parent_list)[index];
            let child_id = self.conflict_ids[&child];
            let child_scope = graph.node(child).scope().to_string();

            if Some(child_id) == self.current_id {
                let derived = self.deriver.derive_scope(parent_scope, &child_scope);
                self.add_item(parent_list, child, depth, derived);
                index += 1;
                continue;
            }

            if let Some(&winner) = self.resolved_ids.get(&child_id) {
                if winner != child
                    && !graph.node(child).data.contains_key(KEY_CONFLICT_WINNER)
                {
                    // stray loser left over from an earlier round
                    if self.verbose {
                        let marker = clone_as_loser(graph, child, winner);
                        self.conflict_ids.insert(marker, child_id);
                        graph.list_mut(parent_list)[index] = marker;
                        index += 1;
                    } else {
                        graph.list_mut(parent_list).remove(index);
                    }
                    continue;
                }
            }

            if !self.potential_ancestors.contains(&child_id) {
                index += 1;
                continue;
            }

            let child_list = graph.node(child).children;
            if self.stack.contains(&child_list) {
                // cycle; the list is already being visited higher up
                index += 1;
                continue;
            }

            let derived = self.deriver.derive_scope(parent_scope, &child_scope);
            let updated_items = match self.infos.get_mut(&child_list) {
                None => {
                    self.infos.insert(child_list, NodeInfo::new(depth, derived.clone()));
                    Some(Vec::new())
                }
                Some(info) => {
                    if info.update(depth, &derived) {
                        Some(info.items.clone())
                    } else {
                        None
                    }
                }
            };
            let recurse = match updated_items {
                Some(indexes) => {
                    self.rederive_item_scopes(graph, &indexes, &derived);
                    true
                }
                None => false,
            };
            if recurse {
                self.stack.insert(child_list);
                self.visit_children(graph, child, depth + 1, &derived);
                self.stack.remove(&child_list);
            }
            index += 1;
        }
    }

    /// Record an occurrence of the current group, merging with an earlier
    /// record of the same node under the same parent list. A node's info is
    /// keyed by its own child list, which for the parent of this item is
    /// exactly `parent_list`.
    fn add_item(&mut self, parent_list: ListId, node: NodeId, depth: usize, derived: String) {
        let existing = self.infos.get(&parent_list).and_then(|info| {
            info.items
                .iter()
                .copied()
                .find(|&i| self.items[i].node == node)
        });
        match existing {
            Some(i) => {
                let item = &mut self.items[i];
                if depth < item.depth {
                    item.depth = depth;
                }
                if !item.scopes.iter().any(|s| *s == derived) {
                    item.scopes.push(derived);
                }
            }
            None => {
                let index = self.items.len();
                self.items.push(ConflictItem {
                    parent_list: Some(parent_list),
                    node,
                    depth,
                    scopes: vec![derived],
                });
                if let Some(info) = self.infos.get_mut(&parent_list) {
                    info.items.push(index);
                }
            }
        }
    }

    fn rederive_item_scopes(&mut self, graph: &Graph, indexes: &[usize], parent_scope: &str) {
        for &i in indexes {
            let declared = graph.node(self.items[i].node).scope().to_string();
            let derived = self.deriver.derive_scope(parent_scope, &declared);
            let item = &mut self.items[i];
            if !item.scopes.iter().any(|s| *s == derived) {
                item.scopes.push(derived);
            }
        }
    }

    /// Canonicalize item depths against the final minimum depth of their
    /// parents. Items were recorded in insertion order; walk them backwards.
    fn finish(&mut self) {
        for i in (0..self.items.len()).rev() {
            if let Some(parent_list) = self.items[i].parent_list {
                if let Some(info) = self.infos.get(&parent_list) {
                    self.items[i].depth = info.min_depth + 1;
                }
            }
        }
    }

    fn remove_losers(&mut self, graph: &mut Graph, winner_index: usize, winner: NodeId) {
        let current_id = self.current_id.unwrap_or_default();
        for i in 0..self.items.len() {
            if i == winner_index || self.items[i].node == winner {
                continue;
            }
            let loser = self.items[i].node;
            let Some(parent_list) = self.items[i].parent_list else {
                continue;
            };
            let Some(position) = graph.list(parent_list).iter().position(|&n| n == loser) else {
                continue;
            };
            if self.verbose {
                let marker = clone_as_loser(graph, loser, winner);
                self.conflict_ids.insert(marker, current_id);
                graph.list_mut(parent_list)[position] = marker;
            } else {
                graph.list_mut(parent_list).remove(position);
            }
        }
    }
}

/// Allocate a childless copy of `loser` whose data points back at `winner`.
fn clone_as_loser(graph: &mut Graph, loser: NodeId, winner: NodeId) -> NodeId {
    let source = graph.node(loser).clone();
    let marker = graph.add_node(source.dependency);
    let node = graph.node_mut(marker);
    node.repositories = source.repositories;
    node.managed = source.managed;
    node.premanaged_version = source.premanaged_version;
    node.premanaged_scope = source.premanaged_scope;
    node.premanaged_optional = source.premanaged_optional;
    node.premanaged_exclusions = source.premanaged_exclusions;
    node.premanaged_properties = source.premanaged_properties;
    node.request_context = source.request_context;
    node.data = source.data;
    node.data
        .insert(KEY_CONFLICT_WINNER.to_string(), DataValue::Node(winner));
    marker
}
