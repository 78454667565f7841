//! Topological ordering of conflict ids.
//!
//! The conflict resolver processes groups parents-first, so the sorter turns
//! the node graph into a graph over conflict ids and orders that. Groups that
//! sit on a cycle have no order among themselves; they are reported
//! separately so the resolver can run its cycle flush afterwards.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::algo::condensation;
use petgraph::graph::DiGraph;

use crate::graph::{Graph, NodeId};
use crate::transformer::{ConflictId, GraphTransformer, TransformContext, TransformError};

/// Produces `sorted_conflict_ids` (parents before children, ties broken by
/// smaller node depth then declaration order) and `cyclic_conflict_ids`.
pub struct ConflictIdSorter;

impl GraphTransformer for ConflictIdSorter {
    fn transform(
        &self,
        graph: &mut Graph,
        root: NodeId,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        let conflict_ids = context
            .conflict_ids
            .as_ref()
            .ok_or(TransformError::MissingConflictIds)?;

        // BFS in declaration order: per-id minimum depth, first-seen order,
        // and the edge set between ids.
        let mut rank: HashMap<ConflictId, (usize, usize)> = HashMap::new();
        let mut edges: HashSet<(ConflictId, ConflictId)> = HashSet::new();
        let mut seen_nodes: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        let mut next_order = 0usize;

        queue.push_back((root, 0));
        seen_nodes.insert(root);
        while let Some((node, depth)) = queue.pop_front() {
            let id = conflict_ids[&node];
            let entry = rank.entry(id).or_insert_with(|| {
                let order = next_order;
                next_order += 1;
                (depth, order)
            });
            if depth < entry.0 {
                entry.0 = depth;
            }
            for &child in graph.children(node) {
                let child_id = conflict_ids[&child];
                if child_id != id {
                    edges.insert((id, child_id));
                } else if !seen_nodes.contains(&child) && graph.children(child).is_empty() {
                    // a same-id leaf child closes a self cycle
                    edges.insert((id, id));
                }
                if seen_nodes.insert(child) {
                    queue.push_back((child, depth + 1));
                }
            }
        }

        let mut id_graph: DiGraph<ConflictId, ()> = DiGraph::new();
        let mut indexes = HashMap::new();
        let mut ids: Vec<ConflictId> = rank.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            indexes.insert(*id, id_graph.add_node(*id));
        }
        let self_loops: HashSet<ConflictId> =
            edges.iter().filter(|(a, b)| a == b).map(|(a, _)| *a).collect();
        for (from, to) in &edges {
            if from != to {
                id_graph.add_edge(indexes[from], indexes[to], ());
            }
        }

        // Contract strongly connected components, then order the resulting
        // DAG with the (depth, declaration-order) tie-break.
        let condensed = condensation(id_graph, true);
        let group_rank = |members: &[ConflictId]| {
            members
                .iter()
                .map(|id| rank[id])
                .min()
                .unwrap_or((usize::MAX, usize::MAX))
        };

        let mut indegree: Vec<usize> = vec![0; condensed.node_count()];
        for edge in condensed.raw_edges() {
            indegree[edge.target().index()] += 1;
        }
        let mut ready = BinaryHeap::new();
        for idx in condensed.node_indices() {
            if indegree[idx.index()] == 0 {
                ready.push(Reverse((group_rank(&condensed[idx]), idx)));
            }
        }

        let mut sorted = Vec::with_capacity(rank.len());
        let mut cyclic: Vec<HashSet<ConflictId>> = Vec::new();
        while let Some(Reverse((_, idx))) = ready.pop() {
            let mut members = condensed[idx].clone();
            members.sort_unstable_by_key(|id| rank[id]);
            if members.len() > 1 {
                cyclic.push(members.iter().copied().collect());
            } else if self_loops.contains(&members[0]) {
                cyclic.push(members.iter().copied().collect());
            }
            sorted.extend(members);
            for neighbor in condensed.neighbors(idx) {
                indegree[neighbor.index()] -= 1;
                if indegree[neighbor.index()] == 0 {
                    ready.push(Reverse((group_rank(&condensed[neighbor]), neighbor)));
                }
            }
        }

        tracing::debug!(
            groups = sorted.len(),
            cycles = cyclic.len(),
            "sorted conflict groups"
        );
        context.sorted_conflict_ids = Some(sorted);
        context.cyclic_conflict_ids = Some(cyclic);
        Ok(())
    }
}
