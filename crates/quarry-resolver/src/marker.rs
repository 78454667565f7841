//! Conflict marking: assign every reachable node its conflict id.

use std::collections::HashMap;

use quarry_core::artifact::ArtifactKey;

use crate::graph::{Graph, NodeId};
use crate::transformer::{ConflictId, GraphTransformer, TransformContext, TransformError};

/// Assigns conflict ids into the transformation context's side table. Two
/// nodes share an id iff they denote the same artifact identity, version
/// ignored. Dependency-less roots get an id of their own.
pub struct ConflictMarker;

impl GraphTransformer for ConflictMarker {
    fn transform(
        &self,
        graph: &mut Graph,
        root: NodeId,
        context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        let mut by_key: HashMap<ArtifactKey, ConflictId> = HashMap::new();
        let mut ids: HashMap<NodeId, ConflictId> = HashMap::new();
        let mut next_id = 0usize;

        for node_id in graph.reachable(root) {
            let id = match graph.node(node_id).key() {
                Some(key) => *by_key.entry(key).or_insert_with(|| {
                    let id = next_id;
                    next_id += 1;
                    id
                }),
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };
            ids.insert(node_id, id);
        }

        tracing::debug!(nodes = ids.len(), groups = next_id, "marked conflict groups");
        context.conflict_ids = Some(ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::artifact::Artifact;
    use quarry_core::dependency::Dependency;

    fn dep(spec: &str) -> Dependency {
        Dependency::new(Artifact::parse(spec).unwrap(), "compile")
    }

    #[test]
    fn same_identity_same_id() {
        let mut g = Graph::new();
        let root = g.add_node(None);
        let x1 = g.add_node(Some(dep("g:x:1.0")));
        let x2 = g.add_node(Some(dep("g:x:2.0")));
        let y = g.add_node(Some(dep("g:y:1.0")));
        g.add_child(root, x1);
        g.add_child(root, y);
        g.add_child(y, x2);

        let mut ctx = TransformContext::default();
        ConflictMarker.transform(&mut g, root, &mut ctx).unwrap();
        let ids = ctx.conflict_ids.unwrap();

        assert_eq!(ids[&x1], ids[&x2]);
        assert_ne!(ids[&x1], ids[&y]);
        assert_ne!(ids[&root], ids[&x1]);
    }

    #[test]
    fn classifier_splits_identity() {
        let mut g = Graph::new();
        let root = g.add_node(None);
        let plain = g.add_node(Some(dep("g:x:1.0")));
        let sources = g.add_node(Some(Dependency::new(
            Artifact::parse("g:x:jar:sources:1.0").unwrap(),
            "compile",
        )));
        g.add_child(root, plain);
        g.add_child(root, sources);

        let mut ctx = TransformContext::default();
        ConflictMarker.transform(&mut g, root, &mut ctx).unwrap();
        let ids = ctx.conflict_ids.unwrap();
        assert_ne!(ids[&plain], ids[&sources]);
    }
}
