//! Request-context refinement: after conflict resolution every node's
//! context tag reflects the scope it ended up with.

use crate::graph::{Graph, NodeId};
use crate::transformer::{GraphTransformer, TransformContext, TransformError};

/// Rewrites the generic `project` context to `project/<scope>` once scopes
/// are final.
pub struct ContextRefiner;

impl GraphTransformer for ContextRefiner {
    fn transform(
        &self,
        graph: &mut Graph,
        root: NodeId,
        _context: &mut TransformContext,
    ) -> Result<(), TransformError> {
        for id in graph.reachable(root) {
            let node = graph.node(id);
            if node.request_context != "project" {
                continue;
            }
            let scope = node.scope().to_string();
            if !scope.is_empty() {
                graph.node_mut(id).request_context = format!("project/{scope}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::artifact::Artifact;
    use quarry_core::dependency::Dependency;

    #[test]
    fn refines_project_contexts() {
        let mut g = Graph::new();
        let root = g.add_node(None);
        let a = g.add_node(Some(Dependency::new(
            Artifact::new("g", "a", "1.0"),
            "runtime",
        )));
        g.add_child(root, a);

        ContextRefiner
            .transform(&mut g, root, &mut TransformContext::default())
            .unwrap();

        // dependency-less root keeps the bare tag
        assert_eq!(g.node(root).request_context, "project");
        assert_eq!(g.node(a).request_context, "project/runtime");
    }

    #[test]
    fn leaves_custom_contexts_alone() {
        let mut g = Graph::new();
        let root = g.add_node(Some(Dependency::new(
            Artifact::new("g", "r", "1.0"),
            "compile",
        )));
        g.node_mut(root).request_context = "plugin".to_string();

        ContextRefiner
            .transform(&mut g, root, &mut TransformContext::default())
            .unwrap();
        assert_eq!(g.node(root).request_context, "plugin");
    }
}
