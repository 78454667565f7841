//! Graph transformation plumbing: the transformer trait, the typed context
//! the transformers share, and the errors that abort a transformation.

use std::collections::{HashMap, HashSet};

use miette::Diagnostic;
use thiserror::Error;

use crate::graph::{Graph, NodeId};

/// Equivalence-class key over `(group, artifact, classifier, extension)`.
/// Assigned by the conflict marker, consumed by the sorter and resolver.
pub type ConflictId = usize;

/// Shared state of one transformation run. Each transformer reads what its
/// predecessors produced and fills in its own contribution.
#[derive(Debug, Default)]
pub struct TransformContext {
    /// Node → conflict id, for every node reachable from the root.
    pub conflict_ids: Option<HashMap<NodeId, ConflictId>>,
    /// Conflict ids ordered so that an id precedes the ids of its
    /// descendants.
    pub sorted_conflict_ids: Option<Vec<ConflictId>>,
    /// Groups of conflict ids that are mutually cyclic and therefore have no
    /// topological order among themselves.
    pub cyclic_conflict_ids: Option<Vec<HashSet<ConflictId>>>,
}

/// A single transformation pass over the collected graph.
pub trait GraphTransformer: Send + Sync {
    fn transform(
        &self,
        graph: &mut Graph,
        root: NodeId,
        context: &mut TransformContext,
    ) -> Result<(), TransformError>;
}

/// Fatal transformation failures. Unlike collection errors these abort the
/// whole operation; no partial result is returned.
#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    #[error("conflict ids missing from the transformation context")]
    #[diagnostic(help("run the conflict marker before the sorter or resolver"))]
    MissingConflictIds,

    #[error("no winner selected for conflict group {id}")]
    NoWinner { id: ConflictId },

    #[error("version selection failed for conflict group {id}: {message}")]
    VersionSelection { id: ConflictId, message: String },

    #[error("scope selection failed for conflict group {id}: {message}")]
    ScopeSelection { id: ConflictId, message: String },
}
