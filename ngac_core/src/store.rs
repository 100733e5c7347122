use crate::graph::PolicyGraph;
use crate::obligations::Obligations;
use crate::prohibitions::Prohibitions;

/// One namespace's complete policy: graph, prohibitions and obligations.
///
/// The three parts are independent documents. References from prohibitions
/// or obligations into the graph are not checked here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyStore {
    graph: PolicyGraph,
    prohibitions: Prohibitions,
    obligations: Obligations,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(graph: PolicyGraph, prohibitions: Prohibitions, obligations: Obligations) -> Self {
        Self {
            graph,
            prohibitions,
            obligations,
        }
    }

    pub fn graph(&self) -> &PolicyGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut PolicyGraph {
        &mut self.graph
    }

    pub fn prohibitions(&self) -> &Prohibitions {
        &self.prohibitions
    }

    pub fn prohibitions_mut(&mut self) -> &mut Prohibitions {
        &mut self.prohibitions
    }

    pub fn obligations(&self) -> &Obligations {
        &self.obligations
    }

    pub fn obligations_mut(&mut self) -> &mut Obligations {
        &mut self.obligations
    }

    /// True when all three sub-documents are empty, i.e. the namespace was
    /// never initialized.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty() && self.prohibitions.is_empty() && self.obligations.is_empty()
    }
}
