//! Inheritance graph.
//!
//! Uses `petgraph::DiGraph` with one node per class and an edge from each
//! parent to each child. Cycle detection runs Tarjan's SCC algorithm; the
//! parents-before-children order is a topological sort of the same graph.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use decaf_core::ClassId;

/// Parent/child edges between classes.
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    graph: DiGraph<ClassId, ()>,
}

impl InheritanceGraph {
    /// Build the graph from `(class, parent)` pairs given in class id order.
    ///
    /// Class ids must be dense (`0..n`); node `i` is class `i`.
    pub fn new(links: &[(ClassId, Option<ClassId>)]) -> Self {
        let mut graph = DiGraph::with_capacity(links.len(), links.len());
        for &(class, _) in links {
            graph.add_node(class);
        }
        for &(class, parent) in links {
            if let Some(parent) = parent {
                graph.add_edge(
                    NodeIndex::new(parent.index()),
                    NodeIndex::new(class.index()),
                    (),
                );
            }
        }
        Self { graph }
    }

    pub fn class_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Every inheritance cycle, each listed as the classes on it.
    ///
    /// Members of each cycle are sorted by id, and cycles are ordered by
    /// their lowest id, so the report order follows declaration order.
    pub fn cycles(&self) -> Vec<Vec<ClassId>> {
        let mut cycles: Vec<Vec<ClassId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut classes: Vec<ClassId> =
                    component.into_iter().map(|n| self.graph[n]).collect();
                classes.sort();
                classes
            })
            .collect();
        cycles.sort();
        if !cycles.is_empty() {
            log::debug!("inheritance graph has {} cycle(s)", cycles.len());
        }
        cycles
    }

    /// Classes ordered so every parent precedes its children.
    ///
    /// Returns `None` if the graph has a cycle.
    pub fn parents_first(&self) -> Option<Vec<ClassId>> {
        toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|n| self.graph[n]).collect())
    }
}
