//! Undirected hierarchy graphs.
//!
//! The analyzer only needs a handful of operations, collected in
//! [`HierarchyGraph`]; [`PetgraphHierarchy`] implements them on `petgraph`.

use petgraph::algo::{all_simple_paths, astar};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

pub trait HierarchyGraph {
    /// Idempotent.
    fn add_node(&mut self, id: &str);

    /// Adds missing endpoints; a repeated edge is not duplicated.
    fn add_edge(&mut self, a: &str, b: &str);

    fn contains_node(&self, id: &str) -> bool;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    /// Fewest-edges path from `from` to `to`, both ends included.
    /// `None` when either node is missing or they are not connected.
    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>>;

    /// Lazily enumerate simple paths from `from` to `to`. The order is fixed
    /// for a given graph; callers take as many as they can afford.
    fn simple_paths<'a>(&'a self, from: &str, to: &str) -> Box<dyn Iterator<Item = Vec<String>> + 'a>;
}

#[derive(Debug, Clone, Default)]
pub struct PetgraphHierarchy {
    graph: UnGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl PetgraphHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&ix) = self.index.get(id) {
            return ix;
        }
        let ix = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), ix);
        ix
    }

    fn names(&self, path: Vec<NodeIndex>) -> Vec<String> {
        path.into_iter().map(|ix| self.graph[ix].clone()).collect()
    }
}

impl HierarchyGraph for PetgraphHierarchy {
    fn add_node(&mut self, id: &str) {
        self.node(id);
    }

    fn add_edge(&mut self, a: &str, b: &str) {
        let a = self.node(a);
        let b = self.node(b);
        // `update_edge` finds an existing edge in either direction.
        self.graph.update_edge(a, b, ());
    }

    fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let from = *self.index.get(from)?;
        let to = *self.index.get(to)?;
        // Unit edge costs and a zero heuristic: breadth-first optimal.
        let (_, path) = astar(&self.graph, from, |n| n == to, |_| 1usize, |_| 0usize)?;
        Some(self.names(path))
    }

    fn simple_paths<'a>(&'a self, from: &str, to: &str) -> Box<dyn Iterator<Item = Vec<String>> + 'a> {
        match (self.index.get(from), self.index.get(to)) {
            // all_simple_paths would report cycles back to the start here.
            (Some(&from), Some(&to)) if from == to => {
                Box::new(std::iter::once(vec![self.graph[from].clone()]))
            }
            (Some(&from), Some(&to)) => Box::new(
                all_simple_paths::<Vec<NodeIndex>, _>(&self.graph, from, to, 0, None)
                    .map(move |path| self.names(path)),
            ),
            _ => Box::new(std::iter::empty()),
        }
    }
}
