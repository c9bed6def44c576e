//! Dependency graph built from producer/consumer relationships
//!
//! An edge `producer -> consumer` exists when the consumer declares as an
//! input a name that the producer declares as an output. References to
//! names nobody produces are tolerated and simply create no edge.
//!
//! Names are only unique within a kind, so nodes are keyed by kind and name.

use crate::error::{Error, Result};
use crate::resource::DependencyNode;
use crate::types::ResourceKind;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An output name claimed by more than one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    pub output: String,
    /// Claimants in declaration order; the last one owns the output
    pub producers: Vec<String>,
}

impl OutputConflict {
    /// The producer that won the claim
    pub fn owner(&self) -> Option<&str> {
        self.producers.last().map(String::as_str)
    }
}

/// Identity of a graph node
///
/// Orders by name first, so ready sets and groups sort lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub name: String,
    pub kind: ResourceKind,
}

impl NodeKey {
    fn of<N: DependencyNode>(node: &N) -> Self {
        Self {
            name: node.name().to_string(),
            kind: node.kind(),
        }
    }
}

/// Directed graph over resources
///
/// Owned by a single resolution call; nothing here is shared or cached.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: DiGraph<NodeKey, ()>,
    index_map: HashMap<NodeKey, NodeIndex>,
    /// name -> every node carrying it, one per kind at most
    by_name: BTreeMap<String, Vec<NodeIndex>>,
    /// output name -> owning producer
    producers: HashMap<String, NodeIndex>,
    conflicts: Vec<OutputConflict>,
}

impl ResourceGraph {
    /// Build a graph, resolving duplicate output claims by last writer wins
    pub fn build<N: DependencyNode>(nodes: &[N]) -> Self {
        let mut graph = Self::default();
        let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for node in nodes {
            let idx = graph.add_node(NodeKey::of(node));
            for output in node.outputs() {
                graph.producers.insert(output.clone(), idx);
                let claimants = claims.entry(output.clone()).or_default();
                if !claimants.iter().any(|c| c == node.name()) {
                    claimants.push(node.name().to_string());
                }
            }
        }

        graph.conflicts = claims
            .into_iter()
            .filter(|(_, producers)| producers.len() > 1)
            .map(|(output, producers)| OutputConflict { output, producers })
            .collect();

        for node in nodes {
            let Some(&consumer) = graph.index_map.get(&NodeKey::of(node)) else {
                continue;
            };
            for input in node.inputs() {
                let Some(&producer) = graph.producers.get(input) else {
                    continue;
                };
                if producer != consumer {
                    graph.graph.update_edge(producer, consumer, ());
                }
            }
        }

        log::trace!(
            "Built graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    /// Build a graph, rejecting any output claimed by more than one node
    pub fn build_strict<N: DependencyNode>(nodes: &[N]) -> Result<Self> {
        let graph = Self::build(nodes);
        if let Some(conflict) = graph.conflicts.first() {
            return Err(Error::DuplicateOutput {
                output: conflict.output.clone(),
                producers: conflict.producers.clone(),
            });
        }
        Ok(graph)
    }

    fn add_node(&mut self, key: NodeKey) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.by_name.entry(key.name.clone()).or_default().push(idx);
        self.index_map.insert(key, idx);
        idx
    }

    /// Distinct node names, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of nodes, counting a name once per kind
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The node that owns an output name
    pub fn producer_of(&self, output: &str) -> Option<&str> {
        self.producers.get(output).map(|&idx| self.graph[idx].name.as_str())
    }

    /// Direct consumers of a node, sorted
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.neighbor_names(name, Direction::Outgoing)
    }

    /// Direct producers a node reads from, sorted
    pub fn producers(&self, name: &str) -> Vec<&str> {
        self.neighbor_names(name, Direction::Incoming)
    }

    /// Number of distinct producers a node waits on
    pub fn in_degree(&self, name: &str) -> usize {
        self.producers(name).len()
    }

    /// Outputs claimed by more than one node, sorted by output name
    pub fn conflicts(&self) -> &[OutputConflict] {
        &self.conflicts
    }

    fn neighbor_names(&self, name: &str, direction: Direction) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .indices_named(name)
            .iter()
            .flat_map(|&idx| self.graph.neighbors_directed(idx, direction))
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.into_iter().collect()
    }

    // ------------------------------------------------------------------------
    // Index-level access for the resolver
    // ------------------------------------------------------------------------

    pub(crate) fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub(crate) fn indices_named(&self, name: &str) -> &[NodeIndex] {
        self.by_name.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn key(&self, idx: NodeIndex) -> &NodeKey {
        &self.graph[idx]
    }

    pub(crate) fn upstream(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub(crate) fn downstream(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }
}
