//! Dependency resolution - execution order and parallel groups
//!
//! Ordering uses Kahn's algorithm. Whenever several nodes are ready at the
//! same time the lexicographically smallest name goes first, so two runs over
//! the same node set always produce the same order regardless of the order
//! the nodes were declared in.

use crate::error::{Error, Result};
use crate::graph::{NodeKey, ResourceGraph};
use crate::resource::DependencyNode;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Resolves execution order for a set of dependency nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver {
    strict: bool,
}

impl DependencyResolver {
    /// Resolver that lets the last declared producer own a shared output
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Resolver that fails when two nodes declare the same output
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Build the dependency graph according to this resolver's output policy
    pub fn graph<N: DependencyNode>(&self, nodes: &[N]) -> Result<ResourceGraph> {
        if self.strict {
            ResourceGraph::build_strict(nodes)
        } else {
            let graph = ResourceGraph::build(nodes);
            for conflict in graph.conflicts() {
                log::warn!(
                    "Output '{}' is declared by {}; using {}",
                    conflict.output,
                    conflict.producers.join(", "),
                    conflict.owner().unwrap_or("unknown")
                );
            }
            Ok(graph)
        }
    }

    /// Topologically sort the nodes
    ///
    /// The result holds one entry per distinct (kind, name) node, so a
    /// dataset and a recipe sharing a name both appear.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`] naming every node that could not
    /// be ordered when the graph contains a cycle.
    pub fn resolve<N: DependencyNode>(&self, nodes: &[N]) -> Result<Vec<String>> {
        let graph = self.graph(nodes)?;
        let order: Vec<String> = topological_order(&graph)?
            .into_iter()
            .map(|idx| graph.key(idx).name.clone())
            .collect();
        log::debug!("Resolved execution order: {}", order.join(" -> "));
        Ok(order)
    }

    /// Every producer `name` transitively depends on, sorted by name
    ///
    /// Unknown names have no dependencies. Cycles are not an error here;
    /// each producer is visited at most once.
    pub fn dependencies<N: DependencyNode>(&self, name: &str, nodes: &[N]) -> Vec<String> {
        let graph = ResourceGraph::build(nodes);
        let start = graph.indices_named(name);

        let mut visited: HashSet<NodeIndex> = start.iter().copied().collect();
        let mut stack: Vec<NodeIndex> = start.to_vec();
        let mut found: BTreeSet<String> = BTreeSet::new();

        while let Some(idx) = stack.pop() {
            for producer in graph.upstream(idx) {
                if visited.insert(producer) {
                    found.insert(graph.key(producer).name.clone());
                    stack.push(producer);
                }
            }
        }

        found.into_iter().collect()
    }

    /// Partition the resolved order into levels that can run concurrently
    ///
    /// A node's level is one more than the highest level among its
    /// producers, or zero without producers. Groups are returned by
    /// increasing level, each sorted by name.
    ///
    /// # Errors
    ///
    /// Fails exactly like [`resolve`](Self::resolve) when the graph is cyclic.
    pub fn execution_groups<N: DependencyNode>(&self, nodes: &[N]) -> Result<Vec<Vec<String>>> {
        let graph = self.graph(nodes)?;
        let order = topological_order(&graph)?;

        let mut levels: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
        let mut groups: BTreeMap<usize, BTreeSet<&NodeKey>> = BTreeMap::new();

        for idx in order {
            let level = graph
                .upstream(idx)
                .filter_map(|p| levels.get(&p))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            levels.insert(idx, level);
            groups.entry(level).or_default().insert(graph.key(idx));
        }

        let groups: Vec<Vec<String>> = groups
            .into_values()
            .map(|keys| keys.into_iter().map(|k| k.name.clone()).collect())
            .collect();

        log::debug!("Resolved {} execution groups", groups.len());
        Ok(groups)
    }
}

/// Kahn's algorithm with a name-ordered ready set
fn topological_order(graph: &ResourceGraph) -> Result<Vec<NodeIndex>> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .indices()
        .map(|idx| (idx, graph.upstream(idx).count()))
        .collect();

    let mut ready: BTreeMap<&NodeKey, NodeIndex> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&idx, _)| (graph.key(idx), idx))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());

    while let Some((_, idx)) = ready.pop_first() {
        order.push(idx);
        for dependent in graph.downstream(idx) {
            if let Some(deg) = in_degree.get_mut(&dependent) {
                *deg = deg.saturating_sub(1);
                if *deg == 0 {
                    ready.insert(graph.key(dependent), dependent);
                }
            }
        }
    }

    if order.len() < graph.node_count() {
        let done: HashSet<NodeIndex> = order.iter().copied().collect();
        let pending: BTreeSet<&NodeKey> = graph
            .indices()
            .filter(|idx| !done.contains(idx))
            .map(|idx| graph.key(idx))
            .collect();
        let unresolved = pending.into_iter().map(|k| k.name.clone()).collect();
        return Err(Error::CircularDependency { unresolved });
    }

    Ok(order)
}
