use std::collections::HashMap;

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::{Bfs, NodeFiltered};

/// Undirected simple graph over joint indices.
///
/// Parallel edges collapse into one. Neighbors come back in the order their
/// edges were first added, which keeps cycle search deterministic.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: UnGraphMap<usize, ()>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    pub fn add_node(&mut self, node: usize) {
        self.inner.add_node(node);
    }

    pub fn add_edge(&mut self, a: usize, b: usize) {
        if !self.inner.contains_edge(a, b) {
            self.inner.add_edge(a, b, ());
        }
    }

    /// Vertices in ascending order.
    pub fn nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self.inner.nodes().collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn contains_node(&self, node: usize) -> bool {
        self.inner.contains_node(node)
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.inner.contains_edge(a, b)
    }

    /// Edges in insertion order, each with its smaller endpoint first.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.inner.all_edges().map(|(a, b, _)| (a, b)).collect()
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.inner.neighbors(node)
    }

    pub fn degree(&self, node: usize) -> usize {
        self.inner.neighbors(node).count()
    }

    /// Shortest path from `start` through nodes accepted by `passable`,
    /// ending at the first node accepted by `goal`.
    ///
    /// The returned path starts with `start` and ends with the goal node.
    pub fn shortest_path<P, G>(&self, start: usize, passable: P, goal: G) -> Option<Vec<usize>>
    where
        P: Fn(usize) -> bool,
        G: Fn(usize) -> bool,
    {
        let reachable = |n: usize| n == start || passable(n) || goal(n);
        let filtered = NodeFiltered::from_fn(&self.inner, reachable);
        let mut bfs = Bfs::new(&filtered, start);
        let mut order: HashMap<usize, usize> = HashMap::new();
        while let Some(node) = bfs.next(&filtered) {
            order.insert(node, order.len());
            if node != start && goal(node) {
                return Some(self.trace_back(node, &order));
            }
        }
        None
    }

    /// Breadth-first tree rooted at `root`: each reachable node other than
    /// the root mapped to the node that discovered it.
    pub fn bfs_tree(&self, root: usize) -> HashMap<usize, usize> {
        let mut order: HashMap<usize, usize> = HashMap::new();
        let mut bfs = Bfs::new(&self.inner, root);
        while let Some(node) = bfs.next(&self.inner) {
            order.insert(node, order.len());
        }
        order
            .keys()
            .filter(|&&n| n != root)
            .filter_map(|&n| self.discovered_by(n, &order).map(|p| (n, p)))
            .collect()
    }

    /// The earliest visited neighbor of `node`, which is the one that
    /// discovered it in a breadth-first walk.
    fn discovered_by(&self, node: usize, order: &HashMap<usize, usize>) -> Option<usize> {
        self.neighbors(node)
            .filter_map(|m| order.get(&m).map(|&k| (k, m)))
            .filter(|&(k, _)| order.get(&node).is_some_and(|&own| k < own))
            .min()
            .map(|(_, m)| m)
    }

    fn trace_back(&self, end: usize, order: &HashMap<usize, usize>) -> Vec<usize> {
        let mut path = vec![end];
        let mut cur = end;
        while let Some(prev) = self.discovered_by(cur, order) {
            path.push(prev);
            cur = prev;
        }
        path.reverse();
        path
    }
}
