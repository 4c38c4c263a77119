//! Cycle basis and outer loop of a topology graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument};

use crate::error::LayoutError;
use crate::graph::Graph;
use crate::ordered_set::OrderedSet;

/// Fundamental cycles of `graph`, one spanning tree per component.
///
/// Each component is walked depth-first from its lowest unvisited vertex.
/// A self-loop yields a single-node cycle.
pub fn cycle_basis(graph: &Graph) -> Vec<OrderedSet<usize>> {
    let mut remaining: BTreeSet<usize> = graph.nodes().into_iter().collect();
    let mut cycles = Vec::new();

    while let Some(root) = remaining.pop_first() {
        let mut stack = vec![root];
        let mut pred: HashMap<usize, usize> = HashMap::from([(root, root)]);
        let mut used: HashMap<usize, HashSet<usize>> = HashMap::from([(root, HashSet::new())]);

        while let Some(z) = stack.pop() {
            for nbr in graph.neighbors(z) {
                if !used.contains_key(&nbr) {
                    pred.insert(nbr, z);
                    stack.push(nbr);
                    used.insert(nbr, HashSet::from([z]));
                } else if nbr == z {
                    cycles.push(OrderedSet::from_iter([z]));
                } else if !used.get(&z).is_some_and(|zused| zused.contains(&nbr)) {
                    let pn = used.get(&nbr).cloned().unwrap_or_default();
                    let mut cycle = vec![nbr, z];
                    let mut p = pred.get(&z).copied().unwrap_or(root);
                    while !pn.contains(&p) && p != root {
                        cycle.push(p);
                        p = pred.get(&p).copied().unwrap_or(root);
                    }
                    cycle.push(p);
                    cycles.push(cycle.into_iter().collect());
                    used.entry(nbr).or_default().insert(z);
                }
            }
        }
        for node in pred.keys() {
            remaining.remove(node);
        }
    }
    cycles
}

/// The boundary cycle of `graph`, built by splicing short cycles together.
///
/// Fundamental cycles of a search tree overlap along scattered paths, so
/// the splicing starts from an independent set of shortest cycles instead.
/// On a planar graph those are its inner faces, and splicing neighbouring
/// faces along their shared paths leaves the outer face.
///
/// Fails with [`LayoutError::NoCycle`] on an acyclic graph and with
/// [`LayoutError::InvalidGraph`] when the remaining cycles cannot be
/// spliced, i.e. no two of them meet along a path of two or more nodes.
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn outer_loop(graph: &Graph) -> Result<OrderedSet<usize>, LayoutError> {
    let basis = cycle_basis(graph);
    if basis.is_empty() {
        return Err(LayoutError::NoCycle);
    }
    let rank = basis.iter().filter(|c| c.len() > 1).count();
    let mut cycles = short_cycles(graph, rank);
    cycles.extend(basis.into_iter().filter(|c| c.len() == 1));
    debug!(cycles = cycles.len(), "short cycle basis");

    while cycles.len() > 1 {
        let (i, j, merged) = find_splice(&cycles).ok_or(LayoutError::InvalidGraph)?;
        debug!(c1 = ?cycles[i], c2 = ?cycles[j], ?merged, "spliced cycles");
        cycles.remove(i.max(j));
        cycles.remove(i.min(j));
        cycles.push(merged);
    }
    cycles.pop().ok_or(LayoutError::NoCycle)
}

type Edge = (usize, usize);

fn edge(a: usize, b: usize) -> Edge {
    (a.min(b), a.max(b))
}

fn cycle_edges(cycle: &OrderedSet<usize>) -> BTreeSet<Edge> {
    let n = cycle.len();
    (0..n).map(|i| edge(cycle[i], cycle[(i + 1) % n])).collect()
}

/// Up to `rank` independent cycles, shortest first.
///
/// Every edge is closed against the breadth-first tree of every vertex.
/// A candidate is kept when its edge set is independent, over GF(2), of
/// the ones kept before it.
fn short_cycles(graph: &Graph, rank: usize) -> Vec<OrderedSet<usize>> {
    let edges: Vec<Edge> = graph.edges().into_iter().filter(|(a, b)| a != b).collect();
    let index: HashMap<Edge, usize> = edges.iter().enumerate().map(|(k, &e)| (e, k)).collect();

    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut candidates: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
    for root in graph.nodes() {
        let tree = graph.bfs_tree(root);
        let path_to = |node: usize| {
            let mut path = vec![node];
            let mut cur = node;
            while let Some(&up) = tree.get(&cur) {
                path.push(up);
                cur = up;
            }
            path.reverse();
            path
        };
        let reached = |n: usize| n == root || tree.contains_key(&n);
        for &(x, y) in edges.iter().filter(|&&(x, y)| reached(x) && reached(y)) {
            let (px, py) = (path_to(x), path_to(y));
            let meet = px.iter().filter(|n| py.contains(n)).count();
            if meet != 1 || px.len() + py.len() < 4 {
                continue;
            }
            let nodes: Vec<usize> = px.iter().chain(py[1..].iter().rev()).copied().collect();
            let n = nodes.len();
            let mut ids: Vec<usize> = (0..n)
                .filter_map(|i| index.get(&edge(nodes[i], nodes[(i + 1) % n])).copied())
                .collect();
            ids.sort_unstable();
            if seen.insert(ids.clone()) {
                candidates.push((nodes, ids));
            }
        }
    }
    candidates.sort_by_key(|(nodes, _)| nodes.len());

    let words = edges.len().div_ceil(64);
    let mut rows: Vec<(usize, Vec<u64>)> = Vec::new();
    let mut kept = Vec::with_capacity(rank);
    for (nodes, ids) in candidates {
        if kept.len() == rank {
            break;
        }
        let mut bits = vec![0u64; words];
        for k in ids {
            bits[k / 64] ^= 1 << (k % 64);
        }
        for (pivot, row) in &rows {
            if (bits[pivot / 64] >> (pivot % 64)) & 1 == 1 {
                bits.iter_mut().zip(row).for_each(|(b, r)| *b ^= r);
            }
        }
        let pivot = bits
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize);
        if let Some(pivot) = pivot {
            rows.push((pivot, bits));
            kept.push(nodes.into_iter().collect());
        }
    }
    kept
}

/// The first pair of cycles that splices into a single cycle, trying the
/// most recent cycle first.
fn find_splice(cycles: &[OrderedSet<usize>]) -> Option<(usize, usize, OrderedSet<usize>)> {
    (0..cycles.len()).rev().find_map(|i| {
        (0..cycles.len()).filter(|&j| j != i).find_map(|j| {
            let (c1, c2) = (&cycles[i], &cycles[j]);
            if c1.intersection(c2).len() < 2 {
                return None;
            }
            splice(c1, c2).map(|merged| (i, j, merged))
        })
    })
}

/// Join two cycles along their shared path.
///
/// The result keeps the edges found in exactly one of the two cycles, so
/// only the interior of the shared path drops out. `c1` keeps its direction
/// and `c2` is walked whichever way continues it. `None` when the two do
/// not meet along one path.
fn splice(c1: &OrderedSet<usize>, c2: &OrderedSet<usize>) -> Option<OrderedSet<usize>> {
    let edges: BTreeSet<Edge> = cycle_edges(c1)
        .symmetric_difference(&cycle_edges(c2))
        .copied()
        .collect();
    let mut adjacent: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(a, b) in &edges {
        adjacent.entry(a).or_default().push(b);
        adjacent.entry(b).or_default().push(a);
    }
    if adjacent.is_empty() || adjacent.values().any(|n| n.len() != 2) {
        return None;
    }

    let start = *c1.iter().find(|n| adjacent.contains_key(n))?;
    let at = c1.index_of(&start)?;
    let n = c1.len();
    let around = adjacent.get(&start)?;
    let next = [c1[(at + 1) % n], c1[(at + n - 1) % n]]
        .into_iter()
        .find(|x| around.contains(x))
        .unwrap_or(around[0]);

    let mut walk = vec![start];
    let (mut prev, mut cur) = (start, next);
    while cur != start {
        if walk.len() == adjacent.len() {
            return None;
        }
        walk.push(cur);
        let step = adjacent.get(&cur)?;
        let after = if step[0] == prev { step[1] } else { step[0] };
        (prev, cur) = (cur, after);
    }
    (walk.len() == adjacent.len()).then(|| walk.into_iter().collect())
}
