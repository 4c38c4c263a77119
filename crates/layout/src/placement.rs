//! Circular layout of a topology graph around its outer loop.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::cycles::outer_loop;
use crate::error::LayoutError;
use crate::graph::Graph;

/// Node (or edge) index to layout coordinate.
pub type Positions = BTreeMap<usize, (f64, f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Radius of the circle carrying the outer loop.
    pub radius: f64,
    /// Factor applied to every output coordinate.
    pub scale: f64,
    /// Report node positions. When off, edge midpoints keyed by edge index
    /// are reported instead.
    pub node_mode: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            scale: 1.0,
            node_mode: true,
        }
    }
}

/// Lay out `graph` with its outer loop on a circle.
///
/// The outer loop starts at the bottom of the circle and runs clockwise.
/// Remaining nodes are placed on straight lines between already placed
/// nodes; chains hanging off a single placed node point toward the centre.
#[instrument(skip_all, fields(nodes = graph.node_count(), node_mode = config.node_mode))]
pub fn outer_loop_layout(graph: &Graph, config: &LayoutConfig) -> Result<Positions, LayoutError> {
    let outer = outer_loop(graph)?;
    let mut pos: HashMap<usize, (f64, f64)> = HashMap::with_capacity(graph.node_count());

    let n = outer.len() as f64;
    let mut cursor = outer.cursor();
    let mut i = 0usize;
    while let Some(&node) = cursor.advance(&outer)? {
        let angle = -FRAC_PI_2 - TAU * i as f64 / n;
        let (sin, cos) = angle.sin_cos();
        pos.insert(node, (config.radius * cos, config.radius * sin));
        i += 1;
    }

    while let Some(line) = find_line(graph, &pos) {
        place_line(&line, &mut pos);
    }
    while let Some((anchor, chain)) = find_chain(graph, &pos) {
        place_chain(anchor, &chain, &mut pos);
    }
    place_detached(graph, &mut pos, config.radius);

    let scaled = |(x, y): (f64, f64)| (x * config.scale, y * config.scale);
    let out: Positions = if config.node_mode {
        pos.into_iter().map(|(k, p)| (k, scaled(p))).collect()
    } else {
        graph
            .edges()
            .into_iter()
            .enumerate()
            .map(|(k, (a, b))| {
                let (pa, pb) = (pos[&a], pos[&b]);
                (k, scaled(((pa.0 + pb.0) / 2.0, (pa.1 + pb.1) / 2.0)))
            })
            .collect()
    };
    info!(outer = outer.len(), placed = out.len(), "layout finished");
    Ok(out)
}

/// Same as [`outer_loop_layout`].
pub fn layout_outer_loop(graph: &Graph, config: &LayoutConfig) -> Result<Positions, LayoutError> {
    outer_loop_layout(graph, config)
}

/// A path of unplaced nodes whose two ends are distinct placed nodes.
fn find_line(graph: &Graph, pos: &HashMap<usize, (f64, f64)>) -> Option<Vec<usize>> {
    let placed = |n: usize| pos.contains_key(&n);
    for start in graph.nodes().into_iter().filter(|&s| placed(s)) {
        for first in graph.neighbors(start).filter(|&t| !placed(t)) {
            let rest = graph.shortest_path(first, |n| !placed(n), |n| placed(n) && n != start);
            if let Some(rest) = rest {
                let mut line = Vec::with_capacity(rest.len() + 1);
                line.push(start);
                line.extend(rest);
                return Some(line);
            }
        }
    }
    None
}

fn place_line(line: &[usize], pos: &mut HashMap<usize, (f64, f64)>) {
    let (Some(&from), Some(&to)) = (line.first(), line.last()) else {
        return;
    };
    let (a, b) = (pos[&from], pos[&to]);
    let steps = (line.len() - 1) as f64;
    for (k, &node) in line.iter().enumerate().take(line.len() - 1).skip(1) {
        let t = k as f64 / steps;
        pos.insert(node, (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
    }
    debug!(?line, "placed line");
}

/// Unplaced nodes reachable from a placed anchor, breadth first.
fn find_chain(graph: &Graph, pos: &HashMap<usize, (f64, f64)>) -> Option<(usize, Vec<usize>)> {
    let placed = |n: usize| pos.contains_key(&n);
    let anchor = graph
        .nodes()
        .into_iter()
        .find(|&s| placed(s) && graph.neighbors(s).any(|t| !placed(t)))?;

    let mut seen: HashSet<usize> = HashSet::new();
    let mut chain = Vec::new();
    let mut queue: VecDeque<usize> = graph.neighbors(anchor).filter(|&t| !placed(t)).collect();
    seen.extend(queue.iter().copied());
    while let Some(node) = queue.pop_front() {
        chain.push(node);
        for next in graph.neighbors(node) {
            if !placed(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    Some((anchor, chain))
}

fn place_chain(anchor: usize, chain: &[usize], pos: &mut HashMap<usize, (f64, f64)>) {
    let a = pos[&anchor];
    let count = chain.len() as f64 + 1.0;
    for (k, &node) in chain.iter().enumerate() {
        let t = 1.0 - (k as f64 + 1.0) / count;
        pos.insert(node, (a.0 * t, a.1 * t));
    }
    debug!(anchor, ?chain, "placed chain toward centre");
}

/// Nodes with no path to the outer loop go on an inner circle.
fn place_detached(graph: &Graph, pos: &mut HashMap<usize, (f64, f64)>, radius: f64) {
    let detached: Vec<usize> = graph
        .nodes()
        .into_iter()
        .filter(|n| !pos.contains_key(n))
        .collect();
    if detached.is_empty() {
        return;
    }
    let r = radius / 2.0;
    let n = detached.len() as f64;
    for (i, node) in detached.iter().enumerate() {
        let (sin, cos) = (-FRAC_PI_2 - TAU * i as f64 / n).sin_cos();
        pos.insert(*node, (r * cos, r * sin));
    }
    debug!(?detached, "placed detached nodes");
}
