//! Topology layout for mechanism graphs.
//!
//! Nodes are joint indices and edges join joints sharing a link. The outer
//! loop of the graph is found by splicing its short cycles together along
//! shared paths and then laid out on a circle, with the rest of the graph
//! filled in around it.

pub mod cycles;
pub mod error;
pub mod graph;
pub mod ordered_set;
pub mod placement;

pub use cycles::{cycle_basis, outer_loop};
pub use error::{LayoutError, OrderedSetError};
pub use graph::Graph;
pub use ordered_set::{Cursor, OrderedSet};
pub use placement::{LayoutConfig, Positions, layout_outer_loop, outer_loop_layout};
