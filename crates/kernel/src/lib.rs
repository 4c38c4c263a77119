//! Position analysis for planar linkages.
//!
//! A mechanism is a list of [`Joint`]s connected by named links. The
//! synthesizer turns its topology into an [`ExpressionStack`] of closed-form
//! construction steps; solving replays that stack for a set of input angles
//! and hands whatever it cannot reach to a [`FallbackSolver`]. Mechanisms
//! can also be read from and written as PMKS expressions ([`Mechanism`]).

pub mod collect;
pub mod dof;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod fallback;
pub mod geometry;
pub mod model;
pub mod parse;
pub mod solve;
pub mod sweep;
pub mod synthesis;

pub use collect::{Binding, Bindings, DataDict, Value, collect_data, pair_key};
pub use dof::compute_dof;
pub use error::SolveError;
pub use evaluate::evaluate_stack;
pub use expression::{Expr, ExpressionStack, Symbol};
pub use fallback::{FallbackSolver, KnownValues, SketchFallback};
pub use geometry::Coord;
pub use model::{GROUND, Joint, JointKind, Link, link_edges, links_of, normalize_sliders};
pub use parse::{Mechanism, mechanism_expr, parse_mechanism};
pub use solve::{SolvedPosition, solve, solve_with};
pub use sweep::{angle_samples, sweep, sweep_with};
pub use synthesis::{synthesize, synthesize_with_status};
