//! Numeric sketch solver for planar linkages.
//!
//! A sketch is a flat parameter vector of point coordinates plus a list of
//! residual-producing constraints. [`solve_sketch`] drives all residuals to
//! zero with a damped Gauss-Newton (Levenberg-Marquardt) iteration. The
//! linkage kernel uses it for joints that its closed-form pass cannot place.

pub mod constraint;
pub mod sketch;
pub mod solver;

pub use constraint::{Constraint, EntityIndex, SketchEntity};
pub use sketch::Sketch;
pub use solver::{SolverConfig, SolverError, SolverResult, solve_sketch};
