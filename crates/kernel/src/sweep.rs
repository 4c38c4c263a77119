//! Batch solving over input samples.
//!
//! Every sample is an independent solve. With the `parallel` feature the
//! samples are spread over the rayon pool; results keep sample order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::collect::Bindings;
use crate::error::SolveError;
use crate::expression::ExpressionStack;
use crate::fallback::{FallbackSolver, SketchFallback};
use crate::model::Joint;
use crate::solve::{SolvedPosition, solve_with};

pub type SweepResult = Result<Vec<SolvedPosition>, SolveError>;

/// Solve once per row of `samples` (input angles in degrees).
pub fn sweep(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
    samples: &[Vec<f64>],
) -> Vec<SweepResult> {
    sweep_with(stack, bindings, joints, samples, &SketchFallback::default())
}

#[cfg(not(feature = "parallel"))]
#[instrument(skip_all, fields(samples = samples.len()))]
pub fn sweep_with<F: FallbackSolver + Sync>(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
    samples: &[Vec<f64>],
    fallback: &F,
) -> Vec<SweepResult> {
    debug!("serial sweep");
    samples
        .iter()
        .map(|angles| solve_with(stack, bindings, joints, angles, fallback))
        .collect()
}

#[cfg(feature = "parallel")]
#[instrument(skip_all, fields(samples = samples.len()))]
pub fn sweep_with<F: FallbackSolver + Sync>(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
    samples: &[Vec<f64>],
    fallback: &F,
) -> Vec<SweepResult> {
    debug!("parallel sweep");
    samples
        .par_iter()
        .map(|angles| solve_with(stack, bindings, joints, angles, fallback))
        .collect()
}

/// Evenly spaced single-input samples from `start` to `end` inclusive.
pub fn angle_samples(start: f64, end: f64, count: usize) -> Vec<Vec<f64>> {
    match count {
        0 => Vec::new(),
        1 => vec![vec![start]],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| vec![start + step * i as f64]).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::synthesize;

    fn four_bar() -> Vec<Joint> {
        vec![
            Joint::revolute(&["ground", "L0"], 0.0, 0.0),
            Joint::revolute(&["L0", "L1"], 0.0, 10.0),
            Joint::revolute(&["L1", "L2"], 10.0, 10.0),
            Joint::revolute(&["ground", "L2"], 10.0, 0.0),
        ]
    }

    #[test]
    fn test_angle_samples() {
        assert!(angle_samples(0.0, 90.0, 0).is_empty());
        assert_eq!(angle_samples(10.0, 90.0, 1), vec![vec![10.0]]);
        assert_eq!(
            angle_samples(0.0, 90.0, 4),
            vec![vec![0.0], vec![30.0], vec![60.0], vec![90.0]]
        );
    }

    #[test]
    fn test_sweep_matches_single_solves() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let bindings = Bindings::new();
        let samples = angle_samples(30.0, 150.0, 5);
        let results = sweep(&stack, &bindings, &joints, &samples);
        assert_eq!(results.len(), samples.len());
        for (angles, result) in samples.iter().zip(&results) {
            let single = crate::solve::solve(&stack, &bindings, &joints, angles).unwrap();
            assert_eq!(result.as_ref().unwrap(), &single);
        }
    }

    #[test]
    fn test_sweep_keeps_failures_per_sample() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let samples = vec![vec![0.0], vec![90.0]];
        let results = sweep(&stack, &Bindings::new(), &joints, &samples);
        assert!(matches!(results[0], Err(SolveError::GeometricFailure { joint: 2 })));
        assert!(results[1].is_ok());
    }
}
