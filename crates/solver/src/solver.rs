use nalgebra::{DMatrix, DVector, SVD};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::sketch::Sketch;

/// Result of running the constraint solver.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub converged: bool,
    pub iterations: usize,
    /// Sum of squared residuals at the returned parameters.
    pub final_residual: f64,
    /// Parameters minus the numerical rank of the Jacobian at the solution.
    pub dof: usize,
    pub params: Vec<f64>,
}

#[derive(Debug, Clone, Error)]
pub enum SolverError {
    #[error("Solver did not converge after {max_iterations} iterations (residual: {residual})")]
    DidNotConverge {
        max_iterations: usize,
        residual: f64,
    },
    #[error("Entity {index} is not a point")]
    InvalidEntity { index: usize },
}

/// Configuration for the Levenberg-Marquardt solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Convergence threshold on the sum of squared residuals.
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
        }
    }
}

/// Solve the constraints in a sketch with Gauss-Newton and Levenberg-Marquardt damping.
///
/// Each constraint produces scalar residual equations r_i(x) where r_i = 0
/// when satisfied. Every iteration builds the Jacobian J and solves
///   (J^T J + lambda * I) * dx = J^T * r
/// shrinking lambda after an improving step and growing it otherwise.
/// On success the solved parameters are written back into the sketch.
#[instrument(
    skip(sketch, config),
    fields(params = sketch.params.len(), constraints = sketch.constraints.len())
)]
pub fn solve_sketch(
    sketch: &mut Sketch,
    config: &SolverConfig,
) -> Result<SolverResult, SolverError> {
    let mut params = sketch.params.clone();
    let n = params.len();

    if n == 0 || sketch.constraints.is_empty() {
        return Ok(SolverResult {
            converged: true,
            iterations: 0,
            final_residual: 0.0,
            dof: n,
            params,
        });
    }

    let mut lambda = config.lambda_initial;

    for iteration in 0..config.max_iterations {
        let residuals = sketch.residuals_at(&params);
        let total_sq = sum_squares(&residuals);

        if total_sq < config.tolerance {
            let dof = n.saturating_sub(jacobian_rank(&build_jacobian(sketch, &params, &residuals)));
            debug!(iteration, total_sq, dof, "sketch converged");
            sketch.params = params.clone();
            return Ok(SolverResult {
                converged: true,
                iterations: iteration,
                final_residual: total_sq,
                dof,
                params,
            });
        }

        let jacobian = build_jacobian(sketch, &params, &residuals);
        let r = DVector::from_vec(residuals);
        let jtr = jacobian.transpose() * &r;
        let jtj = jacobian.transpose() * &jacobian;

        let mut found_better = false;
        for _ in 0..10 {
            let mut damped = jtj.clone();
            for i in 0..n {
                damped[(i, i)] += lambda;
            }

            if let Some(dx) = damped.lu().solve(&jtr) {
                let candidate: Vec<f64> =
                    params.iter().zip(dx.iter()).map(|(p, d)| p - d).collect();
                let new_sq = sum_squares(&sketch.residuals_at(&candidate));
                if new_sq < total_sq {
                    params = candidate;
                    lambda = (lambda / config.lambda_factor).max(1e-15);
                    found_better = true;
                    break;
                }
            }
            lambda *= config.lambda_factor;
        }

        if !found_better {
            let grad_norm = jtr.norm();
            if grad_norm < 1e-12 {
                // Stationary point that is not a solution.
                break;
            }
            let step = 0.01 / grad_norm;
            for (p, g) in params.iter_mut().zip(jtr.iter()) {
                *p -= step * g;
            }
        }
    }

    let residuals = sketch.residuals_at(&params);
    let final_residual = sum_squares(&residuals);

    if final_residual < config.tolerance {
        let dof = n.saturating_sub(jacobian_rank(&build_jacobian(sketch, &params, &residuals)));
        sketch.params = params.clone();
        Ok(SolverResult {
            converged: true,
            iterations: config.max_iterations,
            final_residual,
            dof,
            params,
        })
    } else {
        warn!(final_residual, "sketch solve did not converge");
        Err(SolverError::DidNotConverge {
            max_iterations: config.max_iterations,
            residual: final_residual,
        })
    }
}

fn sum_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Build Jacobian via forward finite differences, [m x n].
///
/// The constraint set is small and every residual is cheap, so an analytic
/// Jacobian is not worth carrying per constraint kind.
fn build_jacobian(sketch: &Sketch, params: &[f64], base: &[f64]) -> DMatrix<f64> {
    let h = 1e-7;
    let m = base.len();
    let n = params.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut probe = params.to_vec();
    for j in 0..n {
        let orig = probe[j];
        probe[j] = orig + h;
        let r_plus = sketch.residuals_at(&probe);
        probe[j] = orig;
        for i in 0..m {
            jac[(i, j)] = (r_plus[i] - base[i]) / h;
        }
    }
    jac
}

/// Compute the numerical rank of a Jacobian matrix using SVD.
fn jacobian_rank(jac: &DMatrix<f64>) -> usize {
    if jac.is_empty() {
        return 0;
    }
    let (m, n) = jac.shape();
    let svd = SVD::new(jac.clone(), false, false);
    let sv = &svd.singular_values;
    let max_sv = sv.iter().cloned().fold(0.0_f64, f64::max);
    // Finite differences carry roughly sqrt(eps) noise, so the cut-off is
    // looser than the usual m*n*eps.
    let threshold = (max_sv * (m.max(n) as f64) * 1e-6).max(1e-9);
    sv.iter().filter(|&&s| s > threshold).count()
}
