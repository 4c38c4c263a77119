use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::collect::{Bindings, DataDict, collect_data};
use crate::dof::compute_dof;
use crate::error::SolveError;
use crate::evaluate::evaluate_stack;
use crate::expression::{Expr, ExpressionStack, Symbol};
use crate::fallback::{FallbackSolver, KnownValues, SketchFallback};
use crate::geometry::Coord;
use crate::model::{Joint, links_of};

/// Solved pose of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolvedPosition {
    Revolute(Coord),
    /// `pin` is always solved. `base` is the slot origin as solved by the
    /// numeric fallback; when the closed form places the pin, it is the
    /// caller's `Joint::base`, which only stays exact on a frame slot.
    Slider { base: Coord, pin: Coord },
}

impl SolvedPosition {
    /// The revolute position or the slider pin.
    pub fn position(&self) -> Coord {
        match *self {
            SolvedPosition::Revolute(c) => c,
            SolvedPosition::Slider { pin, .. } => pin,
        }
    }

    fn original(joint: &Joint) -> Self {
        if joint.is_slider() {
            SolvedPosition::Slider {
                base: joint.base,
                pin: joint.pin,
            }
        } else {
            SolvedPosition::Revolute(joint.base)
        }
    }
}

/// Solve `joints` for the given input angles (degrees) with the default fallback.
pub fn solve(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
    angles: &[f64],
) -> Result<Vec<SolvedPosition>, SolveError> {
    solve_with(stack, bindings, joints, angles, &SketchFallback::default())
}

/// Solve with a caller-provided fallback for joints the stack leaves open.
///
/// Angles are matched to the stack's angle symbols by index: `angles[i]`
/// drives `a{i}`.
#[instrument(skip_all, fields(steps = stack.len(), joints = joints.len(), inputs = angles.len()))]
pub fn solve_with<F: FallbackSolver + ?Sized>(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
    angles: &[f64],
    fallback: &F,
) -> Result<Vec<SolvedPosition>, SolveError> {
    let consumed = stack.driver_count();
    let dof = compute_dof(joints);
    if consumed as i32 > dof {
        return Err(SolveError::InvalidInputCount {
            given: consumed,
            dof,
        });
    }
    check_drivers(stack, bindings, joints)?;
    if angles.len() != consumed {
        return Err(SolveError::AngleCountMismatch {
            expected: consumed,
            given: angles.len(),
        });
    }

    let (mut data, _) = collect_data(stack, bindings, joints)?;
    for (i, deg) in angles.iter().enumerate() {
        data.insert_scalar(Symbol::Angle(i), deg.to_radians());
    }

    if !stack.is_empty() {
        evaluate_stack(stack, &mut data)?;
    }

    let closed_form = closed_form_positions(&data, bindings, joints.len());
    if let Some(joint) = closed_form
        .iter()
        .position(|c| c.is_some_and(|c| c.is_nan()))
    {
        return Err(SolveError::GeometricFailure { joint });
    }

    let numeric = if closed_form.iter().any(Option::is_none) {
        let known = known_values(&closed_form, bindings);
        debug!(known = known.coords.len(), "closed form incomplete, running fallback");
        fallback.solve(joints, &links_of(joints), &known)?
    } else {
        Vec::new()
    };

    let solved: Vec<SolvedPosition> = joints
        .iter()
        .enumerate()
        .map(|(i, joint)| match closed_form[i] {
            Some(pin) if joint.is_slider() => SolvedPosition::Slider {
                base: joint.base,
                pin,
            },
            Some(c) => SolvedPosition::Revolute(c),
            None => numeric
                .get(i)
                .copied()
                .unwrap_or_else(|| SolvedPosition::original(joint)),
        })
        .collect();
    info!(fallback = !numeric.is_empty(), "solve finished");
    Ok(solved)
}

/// A driver between two frame-fixed joints is meaningless.
fn check_drivers(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
) -> Result<(), SolveError> {
    let table = bindings.symbol_table(joints.len());
    let grounded = |sym: Symbol| table.get(&sym).is_some_and(|&i| joints[i].grounded());
    for expr in stack {
        let (c1, target) = match *expr {
            Expr::Pla { c1, target, .. } | Expr::Plap { c1, target, .. } => (c1, target),
            _ => continue,
        };
        if grounded(c1) && grounded(target) {
            return Err(SolveError::InvalidDriverDefinition {
                base: table[&c1],
                target: table[&target],
            });
        }
    }
    Ok(())
}

fn known_values(closed_form: &[Option<Coord>], bindings: &Bindings) -> KnownValues {
    KnownValues {
        coords: closed_form
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
            .collect(),
        lengths: bindings.lengths().collect(),
    }
}

/// Closed-form coordinates held in `data` for each joint, if any.
pub fn closed_form_positions(
    data: &DataDict,
    bindings: &Bindings,
    count: usize,
) -> Vec<Option<Coord>> {
    (0..count)
        .map(|i| data.coord(bindings.symbol_of(i)).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JointKind, Link};
    use crate::synthesis::synthesize;
    use pmks_solver::SolverError;

    fn four_bar() -> Vec<Joint> {
        vec![
            Joint::revolute(&["ground", "L0"], 0.0, 0.0),
            Joint::revolute(&["L0", "L1"], 0.0, 10.0),
            Joint::revolute(&["L1", "L2"], 10.0, 10.0),
            Joint::revolute(&["ground", "L2"], 10.0, 0.0),
        ]
    }

    struct Refuse;

    impl FallbackSolver for Refuse {
        fn solve(
            &self,
            _: &[Joint],
            _: &[Link],
            _: &KnownValues,
        ) -> Result<Vec<SolvedPosition>, SolverError> {
            Err(SolverError::DidNotConverge {
                max_iterations: 0,
                residual: f64::INFINITY,
            })
        }
    }

    #[test]
    fn test_closed_form_skips_fallback() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let solved = solve_with(&stack, &Bindings::new(), &joints, &[90.0], &Refuse).unwrap();
        assert_eq!(solved.len(), 4);
        let p2 = solved[2].position();
        assert!((p2.x - 10.0).abs() < 1e-9 && (p2.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_error_is_wrapped() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[]);
        let err = solve_with(&stack, &Bindings::new(), &joints, &[], &Refuse).unwrap_err();
        assert!(matches!(err, SolveError::FallbackSolverFailure(_)));
    }

    #[test]
    fn test_angle_count_mismatch() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let err = solve(&stack, &Bindings::new(), &joints, &[]).unwrap_err();
        assert!(matches!(err, SolveError::AngleCountMismatch { expected: 1, given: 0 }));
    }

    #[test]
    fn test_input_count_checked_before_collection() {
        let joints = four_bar();
        // The second driver names a joint that does not exist.
        let stack = ExpressionStack::from_tokens(&[
            vec!["PLA", "P0", "L0", "a0", "P1"],
            vec!["PLA", "P9", "L1", "a1", "P2"],
        ])
        .unwrap();
        assert!(matches!(
            collect_data(&stack, &Bindings::new(), &joints),
            Err(SolveError::UnknownSymbol(_))
        ));
        let err = solve(&stack, &Bindings::new(), &joints, &[90.0, 90.0]).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInputCount { given: 2, dof: 1 }));
    }

    #[test]
    fn test_closed_form_slider_reports_caller_base() {
        let joints = vec![
            Joint::revolute(&["ground", "L1"], 0.0, 0.0),
            Joint::revolute(&["L1", "L2"], 0.0, 10.0),
            Joint::slider(JointKind::RP, &["ground", "L2"], 0.0, 20.0, 0.0),
        ];
        let stack = synthesize(&joints, &[(0, 1)]);
        let solved = solve_with(&stack, &Bindings::new(), &joints, &[0.0], &Refuse).unwrap();
        let SolvedPosition::Slider { base, pin } = solved[2] else {
            panic!("slider expected");
        };
        assert_eq!(base, joints[2].base);
        assert!((pin.x - (10.0 + 500f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_closed_form_positions_helper() {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let (data, _) = collect_data(&stack, &Bindings::new(), &joints).unwrap();
        let known = closed_form_positions(&data, &Bindings::new(), joints.len());
        assert!(known[0].is_some() && known[3].is_some());
        assert!(known[2].is_none());
    }
}
