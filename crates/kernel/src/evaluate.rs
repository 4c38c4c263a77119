use tracing::trace;

use crate::collect::DataDict;
use crate::error::SolveError;
use crate::expression::{Expr, ExpressionStack};
use crate::geometry::{
    circle_by_angle, circle_circle_intersect, circle_line_intersect, relative_offset,
};

/// Replay `stack` in order, writing each result under its target symbol.
///
/// Geometric failures are stored as NaN coordinates rather than returned;
/// only missing or mistyped operands abort the replay.
pub fn evaluate_stack(stack: &ExpressionStack, data: &mut DataDict) -> Result<(), SolveError> {
    for expr in stack {
        let target = expr.target();
        if !target.is_coord() {
            return Err(SolveError::UnsupportedExpression(expr.to_string()));
        }
        let value = match *expr {
            Expr::Pla { c1, v1, v2, .. } => {
                circle_by_angle(data.coord(c1)?, data.scalar(v1)?, data.scalar(v2)?, None, false)
            }
            Expr::Plap {
                c1,
                v1,
                v2,
                c2,
                inverse,
                ..
            } => circle_by_angle(
                data.coord(c1)?,
                data.scalar(v1)?,
                data.scalar(v2)?,
                Some(data.coord(c2)?),
                inverse,
            ),
            Expr::Pllp {
                c1,
                v1,
                v2,
                c2,
                inverse,
                ..
            } => circle_circle_intersect(
                data.coord(c1)?,
                data.scalar(v1)?,
                data.scalar(v2)?,
                data.coord(c2)?,
                inverse,
            ),
            Expr::Plpp {
                c1,
                v1,
                c2,
                c3,
                inverse,
                ..
            } => circle_line_intersect(
                data.coord(c1)?,
                data.scalar(v1)?,
                data.coord(c2)?,
                data.coord(c3)?,
                inverse,
            ),
            Expr::Pxy { c1, v1, v2, .. } => {
                relative_offset(data.coord(c1)?, data.scalar(v1)?, data.scalar(v2)?)
            }
        };
        trace!(%expr, x = value.x, y = value.y, "evaluated");
        data.insert_coord(target, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Symbol;
    use crate::geometry::Coord;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_4;

    fn four_bar_stack() -> ExpressionStack {
        ExpressionStack::from_tokens(&[
            vec!["PLA", "P0", "L0", "a0", "P1"],
            vec!["PLLP", "P1", "L1", "L2", "P3", "P2", "F"],
        ])
        .unwrap()
    }

    fn four_bar_data(angle: f64) -> DataDict {
        let mut data = DataDict::new();
        data.insert_coord(Symbol::Point(0), Coord::ORIGIN);
        data.insert_coord(Symbol::Point(3), Coord::new(10.0, 0.0));
        for n in 0..3 {
            data.insert_scalar(Symbol::Length(n), 10.0);
        }
        data.insert_scalar(Symbol::Angle(0), angle);
        data
    }

    #[test]
    fn test_four_bar_at_45_degrees() {
        let mut data = four_bar_data(FRAC_PI_4);
        evaluate_stack(&four_bar_stack(), &mut data).unwrap();
        let p1 = data.coord(Symbol::Point(1)).unwrap();
        let p2 = data.coord(Symbol::Point(2)).unwrap();
        assert_abs_diff_eq!(p1.x, 7.0710678, epsilon = 1e-6);
        assert_abs_diff_eq!(p1.y, 7.0710678, epsilon = 1e-6);
        assert_abs_diff_eq!(p2.x, 17.0710678, epsilon = 1e-6);
        assert_abs_diff_eq!(p2.y, 7.0710678, epsilon = 1e-6);
    }

    #[test]
    fn test_failure_is_stored_as_nan() {
        // At 0 degrees P1 lands on P3 and the PLLP circles are concentric.
        let mut data = four_bar_data(0.0);
        evaluate_stack(&four_bar_stack(), &mut data).unwrap();
        assert!(data.coord(Symbol::Point(2)).unwrap().is_nan());
    }

    #[test]
    fn test_missing_operand() {
        let mut data = four_bar_data(FRAC_PI_4);
        let stack = ExpressionStack::from_tokens(&[vec!["PXY", "P5", "L0", "L1", "P6"]]).unwrap();
        let err = evaluate_stack(&stack, &mut data).unwrap_err();
        assert!(matches!(err, SolveError::MissingValue(Symbol::Point(5))));
    }

    #[test]
    fn test_scalar_target_rejected() {
        let mut data = four_bar_data(FRAC_PI_4);
        let stack = ExpressionStack::from_tokens(&[vec!["PXY", "P0", "L0", "L1", "L9"]]).unwrap();
        assert!(matches!(
            evaluate_stack(&stack, &mut data),
            Err(SolveError::UnsupportedExpression(_))
        ));
    }
}
