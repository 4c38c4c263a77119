use serde::{Deserialize, Serialize};

/// Index into the sketch's entity list.
pub type EntityIndex = usize;

/// A 2D geometric constraint between sketch entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Point is fixed at a specific position.
    Fixed {
        point: EntityIndex,
        x: f64,
        y: f64,
    },
    /// Fixed distance between two points.
    Distance {
        point_a: EntityIndex,
        point_b: EntityIndex,
        value: f64,
    },
    /// A point lies on the infinite line through a line entity.
    PointOnLine {
        point: EntityIndex,
        line: EntityIndex,
    },
    /// A line points along a fixed direction (radians from the X axis).
    LineAngle { line: EntityIndex, value: f64 },
    /// Fixed angle (radians) measured from `line_a` to `line_b`.
    Angle {
        line_a: EntityIndex,
        line_b: EntityIndex,
        value: f64,
    },
}

impl Constraint {
    /// Number of scalar residual equations this constraint contributes.
    pub fn residual_count(&self) -> usize {
        match self {
            Constraint::Fixed { .. } => 2,
            _ => 1,
        }
    }

    /// Append this constraint's residuals to `out`.
    /// Every residual is 0.0 when the constraint is perfectly satisfied.
    pub fn residuals(&self, params: &[f64], entities: &[SketchEntity], out: &mut Vec<f64>) {
        match self {
            Constraint::Fixed { point, x, y } => {
                let (px, py) = entity_point(entities, *point, params);
                out.push(px - x);
                out.push(py - y);
            }
            Constraint::Distance {
                point_a,
                point_b,
                value,
            } => {
                let (ax, ay) = entity_point(entities, *point_a, params);
                let (bx, by) = entity_point(entities, *point_b, params);
                out.push((bx - ax).hypot(by - ay) - value);
            }
            Constraint::PointOnLine { point, line } => {
                let (px, py) = entity_point(entities, *point, params);
                let ((ax, ay), (dx, dy)) = line_origin_direction(entities, *line, params);
                let len = dx.hypot(dy);
                let cross = (px - ax) * dy - (py - ay) * dx;
                // Signed distance keeps the residual in length units.
                out.push(if len > 1e-15 { cross / len } else { cross });
            }
            Constraint::LineAngle { line, value } => {
                let (_, (dx, dy)) = line_origin_direction(entities, *line, params);
                let len = dx.hypot(dy);
                if len < 1e-15 {
                    out.push(0.0);
                } else {
                    // sin(value - theta)
                    out.push((value.sin() * dx - value.cos() * dy) / len);
                }
            }
            Constraint::Angle {
                line_a,
                line_b,
                value,
            } => {
                let (_, (ax, ay)) = line_origin_direction(entities, *line_a, params);
                let (_, (bx, by)) = line_origin_direction(entities, *line_b, params);
                let norm = ax.hypot(ay) * bx.hypot(by);
                if norm < 1e-15 {
                    out.push(0.0);
                } else {
                    let cross = ax * by - ay * bx;
                    let dot = ax * bx + ay * by;
                    // sin(theta_b - theta_a - value)
                    out.push((cross * value.cos() - dot * value.sin()) / norm);
                }
            }
        }
    }
}

/// A sketch entity (geometric element in 2D).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SketchEntity {
    /// A point: params[param_index] = x, params[param_index+1] = y
    Point { param_index: usize },
    /// A line through two point parameter offsets.
    Line {
        start_param: usize,
        end_param: usize,
    },
}

fn entity_point(entities: &[SketchEntity], idx: EntityIndex, params: &[f64]) -> (f64, f64) {
    match &entities[idx] {
        SketchEntity::Point { param_index } => (params[*param_index], params[param_index + 1]),
        SketchEntity::Line { start_param, .. } => (params[*start_param], params[start_param + 1]),
    }
}

fn line_origin_direction(
    entities: &[SketchEntity],
    idx: EntityIndex,
    params: &[f64],
) -> ((f64, f64), (f64, f64)) {
    match &entities[idx] {
        SketchEntity::Line {
            start_param,
            end_param,
        } => {
            let ax = params[*start_param];
            let ay = params[start_param + 1];
            let dx = params[*end_param] - ax;
            let dy = params[end_param + 1] - ay;
            ((ax, ay), (dx, dy))
        }
        SketchEntity::Point { param_index } => {
            ((params[*param_index], params[param_index + 1]), (1.0, 0.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn two_points_and_line(params: &[f64]) -> Vec<SketchEntity> {
        assert_eq!(params.len(), 4);
        vec![
            SketchEntity::Point { param_index: 0 },
            SketchEntity::Point { param_index: 2 },
            SketchEntity::Line {
                start_param: 0,
                end_param: 2,
            },
        ]
    }

    fn eval(c: &Constraint, params: &[f64], entities: &[SketchEntity]) -> Vec<f64> {
        let mut out = Vec::new();
        c.residuals(params, entities, &mut out);
        assert_eq!(out.len(), c.residual_count());
        out
    }

    #[test]
    fn test_distance_residual_is_signed_length_error() {
        let params = [0.0, 0.0, 3.0, 4.0];
        let entities = two_points_and_line(&params);
        let c = Constraint::Distance {
            point_a: 0,
            point_b: 1,
            value: 4.0,
        };
        let r = eval(&c, &params, &entities);
        assert!((r[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_residual_two_components() {
        let params = [1.0, 2.0, 0.0, 0.0];
        let entities = two_points_and_line(&params);
        let c = Constraint::Fixed {
            point: 0,
            x: 0.5,
            y: 3.0,
        };
        let r = eval(&c, &params, &entities);
        assert!((r[0] - 0.5).abs() < 1e-12);
        assert!((r[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_angle_satisfied_and_violated() {
        let params = [0.0, 0.0, 0.0, 2.0];
        let entities = two_points_and_line(&params);
        let vertical = Constraint::LineAngle {
            line: 2,
            value: FRAC_PI_2,
        };
        assert!(eval(&vertical, &params, &entities)[0].abs() < 1e-12);

        let horizontal = Constraint::LineAngle { line: 2, value: 0.0 };
        assert!((eval(&horizontal, &params, &entities)[0].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_on_line_signed_distance() {
        let params = [0.0, 0.0, 10.0, 0.0, 5.0, 3.0];
        let entities = vec![
            SketchEntity::Point { param_index: 0 },
            SketchEntity::Point { param_index: 2 },
            SketchEntity::Line {
                start_param: 0,
                end_param: 2,
            },
            SketchEntity::Point { param_index: 4 },
        ];
        let c = Constraint::PointOnLine { point: 3, line: 2 };
        let r = eval(&c, &params, &entities);
        assert!((r[0].abs() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between_lines() {
        // line_a along +x, line_b along +y: 90 degrees from a to b.
        let params = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let entities = vec![
            SketchEntity::Line {
                start_param: 0,
                end_param: 2,
            },
            SketchEntity::Line {
                start_param: 0,
                end_param: 4,
            },
        ];
        let right = Constraint::Angle {
            line_a: 0,
            line_b: 1,
            value: FRAC_PI_2,
        };
        assert!(eval(&right, &params, &entities)[0].abs() < 1e-12);
        let zero = Constraint::Angle {
            line_a: 0,
            line_b: 1,
            value: 0.0,
        };
        assert!((eval(&zero, &params, &entities)[0] - 1.0).abs() < 1e-12);
    }
}
