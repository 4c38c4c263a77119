use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, EntityIndex, SketchEntity};
use crate::solver::SolverError;

/// A 2D sketch containing geometric entities and constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sketch {
    /// Geometric entities (points and lines).
    pub entities: Vec<SketchEntity>,
    /// Constraints between entities.
    pub constraints: Vec<Constraint>,
    /// Parameter values [x0, y0, x1, y1, ...].
    pub params: Vec<f64>,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free point to the sketch, returning its entity index.
    pub fn add_point(&mut self, x: f64, y: f64) -> EntityIndex {
        let param_index = self.params.len();
        self.params.push(x);
        self.params.push(y);
        self.entities.push(SketchEntity::Point { param_index });
        self.entities.len() - 1
    }

    /// Add a line through two existing points, returning the line's entity index.
    /// `start` and `end` are entity indices returned by `add_point`.
    pub fn add_line(
        &mut self,
        start: EntityIndex,
        end: EntityIndex,
    ) -> Result<EntityIndex, SolverError> {
        let start_param = self.point_param(start)?;
        let end_param = self.point_param(end)?;
        self.entities.push(SketchEntity::Line {
            start_param,
            end_param,
        });
        Ok(self.entities.len() - 1)
    }

    /// Add a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Evaluate every constraint residual at `params`.
    pub fn residuals_at(&self, params: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.residual_count());
        for c in &self.constraints {
            c.residuals(params, &self.entities, &mut out);
        }
        out
    }

    /// Sum of squared residuals at the current parameters.
    pub fn total_residual(&self) -> f64 {
        self.residuals_at(&self.params).iter().map(|r| r * r).sum()
    }

    /// Total number of scalar residual equations.
    pub fn residual_count(&self) -> usize {
        self.constraints.iter().map(Constraint::residual_count).sum()
    }

    /// Get the current position of a point entity.
    pub fn point_position(&self, entity: EntityIndex) -> Option<(f64, f64)> {
        match self.entities.get(entity)? {
            SketchEntity::Point { param_index } => {
                Some((self.params[*param_index], self.params[param_index + 1]))
            }
            SketchEntity::Line { .. } => None,
        }
    }

    fn point_param(&self, entity: EntityIndex) -> Result<usize, SolverError> {
        match self.entities.get(entity) {
            Some(SketchEntity::Point { param_index }) => Ok(*param_index),
            _ => Err(SolverError::InvalidEntity { index: entity }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sketch_add_point() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(5.0, 10.0);
        let (x, y) = sketch.point_position(p).unwrap();
        assert!((x - 5.0).abs() < 1e-12);
        assert!((y - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_sketch_add_line() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(10.0, 0.0);
        let line = sketch.add_line(p1, p2).unwrap();
        assert_eq!(sketch.entities.len(), 3); // 2 points + 1 line
        assert!(sketch.point_position(line).is_none());
    }

    #[test]
    fn test_add_line_rejects_non_point() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(1.0, 0.0);
        let line = sketch.add_line(p1, p2).unwrap();
        let err = sketch.add_line(line, p1).unwrap_err();
        assert!(matches!(err, SolverError::InvalidEntity { index } if index == line));
    }

    #[test]
    fn test_residual_satisfied_and_violated() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 4.0);
        sketch.add_constraint(Constraint::Distance {
            point_a: p1,
            point_b: p2,
            value: 5.0,
        });
        assert!(sketch.total_residual() < 1e-20);

        sketch.add_constraint(Constraint::Fixed {
            point: p2,
            x: 0.0,
            y: 0.0,
        });
        assert_eq!(sketch.residual_count(), 3);
        assert!(sketch.total_residual() > 1.0);
    }

    #[test]
    fn test_sketch_serde_roundtrip() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(2.0, 0.0);
        sketch.add_constraint(Constraint::Distance {
            point_a: p1,
            point_b: p2,
            value: 2.0,
        });
        let json = serde_json::to_string(&sketch).unwrap();
        let back: Sketch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entities, sketch.entities);
        assert_eq!(back.constraints, sketch.constraints);
        assert_eq!(back.params, sketch.params);
    }
}
