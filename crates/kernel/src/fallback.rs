//! Numeric fallback for joints the closed-form stack does not reach.

use std::collections::{BTreeMap, HashMap};

use pmks_solver::{Constraint, EntityIndex, Sketch, SolverConfig, SolverError, solve_sketch};
use tracing::{debug, info, instrument};

use crate::collect::pair_key;
use crate::geometry::Coord;
use crate::model::{Joint, JointKind, Link};
use crate::solve::SolvedPosition;

/// What is already known when the fallback runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownValues {
    /// Joint index to solved position (the pin for sliders).
    pub coords: HashMap<usize, Coord>,
    /// Literal link lengths keyed by [`pair_key`].
    pub lengths: HashMap<(usize, usize), f64>,
}

impl KnownValues {
    pub fn length(&self, a: usize, b: usize) -> Option<f64> {
        self.lengths.get(&pair_key(a, b)).copied()
    }
}

/// A numeric solver that completes a partial assignment.
///
/// Returns one position per joint, in joint order.
pub trait FallbackSolver {
    fn solve(
        &self,
        joints: &[Joint],
        links: &[Link],
        known: &KnownValues,
    ) -> Result<Vec<SolvedPosition>, SolverError>;
}

/// Fallback backed by the Levenberg-Marquardt sketch solver.
#[derive(Debug, Clone, Default)]
pub struct SketchFallback {
    pub config: SolverConfig,
}

/// Sketch entities standing for one slider's slot.
struct Slot {
    base: EntityIndex,
    line: EntityIndex,
}

impl FallbackSolver for SketchFallback {
    #[instrument(skip_all, fields(joints = joints.len(), known = known.coords.len()))]
    fn solve(
        &self,
        joints: &[Joint],
        links: &[Link],
        known: &KnownValues,
    ) -> Result<Vec<SolvedPosition>, SolverError> {
        let mut sketch = Sketch::new();

        let pins: Vec<EntityIndex> = joints
            .iter()
            .enumerate()
            .map(|(i, j)| {
                let c = known.coords.get(&i).copied().unwrap_or_else(|| j.position());
                sketch.add_point(c.x, c.y)
            })
            .collect();

        let mut slots: BTreeMap<usize, Slot> = BTreeMap::new();
        for (i, joint) in joints.iter().enumerate().filter(|(_, j)| j.is_slider()) {
            let dir = joint.slot_direction();
            let base = sketch.add_point(joint.base.x, joint.base.y);
            let tip = sketch.add_point(joint.base.x + dir.x, joint.base.y + dir.y);
            let line = sketch.add_line(base, tip)?;
            sketch.add_constraint(Constraint::Distance {
                point_a: base,
                point_b: tip,
                value: 1.0,
            });
            sketch.add_constraint(Constraint::PointOnLine {
                point: pins[i],
                line,
            });
            if joint.grounded() {
                sketch.add_constraint(Constraint::Fixed {
                    point: base,
                    x: joint.base.x,
                    y: joint.base.y,
                });
                sketch.add_constraint(Constraint::LineAngle {
                    line,
                    value: joint.angle.to_radians(),
                });
            }
            slots.insert(i, Slot { base, line });
        }

        for (i, joint) in joints.iter().enumerate() {
            let frame_pin = if joint.is_slider() {
                joint.pin_grounded()
            } else {
                joint.grounded()
            };
            let fixed = known
                .coords
                .get(&i)
                .copied()
                .or_else(|| frame_pin.then(|| joint.position()));
            if let Some(c) = fixed {
                sketch.add_constraint(Constraint::Fixed {
                    point: pins[i],
                    x: c.x,
                    y: c.y,
                });
            }
        }

        // The entity a joint presents to a link: slot base on its slot link, pin elsewhere.
        let entity_on = |i: usize, link: &str| -> EntityIndex {
            match slots.get(&i) {
                Some(slot) if joints[i].is_slot_link(link) => slot.base,
                _ => pins[i],
            }
        };

        for link in links {
            for (k, &a) in link.joints.iter().enumerate() {
                for &b in &link.joints[k + 1..] {
                    let value = known.length(a, b).unwrap_or_else(|| {
                        joints[a]
                            .coord_on(&link.name)
                            .distance_to(&joints[b].coord_on(&link.name))
                    });
                    sketch.add_constraint(Constraint::Distance {
                        point_a: entity_on(a, &link.name),
                        point_b: entity_on(b, &link.name),
                        value,
                    });
                }
            }
        }

        // A moving slot turns with its link.
        let mut slot_turns = Vec::new();
        for (&i, slot) in &slots {
            let joint = &joints[i];
            if joint.grounded() {
                continue;
            }
            let Some(slot_link) = joint.slot_link() else {
                continue;
            };
            let Some(other) = links
                .iter()
                .find(|l| l.name == slot_link)
                .and_then(|l| l.joints.iter().copied().find(|&k| k != i))
            else {
                continue;
            };
            let anchor = joints[other].coord_on(slot_link);
            let reference = (anchor.y - joint.base.y).atan2(anchor.x - joint.base.x);
            slot_turns.push((
                slot.base,
                entity_on(other, slot_link),
                slot.line,
                joint.angle.to_radians() - reference,
            ));
        }
        for (base, anchor, line, value) in slot_turns {
            let reference = sketch.add_line(base, anchor)?;
            sketch.add_constraint(Constraint::Angle {
                line_a: reference,
                line_b: line,
                value,
            });
        }

        // A prismatic block keeps its heading relative to the slot.
        let mut block_turns = Vec::new();
        for (&i, slot) in &slots {
            let joint = &joints[i];
            if joint.kind != JointKind::P {
                continue;
            }
            let pin_side = links
                .iter()
                .filter(|l| joint.has_link(&l.name) && !joint.is_slot_link(&l.name));
            for link in pin_side {
                let Some(member) = link.joints.iter().copied().find(|&k| {
                    k != i && joints[k].coord_on(&link.name).distance_to(&joint.pin) > 1e-9
                }) else {
                    continue;
                };
                let at = joints[member].coord_on(&link.name);
                let heading = (at.y - joint.pin.y).atan2(at.x - joint.pin.x);
                block_turns.push((
                    slot.line,
                    pins[i],
                    entity_on(member, &link.name),
                    heading - joint.angle.to_radians(),
                ));
            }
        }
        for (line, pin, member, value) in block_turns {
            let arm = sketch.add_line(pin, member)?;
            sketch.add_constraint(Constraint::Angle {
                line_a: line,
                line_b: arm,
                value,
            });
        }

        debug!(
            params = sketch.params.len(),
            constraints = sketch.constraints.len(),
            "fallback sketch built"
        );
        let result = solve_sketch(&mut sketch, &self.config)?;
        info!(iterations = result.iterations, dof = result.dof, "fallback solved");

        let point = |entity: EntityIndex| -> Result<Coord, SolverError> {
            sketch
                .point_position(entity)
                .map(|(x, y)| Coord::new(x, y))
                .ok_or(SolverError::InvalidEntity { index: entity })
        };
        joints
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let pin = point(pins[i])?;
                Ok(match slots.get(&i) {
                    Some(slot) => SolvedPosition::Slider {
                        base: point(slot.base)?,
                        pin,
                    },
                    None => SolvedPosition::Revolute(pin),
                })
            })
            .collect()
    }
}
