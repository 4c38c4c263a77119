//! Topology-driven synthesis of the expression stack.
//!
//! Joints are visited in repeated passes. A joint is placed as soon as
//! enough of its neighbours are known, and every placement appends one or
//! more steps to the stack. Joints that never become placeable are left for
//! the fallback solver.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

use crate::expression::{Expr, ExpressionStack, Symbol};
use crate::geometry::{Coord, is_clockwise};
use crate::model::{Joint, JointKind, links_of, normalize_sliders};

/// Build the expression stack for `joints` driven by `inputs` (`(base, driven)` pairs).
pub fn synthesize(joints: &[Joint], inputs: &[(usize, usize)]) -> ExpressionStack {
    let mut status = HashMap::new();
    synthesize_with_status(joints, inputs, &mut status)
}

/// Like [`synthesize`], starting from and updating a caller-owned status map.
///
/// Joints marked `true` are treated as known. On return the map holds every
/// joint placed by the stack.
#[instrument(skip(joints, inputs, status), fields(joints = joints.len(), inputs = inputs.len()))]
pub fn synthesize_with_status(
    joints: &[Joint],
    inputs: &[(usize, usize)],
    status: &mut HashMap<usize, bool>,
) -> ExpressionStack {
    for (i, joint) in joints.iter().enumerate() {
        let known = joint.no_link() || (joint.kind == JointKind::R && joint.grounded());
        let entry = status.entry(i).or_insert(false);
        if known {
            *entry = true;
        }
    }

    let joints = normalize_sliders(joints);
    let mut synth = Synthesizer::new(&joints, inputs, status);
    synth.drive_from_solved_bases();
    synth.run();

    let unsolved: Vec<usize> = (0..joints.len()).filter(|&i| !synth.is_solved(i)).collect();
    if !unsolved.is_empty() {
        warn!(?unsolved, "joints left for the fallback solver");
    }
    debug!(steps = synth.stack.len(), "synthesis finished");
    synth.stack
}

struct Synthesizer<'a> {
    joints: &'a [Joint],
    inputs: &'a [(usize, usize)],
    adjacency: HashMap<String, Vec<usize>>,
    status: &'a mut HashMap<usize, bool>,
    stack: ExpressionStack,
    lengths: usize,
    angles: usize,
}

impl<'a> Synthesizer<'a> {
    fn new(
        joints: &'a [Joint],
        inputs: &'a [(usize, usize)],
        status: &'a mut HashMap<usize, bool>,
    ) -> Self {
        let adjacency = links_of(joints)
            .into_iter()
            .map(|link| (link.name, link.joints))
            .collect();
        Self {
            joints,
            inputs,
            adjacency,
            status,
            stack: ExpressionStack::new(),
            lengths: 0,
            angles: 0,
        }
    }

    fn is_solved(&self, node: usize) -> bool {
        self.status.get(&node).copied().unwrap_or(false)
    }

    fn mark_solved(&mut self, node: usize) {
        self.status.insert(node, true);
    }

    fn next_length(&mut self) -> Symbol {
        let sym = Symbol::Length(self.lengths);
        self.lengths += 1;
        sym
    }

    fn next_angle(&mut self) -> Symbol {
        let sym = Symbol::Angle(self.angles);
        self.angles += 1;
        sym
    }

    fn pos(&self, node: usize) -> Coord {
        self.joints[node].position()
    }

    fn emit(&mut self, expr: Expr) {
        debug!(%expr, "emit");
        self.stack.push(expr);
    }

    /// Distinct joints sharing any of `links` with `node`, in link order.
    fn friends(&self, node: usize, links: &[String]) -> Vec<usize> {
        let mut out = Vec::new();
        for name in links {
            let Some(members) = self.adjacency.get(name) else {
                continue;
            };
            for &f in members {
                if f != node && !out.contains(&f) {
                    out.push(f);
                }
            }
        }
        out
    }

    fn solved_friends(&self, node: usize, links: &[String]) -> Vec<usize> {
        self.friends(node, links)
            .into_iter()
            .filter(|&f| self.is_solved(f))
            .collect()
    }

    /// Inputs whose base is already known are placed directly by angle.
    fn drive_from_solved_bases(&mut self) {
        for &(base, target) in self.inputs {
            if base >= self.joints.len() || target >= self.joints.len() || !self.is_solved(base) {
                continue;
            }
            let v1 = self.next_length();
            let v2 = self.next_angle();
            self.emit(Expr::Pla {
                c1: Symbol::Point(base),
                v1,
                v2,
                target: Symbol::Point(target),
            });
            self.mark_solved(target);
        }
    }

    fn run(&mut self) {
        let around = self.joints.len();
        if around == 0 {
            return;
        }
        let bound = (around + 1) * (around + 1);
        let mut skip_times = 0;
        let mut node = 0;
        let mut steps = 0;

        while (0..around).any(|i| !self.is_solved(i)) {
            if skip_times >= around || steps >= bound {
                break;
            }
            steps += 1;

            let placed = if self.is_solved(node) {
                false
            } else {
                match self.joints[node].kind {
                    JointKind::R => self.place_revolute(node),
                    JointKind::P => self.place_prismatic(node),
                    JointKind::RP => self.place_revolute_prismatic(node),
                }
            };
            if placed {
                skip_times = 0;
            } else {
                skip_times += 1;
            }
            node = (node + 1) % around;
        }
    }

    fn place_revolute(&mut self, node: usize) -> bool {
        if let Some(&(base, _)) = self.inputs.iter().find(|&&(_, t)| t == node) {
            return self.place_driven(base, node);
        }

        let links = self.joints[node].links.clone();
        let friends = self.solved_friends(node, &links);
        let [mut fa, mut fb] = match friends[..] {
            [a, b, ..] => [a, b],
            _ => return false,
        };
        if !is_clockwise(self.pos(fa), self.pos(node), self.pos(fb)) {
            std::mem::swap(&mut fa, &mut fb);
        }
        let v1 = self.next_length();
        let v2 = self.next_length();
        self.emit(Expr::Pllp {
            c1: Symbol::Point(fa),
            v1,
            v2,
            c2: Symbol::Point(fb),
            target: Symbol::Point(node),
            inverse: false,
        });
        self.mark_solved(node);
        true
    }

    /// An input target waits for its base, then is placed relative to a
    /// known neighbour of the base when one exists.
    fn place_driven(&mut self, base: usize, node: usize) -> bool {
        if base >= self.joints.len() || !self.is_solved(base) {
            return false;
        }
        let base_links = self.joints[base].links.clone();
        let reference = self
            .solved_friends(base, &base_links)
            .into_iter()
            .find(|&f| f != node);
        let v1 = self.next_length();
        let v2 = self.next_angle();
        let expr = match reference {
            Some(r) => Expr::Plap {
                c1: Symbol::Point(base),
                v1,
                v2,
                c2: Symbol::Point(r),
                target: Symbol::Point(node),
                inverse: false,
            },
            None => Expr::Pla {
                c1: Symbol::Point(base),
                v1,
                v2,
                target: Symbol::Point(node),
            },
        };
        self.emit(expr);
        self.mark_solved(node);
        true
    }

    fn place_prismatic(&mut self, node: usize) -> bool {
        let pin_links: Vec<String> = self.joints[node].links.iter().skip(1).cloned().collect();
        let Some(&fa) = self.solved_friends(node, &pin_links).first() else {
            return false;
        };
        let v1 = self.next_length();
        let v2 = self.next_length();
        self.emit(Expr::Pxy {
            c1: Symbol::Point(fa),
            v1,
            v2,
            target: Symbol::Point(node),
        });
        self.mark_solved(node);

        // Everything else on the pin side moves with the slider.
        for friend in self.friends(node, &pin_links) {
            if self.is_solved(friend) {
                continue;
            }
            let v1 = self.next_length();
            let v2 = self.next_length();
            self.emit(Expr::Pxy {
                c1: Symbol::Point(node),
                v1,
                v2,
                target: Symbol::Point(friend),
            });
            self.mark_solved(friend);
        }
        true
    }

    /// Place a pin riding a slot. A moving slot first has its origin placed
    /// from two known neighbours on the slot link. A handle point one unit
    /// along the slot follows, and the pin goes where the slot line meets
    /// the circle around a known pin-side neighbour `fa`.
    ///
    /// The PLPP branch flag is set when the pin currently sits behind `fa`
    /// along the slot direction, so the solve keeps the side the pin starts
    /// on. This reads the whole slot direction rather than only testing
    /// whether `fa` lies right of the pin against whether the slot points
    /// past 90 degrees; the two rules agree whenever the slot's x component
    /// dominates, and the projection stays correct for steep slots.
    fn place_revolute_prismatic(&mut self, node: usize) -> bool {
        let joint = &self.joints[node];
        let Some(slot) = joint.links.first().cloned() else {
            return false;
        };
        let grounded = joint.grounded();
        let dir = joint.slot_direction();
        let pos = joint.position();
        let handle = Coord::new(pos.x + dir.x, pos.y + dir.y);

        let pin_links: Vec<String> = joint.links.iter().skip(1).cloned().collect();
        let Some(&fa) = self.solved_friends(node, &pin_links).first() else {
            return false;
        };

        let mut slot_friends = self.solved_friends(node, std::slice::from_ref(&slot));
        // A frame slot is known even before the pin is.
        if grounded {
            slot_friends.push(node);
        }
        if slot_friends.len() < 2 {
            return false;
        }
        // Prefer a slot anchor off the slot line so the handle construction
        // does not degenerate to a tangency.
        let off_line = slot_friends
            .iter()
            .position(|&f| f != node && distance_to_line(self.pos(f), pos, dir) > 1e-9)
            .unwrap_or(0);
        let fb = slot_friends.remove(off_line);
        let fd = slot_friends[0];

        if !grounded {
            let (c1, c2) = if is_clockwise(self.pos(fb), pos, self.pos(fd)) {
                (fb, fd)
            } else {
                (fd, fb)
            };
            let v1 = self.next_length();
            let v2 = self.next_length();
            self.emit(Expr::Pllp {
                c1: Symbol::Point(c1),
                v1,
                v2,
                c2: Symbol::Point(c2),
                target: Symbol::Point(node),
                inverse: false,
            });
        }

        let (c1, c2) = if is_clockwise(self.pos(fb), handle, pos) {
            (fb, node)
        } else {
            (node, fb)
        };
        let v1 = self.next_length();
        let v2 = self.next_length();
        self.emit(Expr::Pllp {
            c1: Symbol::Point(c1),
            v1,
            v2,
            c2: Symbol::Point(c2),
            target: Symbol::Slider(node),
            inverse: false,
        });

        let ahead = (pos.x - self.pos(fa).x) * dir.x + (pos.y - self.pos(fa).y) * dir.y;
        let v1 = self.next_length();
        self.emit(Expr::Plpp {
            c1: Symbol::Point(fa),
            v1,
            c2: Symbol::Point(node),
            c3: Symbol::Slider(node),
            target: Symbol::Point(node),
            inverse: ahead < 0.0,
        });
        self.mark_solved(node);
        true
    }
}

fn distance_to_line(p: Coord, origin: Coord, dir: Coord) -> f64 {
    ((p.x - origin.x) * dir.y - (p.y - origin.y) * dir.x).abs()
}
