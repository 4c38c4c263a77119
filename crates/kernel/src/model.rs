//! Joint and link model of a planar mechanism.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Coord;

/// Name of the frame link.
pub const GROUND: &str = "ground";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    /// Revolute.
    R,
    /// Prismatic.
    P,
    /// Revolute-prismatic: a pin sliding in a slot and free to rotate.
    RP,
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointKind::R => write!(f, "R"),
            JointKind::P => write!(f, "P"),
            JointKind::RP => write!(f, "RP"),
        }
    }
}

/// A joint of the mechanism.
///
/// Sliders carry two coordinates: `base` on the slot link and `pin` at the
/// current slider position. For a revolute joint only `base` is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub links: Vec<String>,
    pub kind: JointKind,
    /// Slot direction in degrees, normalized to [0, 180).
    pub angle: f64,
    pub base: Coord,
    pub pin: Coord,
}

impl Joint {
    pub fn revolute(links: &[&str], x: f64, y: f64) -> Self {
        let c = Coord::new(x, y);
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            kind: JointKind::R,
            angle: 0.0,
            base: c,
            pin: c,
        }
    }

    /// A slider joint with both coordinates at (`x`, `y`).
    pub fn slider(kind: JointKind, links: &[&str], angle: f64, x: f64, y: f64) -> Self {
        let c = Coord::new(x, y);
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            kind,
            angle: angle.rem_euclid(180.0),
            base: c,
            pin: c,
        }
    }

    pub fn is_slider(&self) -> bool {
        self.kind != JointKind::R
    }

    /// Current position: `base` for revolute joints, `pin` for sliders.
    pub fn position(&self) -> Coord {
        match self.kind {
            JointKind::R => self.base,
            JointKind::P | JointKind::RP => self.pin,
        }
    }

    /// Coordinate by index: 0 is `base`, 1 is `pin`, anything else the current position.
    pub fn coord(&self, index: usize) -> Coord {
        match index {
            0 => self.base,
            1 if self.is_slider() => self.pin,
            1 => self.base,
            _ => self.position(),
        }
    }

    pub fn has_link(&self, link: &str) -> bool {
        self.links.iter().any(|l| l == link)
    }

    pub fn no_link(&self) -> bool {
        self.links.is_empty()
    }

    /// The slot link of a slider.
    pub fn slot_link(&self) -> Option<&str> {
        if self.is_slider() {
            self.links.first().map(String::as_str)
        } else {
            None
        }
    }

    pub fn is_slot_link(&self, link: &str) -> bool {
        self.slot_link() == Some(link)
    }

    /// Revolute joints on the frame, or sliders whose slot is the frame.
    pub fn grounded(&self) -> bool {
        match self.kind {
            JointKind::R => self.has_link(GROUND),
            JointKind::P | JointKind::RP => self.links.first().is_some_and(|l| l == GROUND),
        }
    }

    /// The frame appears among the pin-side links of a slider.
    pub fn pin_grounded(&self) -> bool {
        self.links.iter().skip(1).any(|l| l == GROUND)
    }

    /// The first of our links that `other` also sits on.
    pub fn shared_link<'a>(&'a self, other: &Joint) -> Option<&'a str> {
        self.links
            .iter()
            .find(|l| other.has_link(l))
            .map(String::as_str)
    }

    pub fn same_link(&self, other: &Joint) -> bool {
        self.shared_link(other).is_some()
    }

    /// The coordinate this joint presents to `link`.
    pub fn coord_on(&self, link: &str) -> Coord {
        if self.is_slot_link(link) {
            self.base
        } else if self.is_slider() {
            self.pin
        } else {
            self.base
        }
    }

    /// Degrees of the direction from `other.coord(j)` to `self.coord(i)`.
    pub fn slope_angle(&self, other: &Joint, i: usize, j: usize) -> f64 {
        let a = self.coord(i);
        let b = other.coord(j);
        (a.y - b.y).atan2(a.x - b.x).to_degrees()
    }

    /// Distance measured on the first link both joints share.
    pub fn link_distance(&self, other: &Joint) -> f64 {
        match self.shared_link(other) {
            Some(link) => self.coord_on(link).distance_to(&other.coord_on(link)),
            None => self.position().distance_to(&other.position()),
        }
    }

    /// Unit direction of the slot.
    pub fn slot_direction(&self) -> Coord {
        let rad = self.angle.to_radians();
        Coord::new(rad.cos(), rad.sin())
    }

    pub fn set_position(&mut self, c: Coord) {
        match self.kind {
            JointKind::R => {
                self.base = c;
                self.pin = c;
            }
            JointKind::P | JointKind::RP => self.pin = c,
        }
    }
}

/// A link and the joints on it, in ascending index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub joints: Vec<usize>,
}

/// Derive the link table from joint memberships. The frame is always first.
pub fn links_of(joints: &[Joint]) -> Vec<Link> {
    let mut links = vec![Link {
        name: GROUND.to_string(),
        joints: Vec::new(),
    }];
    for (i, joint) in joints.iter().enumerate() {
        for name in &joint.links {
            let slot = match links.iter().position(|l| &l.name == name) {
                Some(k) => k,
                None => {
                    links.push(Link {
                        name: name.clone(),
                        joints: Vec::new(),
                    });
                    links.len() - 1
                }
            };
            if links[slot].joints.last() != Some(&i) {
                links[slot].joints.push(i);
            }
        }
    }
    links
}

/// Edges of the link graph: one pair of link indices (into [`links_of`])
/// for every two links meeting at a joint.
pub fn link_edges(joints: &[Joint]) -> Vec<(usize, usize)> {
    let links = links_of(joints);
    let index = |name: &str| links.iter().position(|l| l.name == name);
    let mut edges = Vec::new();
    for joint in joints {
        let ids: Vec<usize> = joint.links.iter().filter_map(|l| index(l)).collect();
        for (k, &a) in ids.iter().enumerate() {
            for &b in &ids[k + 1..] {
                if a != b {
                    edges.push((a.min(b), a.max(b)));
                }
            }
        }
    }
    edges
}

/// Replace revolute joints carried by a grounded prismatic joint with
/// revolute-prismatic joints riding the same slot.
///
/// Returns a new list; the input is not touched.
pub fn normalize_sliders(joints: &[Joint]) -> Vec<Joint> {
    let mut out = joints.to_vec();
    for (i, prismatic) in joints.iter().enumerate() {
        if prismatic.kind != JointKind::P || !prismatic.grounded() {
            continue;
        }
        for link in prismatic.links.iter().skip(1) {
            for (j, other) in joints.iter().enumerate() {
                if j == i || out[j].kind != JointKind::R || !other.has_link(link) {
                    continue;
                }
                let mut links = vec![prismatic.links[0].clone()];
                links.extend(
                    other
                        .links
                        .iter()
                        .filter(|l| !prismatic.links.contains(l))
                        .cloned(),
                );
                let pos = other.position();
                out[j] = Joint {
                    links,
                    kind: JointKind::RP,
                    angle: prismatic.angle,
                    base: pos,
                    pin: pos,
                };
            }
        }
    }
    out
}
