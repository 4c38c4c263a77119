//! Closed-form construction primitives.
//!
//! Every function here is pure. A construction that has no real solution
//! returns [`Coord::NAN`]; callers detect failure with [`Coord::is_nan`]
//! instead of a `Result`, so a failed step flows through later steps and is
//! reported once, at the joint that consumes it.

use serde::{Deserialize, Serialize};

/// A point in the mechanism plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };
    pub const NAN: Self = Self {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// A failed construction. Only the x component is inspected.
    pub fn is_nan(&self) -> bool {
        self.x.is_nan()
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }

    /// The point `length` away along `angle` (radians).
    pub fn polar(&self, length: f64, angle: f64) -> Self {
        Self {
            x: self.x + length * angle.cos(),
            y: self.y + length * angle.sin(),
        }
    }

    pub fn to_array(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coord {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Comparison slack for intersection tests, scaled by the radii involved.
fn slack(scale: f64) -> f64 {
    1e-10 * scale.abs().max(1.0)
}

pub fn distance(a: Coord, b: Coord) -> f64 {
    a.distance_to(&b)
}

/// PLA / PLAP: the point at `radius` from `center`, rotated `angle` radians
/// from the direction of `reference` (or from the X axis without one).
pub fn circle_by_angle(
    center: Coord,
    radius: f64,
    angle: f64,
    reference: Option<Coord>,
    inverse: bool,
) -> Coord {
    let base = reference.map_or(0.0, |r| (r.y - center.y).atan2(r.x - center.x));
    if inverse {
        center.polar(radius, base - angle)
    } else {
        center.polar(radius, base + angle)
    }
}

/// PLLP: intersection of the circle (`c1`, `r1`) with the circle (`c2`, `r2`).
///
/// Without `inverse` the root on the left of `c1 -> c2` is returned.
pub fn circle_circle_intersect(c1: Coord, r1: f64, r2: f64, c2: Coord, inverse: bool) -> Coord {
    let dx = c2.x - c1.x;
    let dy = c2.y - c1.y;
    let d = dx.hypot(dy);
    let eps = slack(r1 + r2);

    // Separate circles.
    if d > r1 + r2 + eps {
        return Coord::NAN;
    }
    // One circle contained in the other.
    if d < (r1 - r2).abs() - eps {
        return Coord::NAN;
    }
    // Concentric: coincident circles or no intersection at all.
    if d < eps {
        return Coord::NAN;
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let xm = c1.x + a * dx / d;
    let ym = c1.y + a * dy / d;

    if inverse {
        Coord::new(xm + h * dy / d, ym - h * dx / d)
    } else {
        Coord::new(xm - h * dy / d, ym + h * dx / d)
    }
}

/// PLPP: intersection of the circle (`c1`, `r`) with the line through `p2`, `p3`.
///
/// Without `inverse` the root further along `p2 -> p3` is returned.
pub fn circle_line_intersect(c1: Coord, r: f64, p2: Coord, p3: Coord, inverse: bool) -> Coord {
    let dx = p3.x - p2.x;
    let dy = p3.y - p2.y;
    let line_mag = dx.hypot(dy);
    if line_mag == 0.0 {
        return Coord::NAN;
    }

    let u = ((c1.x - p2.x) * dx + (c1.y - p2.y) * dy) / (line_mag * line_mag);
    let foot = Coord::new(p2.x + u * dx, p2.y + u * dy);
    let d = c1.distance_to(&foot);
    let eps = slack(r);

    if d > r + eps {
        return Coord::NAN;
    }
    if (d - r).abs() <= eps {
        // Tangent line.
        return foot;
    }

    let t = (r * r - d * d).sqrt() / line_mag;
    if inverse {
        Coord::new(foot.x - dx * t, foot.y - dy * t)
    } else {
        Coord::new(foot.x + dx * t, foot.y + dy * t)
    }
}

/// PXY: `c1` shifted by (`dx`, `dy`).
pub fn relative_offset(c1: Coord, dx: f64, dy: f64) -> Coord {
    Coord::new(c1.x + dx, c1.y + dy)
}

/// Orientation of the turn `c1 -> c2 -> c3`; collinear triples count as clockwise.
pub fn is_clockwise(c1: Coord, c2: Coord, c3: Coord) -> bool {
    let val = (c2.y - c1.y) * (c3.x - c2.x) - (c2.x - c1.x) * (c3.y - c2.y);
    val >= 0.0
}
