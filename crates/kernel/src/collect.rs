//! Resolving the symbolic operands of an expression stack.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SolveError;
use crate::expression::{Expr, ExpressionStack, Symbol};
use crate::geometry::Coord;
use crate::model::{Joint, JointKind, normalize_sliders};

/// Unordered joint pair, smaller index first.
pub fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// What a joint is known as while solving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Named by a symbol and placed by the stack.
    Symbol(Symbol),
    /// Pinned at a literal position.
    Fixed(Coord),
}

/// Caller data for a solve: per-joint bindings and literal link lengths.
///
/// Joints without an entry are bound to `P{index}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    joints: HashMap<usize, Binding>,
    lengths: HashMap<(usize, usize), f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, joint: usize, symbol: Symbol) -> Self {
        self.joints.insert(joint, Binding::Symbol(symbol));
        self
    }

    pub fn with_fixed(mut self, joint: usize, position: Coord) -> Self {
        self.joints.insert(joint, Binding::Fixed(position));
        self
    }

    pub fn with_length(mut self, a: usize, b: usize, length: f64) -> Self {
        self.lengths.insert(pair_key(a, b), length);
        self
    }

    pub fn binding(&self, joint: usize) -> Binding {
        self.joints
            .get(&joint)
            .copied()
            .unwrap_or(Binding::Symbol(Symbol::Point(joint)))
    }

    /// The symbol the stack uses for `joint`. Fixed joints keep `P{index}`.
    pub fn symbol_of(&self, joint: usize) -> Symbol {
        match self.binding(joint) {
            Binding::Symbol(sym) => sym,
            Binding::Fixed(_) => Symbol::Point(joint),
        }
    }

    pub fn fixed(&self, joint: usize) -> Option<Coord> {
        match self.joints.get(&joint) {
            Some(Binding::Fixed(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn length(&self, a: usize, b: usize) -> Option<f64> {
        self.lengths.get(&pair_key(a, b)).copied()
    }

    pub fn lengths(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.lengths.iter().map(|(&k, &v)| (k, v))
    }

    /// Map from point symbol back to joint index, for `count` joints.
    pub fn symbol_table(&self, count: usize) -> HashMap<Symbol, usize> {
        (0..count).map(|i| (self.symbol_of(i), i)).collect()
    }
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Coord(Coord),
    Scalar(f64),
}

/// Values keyed by symbol, filled by [`collect_data`] and [`crate::evaluate_stack`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDict {
    values: HashMap<Symbol, Value>,
}

impl DataDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_coord(&mut self, sym: Symbol, c: Coord) {
        self.values.insert(sym, Value::Coord(c));
    }

    pub fn insert_scalar(&mut self, sym: Symbol, v: f64) {
        self.values.insert(sym, Value::Scalar(v));
    }

    pub fn get(&self, sym: Symbol) -> Option<Value> {
        self.values.get(&sym).copied()
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.values.contains_key(&sym)
    }

    pub fn coord(&self, sym: Symbol) -> Result<Coord, SolveError> {
        match self.values.get(&sym) {
            Some(Value::Coord(c)) => Ok(*c),
            _ => Err(SolveError::MissingValue(sym)),
        }
    }

    pub fn scalar(&self, sym: Symbol) -> Result<f64, SolveError> {
        match self.values.get(&sym) {
            Some(Value::Scalar(v)) => Ok(*v),
            _ => Err(SolveError::MissingValue(sym)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Value)> {
        self.values.iter()
    }
}

/// Seed the data dictionary for `stack` and count the inputs it consumes.
///
/// Coordinate operands take the joints' current positions (or their fixed
/// bindings), and lengths not given in `bindings` are measured from the
/// current pose.
#[instrument(skip_all, fields(steps = stack.len(), joints = joints.len()))]
pub fn collect_data(
    stack: &ExpressionStack,
    bindings: &Bindings,
    joints: &[Joint],
) -> Result<(DataDict, usize), SolveError> {
    let joints = normalize_sliders(joints);
    let positions: Vec<Coord> = joints
        .iter()
        .enumerate()
        .map(|(i, j)| bindings.fixed(i).unwrap_or_else(|| j.position()))
        .collect();
    let handles: HashMap<usize, Coord> = joints
        .iter()
        .enumerate()
        .filter(|(_, j)| j.kind == JointKind::RP)
        .map(|(i, j)| {
            let dir = j.slot_direction();
            (i, Coord::new(positions[i].x + dir.x, positions[i].y + dir.y))
        })
        .collect();
    let table = bindings.symbol_table(joints.len());

    let resolve = Resolver {
        table: &table,
        positions: &positions,
        handles: &handles,
        bindings,
    };

    let mut data = DataDict::new();
    let mut dof = 0;
    for expr in stack {
        let target = expr.target();
        match *expr {
            Expr::Pla { c1, v1, .. } => {
                data.insert_coord(c1, resolve.coord(c1)?);
                data.insert_scalar(v1, resolve.length(c1, target)?);
                dof += 1;
            }
            Expr::Plap { c1, v1, c2, .. } => {
                data.insert_coord(c1, resolve.coord(c1)?);
                data.insert_coord(c2, resolve.coord(c2)?);
                data.insert_scalar(v1, resolve.length(c1, target)?);
                dof += 1;
            }
            Expr::Pllp { c1, v1, v2, c2, .. } => {
                data.insert_coord(c1, resolve.coord(c1)?);
                data.insert_coord(c2, resolve.coord(c2)?);
                data.insert_scalar(v1, resolve.length(c1, target)?);
                data.insert_scalar(v2, resolve.length(c2, target)?);
            }
            Expr::Plpp { c1, v1, c2, c3, .. } => {
                data.insert_coord(c1, resolve.coord(c1)?);
                data.insert_coord(c2, resolve.coord(c2)?);
                data.insert_coord(c3, resolve.coord(c3)?);
                data.insert_scalar(v1, resolve.length(c1, target)?);
            }
            Expr::Pxy { c1, v1, v2, .. } => {
                let from = resolve.coord(c1)?;
                let to = resolve.coord(target)?;
                data.insert_coord(c1, from);
                data.insert_scalar(v1, to.x - from.x);
                data.insert_scalar(v2, to.y - from.y);
            }
        }
    }

    // Joints that are known without any construction.
    for (i, joint) in joints.iter().enumerate() {
        let anchored = joint.no_link() || (joint.kind == JointKind::R && joint.grounded());
        if anchored || bindings.fixed(i).is_some() {
            data.insert_coord(bindings.symbol_of(i), positions[i]);
        }
    }

    debug!(values = data.len(), dof, "collected stack data");
    Ok((data, dof))
}

struct Resolver<'a> {
    table: &'a HashMap<Symbol, usize>,
    positions: &'a [Coord],
    handles: &'a HashMap<usize, Coord>,
    bindings: &'a Bindings,
}

impl Resolver<'_> {
    fn joint(&self, sym: Symbol) -> Option<usize> {
        match sym {
            Symbol::Point(_) => self.table.get(&sym).copied(),
            _ => None,
        }
    }

    fn coord(&self, sym: Symbol) -> Result<Coord, SolveError> {
        let found = match sym {
            Symbol::Point(_) => self.joint(sym).map(|i| self.positions[i]),
            Symbol::Slider(n) => self
                .table
                .get(&Symbol::Point(n))
                .and_then(|i| self.handles.get(i))
                .copied(),
            Symbol::Length(_) | Symbol::Angle(_) => None,
        };
        found.ok_or(SolveError::UnknownSymbol(sym))
    }

    /// Bound length between two joints, else the current distance.
    fn length(&self, a: Symbol, b: Symbol) -> Result<f64, SolveError> {
        if let (Some(ja), Some(jb)) = (self.joint(a), self.joint(b)) {
            if let Some(len) = self.bindings.length(ja, jb) {
                return Ok(len);
            }
        }
        Ok(self.coord(a)?.distance_to(&self.coord(b)?))
    }
}
