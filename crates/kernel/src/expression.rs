//! The expression stack: an ordered list of closed-form construction steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// A symbolic operand of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    /// Position of joint `n`.
    Point(usize),
    /// A link length.
    Length(usize),
    /// An input angle.
    Angle(usize),
    /// The direction handle of slider joint `n`.
    Slider(usize),
}

impl Symbol {
    pub fn index(&self) -> usize {
        match *self {
            Symbol::Point(n) | Symbol::Length(n) | Symbol::Angle(n) | Symbol::Slider(n) => n,
        }
    }

    /// Point and slider symbols hold coordinates; the rest hold scalars.
    pub fn is_coord(&self) -> bool {
        matches!(self, Symbol::Point(_) | Symbol::Slider(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Point(n) => write!(f, "P{n}"),
            Symbol::Length(n) => write!(f, "L{n}"),
            Symbol::Angle(n) => write!(f, "a{n}"),
            Symbol::Slider(n) => write!(f, "S{n}"),
        }
    }
}

impl FromStr for Symbol {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SolveError::UnsupportedExpression(format!("invalid symbol `{s}`"));
        let mut chars = s.chars();
        let tag = chars.next().ok_or_else(bad)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let n: usize = digits.parse().map_err(|_| bad())?;
        match tag {
            'P' => Ok(Symbol::Point(n)),
            'L' => Ok(Symbol::Length(n)),
            'a' => Ok(Symbol::Angle(n)),
            'S' => Ok(Symbol::Slider(n)),
            _ => Err(bad()),
        }
    }
}

/// One construction step. Coordinate operands are `c*`, scalar operands `v*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Point at length `v1` and angle `v2` from `c1`.
    Pla {
        c1: Symbol,
        v1: Symbol,
        v2: Symbol,
        target: Symbol,
    },
    /// Point at length `v1` and angle `v2` from `c1`, measured from the direction of `c2`.
    Plap {
        c1: Symbol,
        v1: Symbol,
        v2: Symbol,
        c2: Symbol,
        target: Symbol,
        inverse: bool,
    },
    /// Point at length `v1` from `c1` and `v2` from `c2`.
    Pllp {
        c1: Symbol,
        v1: Symbol,
        v2: Symbol,
        c2: Symbol,
        target: Symbol,
        inverse: bool,
    },
    /// Point at length `v1` from `c1` on the line through `c2`, `c3`.
    Plpp {
        c1: Symbol,
        v1: Symbol,
        c2: Symbol,
        c3: Symbol,
        target: Symbol,
        inverse: bool,
    },
    /// Point offset from `c1` by (`v1`, `v2`).
    Pxy {
        c1: Symbol,
        v1: Symbol,
        v2: Symbol,
        target: Symbol,
    },
}

impl Expr {
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Pla { .. } => "PLA",
            Expr::Plap { .. } => "PLAP",
            Expr::Pllp { .. } => "PLLP",
            Expr::Plpp { .. } => "PLPP",
            Expr::Pxy { .. } => "PXY",
        }
    }

    pub fn target(&self) -> Symbol {
        match *self {
            Expr::Pla { target, .. }
            | Expr::Plap { target, .. }
            | Expr::Pllp { target, .. }
            | Expr::Plpp { target, .. }
            | Expr::Pxy { target, .. } => target,
        }
    }

    /// Operands in interchange order, target excluded.
    pub fn operands(&self) -> Vec<Symbol> {
        match *self {
            Expr::Pla { c1, v1, v2, .. } | Expr::Pxy { c1, v1, v2, .. } => vec![c1, v1, v2],
            Expr::Plap { c1, v1, v2, c2, .. } | Expr::Pllp { c1, v1, v2, c2, .. } => {
                vec![c1, v1, v2, c2]
            }
            Expr::Plpp { c1, v1, c2, c3, .. } => vec![c1, v1, c2, c3],
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match *self {
            Expr::Plap { inverse, .. }
            | Expr::Pllp { inverse, .. }
            | Expr::Plpp { inverse, .. } => Some(inverse),
            Expr::Pla { .. } | Expr::Pxy { .. } => None,
        }
    }

    /// Angle-driven steps consume one input each.
    pub fn is_driver(&self) -> bool {
        matches!(self, Expr::Pla { .. } | Expr::Plap { .. })
    }

    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.kind().to_string()];
        tokens.extend(self.operands().iter().map(Symbol::to_string));
        tokens.push(self.target().to_string());
        if let Some(flag) = self.flag() {
            tokens.push(if flag { "T" } else { "F" }.to_string());
        }
        tokens
    }

    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, SolveError> {
        let joined = || {
            tokens
                .iter()
                .map(|t| t.as_ref())
                .collect::<Vec<&str>>()
                .join(",")
        };
        let sym = |i: usize| -> Result<Symbol, SolveError> { tokens[i].as_ref().parse() };
        let flag = |i: usize| -> Result<bool, SolveError> {
            match tokens[i].as_ref() {
                "T" => Ok(true),
                "F" => Ok(false),
                other => Err(SolveError::UnsupportedExpression(format!(
                    "invalid flag `{other}` in ({})",
                    joined()
                ))),
            }
        };
        let kind: &str = tokens.first().map(|t| t.as_ref()).unwrap_or("");
        let expr = match (kind, tokens.len()) {
            ("PLA", 5) => Expr::Pla {
                c1: sym(1)?,
                v1: sym(2)?,
                v2: sym(3)?,
                target: sym(4)?,
            },
            ("PLAP", 7) => Expr::Plap {
                c1: sym(1)?,
                v1: sym(2)?,
                v2: sym(3)?,
                c2: sym(4)?,
                target: sym(5)?,
                inverse: flag(6)?,
            },
            ("PLLP", 7) => Expr::Pllp {
                c1: sym(1)?,
                v1: sym(2)?,
                v2: sym(3)?,
                c2: sym(4)?,
                target: sym(5)?,
                inverse: flag(6)?,
            },
            ("PLPP", 7) => Expr::Plpp {
                c1: sym(1)?,
                v1: sym(2)?,
                c2: sym(3)?,
                c3: sym(4)?,
                target: sym(5)?,
                inverse: flag(6)?,
            },
            ("PXY", 5) => Expr::Pxy {
                c1: sym(1)?,
                v1: sym(2)?,
                v2: sym(3)?,
                target: sym(4)?,
            },
            _ => return Err(SolveError::UnsupportedExpression(format!("({})", joined()))),
        };
        Ok(expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops: Vec<String> = self.operands().iter().map(Symbol::to_string).collect();
        write!(f, "{}[{}", self.kind(), ops.join(","))?;
        if let Some(flag) = self.flag() {
            write!(f, ",{}", if flag { "T" } else { "F" })?;
        }
        write!(f, "]({})", self.target())
    }
}

/// Construction steps in solve order.
///
/// Append-only while synthesizing; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStack {
    exprs: Vec<Expr>,
}

impl ExpressionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.exprs.iter()
    }

    pub fn as_slice(&self) -> &[Expr] {
        &self.exprs
    }

    /// Target symbols, in stack order.
    pub fn targets(&self) -> Vec<Symbol> {
        self.exprs.iter().map(Expr::target).collect()
    }

    /// Number of angle inputs the stack consumes.
    pub fn driver_count(&self) -> usize {
        self.exprs.iter().filter(|e| e.is_driver()).count()
    }

    /// Flat interchange form, one string tuple per step.
    pub fn as_tokens(&self) -> Vec<Vec<String>> {
        self.exprs.iter().map(Expr::to_tokens).collect()
    }

    pub fn from_tokens<S: AsRef<str>>(tokens: &[Vec<S>]) -> Result<Self, SolveError> {
        let exprs = tokens
            .iter()
            .map(|t| Expr::from_tokens(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { exprs })
    }
}

impl<'a> IntoIterator for &'a ExpressionStack {
    type Item = &'a Expr;
    type IntoIter = std::slice::Iter<'a, Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.exprs.iter()
    }
}

impl FromIterator<Expr> for ExpressionStack {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        Self {
            exprs: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ExpressionStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.exprs.iter().map(Expr::to_string).collect();
        write!(f, "{}", parts.join(";"))
    }
}
