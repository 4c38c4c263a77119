//! The PMKS text form of a mechanism.
//!
//! ```text
//! M[
//!     J[R, color[Green], P[0.0, 0.0], L[ground, L1]],
//!     J[RP, A[30.0], P[20.0, 0.0], L[ground, L2]],
//! ]
//! ```
//!
//! Sliders take their slot angle from `A[..]` and both coordinates from
//! `P[..]`. Colors are accepted and dropped. `#` starts a comment running
//! to the end of the line.

use std::fmt;
use std::str::FromStr;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{all_consuming, opt, recognize, value},
    error::Error,
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::model::{Joint, JointKind};

/// A joint list read from or written as a PMKS expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mechanism(pub Vec<Joint>);

impl Mechanism {
    pub fn joints(&self) -> &[Joint] {
        &self.0
    }

    pub fn into_joints(self) -> Vec<Joint> {
        self.0
    }
}

impl From<Vec<Joint>> for Mechanism {
    fn from(joints: Vec<Joint>) -> Self {
        Self(joints)
    }
}

impl FromStr for Mechanism {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(mechanism)(s) {
            Ok((_, joints)) => Ok(Self(joints)),
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(SolveError::InvalidMechanism {
                offset: s.len() - e.input.len(),
                reason: format!("{:?}", e.code),
            }),
            Err(nom::Err::Incomplete(_)) => Err(SolveError::InvalidMechanism {
                offset: s.len(),
                reason: "unexpected end of input".to_string(),
            }),
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "M[")?;
        for joint in &self.0 {
            write!(f, "    J[{}", joint.kind)?;
            if joint.is_slider() {
                write!(f, ", A[{:?}]", joint.angle)?;
            }
            write!(
                f,
                ", P[{:?}, {:?}], L[{}]],",
                joint.base.x,
                joint.base.y,
                joint.links.join(", ")
            )?;
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

/// Read a PMKS expression into a joint list.
pub fn parse_mechanism(s: &str) -> Result<Vec<Joint>, SolveError> {
    s.parse::<Mechanism>().map(Mechanism::into_joints)
}

/// Write a joint list as a PMKS expression.
pub fn mechanism_expr(joints: &[Joint]) -> String {
    Mechanism(joints.to_vec()).to_string()
}

type PResult<'a, O> = IResult<&'a str, O>;

fn trivia(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('#'), not_line_ending)),
        ))),
    )
    .parse(input)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: Parser<&'a str, O, Error<&'a str>>,
{
    delimited(trivia, inner, trivia)
}

fn sym<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    ws(char(c))
}

/// `name[ inner ]`
fn bracketed<'a, O, F>(name: &'static str, inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: Parser<&'a str, O, Error<&'a str>>,
{
    delimited(pair(ws(tag(name)), sym('[')), inner, sym(']'))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c == '_' || c.is_ascii_alphabetic()),
        take_while(|c: char| c == '_' || c.is_ascii_alphanumeric()),
    ))
    .parse(input)
}

fn joint_kind(input: &str) -> PResult<'_, JointKind> {
    alt((
        value(JointKind::RP, tag("RP")),
        value(JointKind::R, tag("R")),
        value(JointKind::P, tag("P")),
    ))
    .parse(input)
}

/// A named color or an `(r, g, b)` triple.
fn color(input: &str) -> PResult<'_, &str> {
    alt((
        identifier,
        recognize(delimited(char('('), take_while(|c: char| c != ')'), char(')'))),
    ))
    .parse(input)
}

fn joint(input: &str) -> PResult<'_, Joint> {
    let (input, _) = pair(ws(tag("J")), sym('['))(input)?;
    let (input, kind) = ws(joint_kind)(input)?;
    let (input, angle) = opt(preceded(sym(','), bracketed("A", ws(double))))(input)?;
    let (input, _) = opt(preceded(sym(','), bracketed("color", ws(color))))(input)?;
    let (input, (x, y)) = preceded(
        sym(','),
        bracketed("P", separated_pair(ws(double), sym(','), ws(double))),
    )(input)?;
    let (input, links) = preceded(
        sym(','),
        bracketed("L", separated_list0(sym(','), ws(identifier))),
    )(input)?;
    let (input, _) = sym(']')(input)?;

    let joint = match kind {
        JointKind::R => Joint::revolute(&links, x, y),
        JointKind::P | JointKind::RP => Joint::slider(kind, &links, angle.unwrap_or(0.0), x, y),
    };
    Ok((input, joint))
}

fn mechanism(input: &str) -> PResult<'_, Vec<Joint>> {
    bracketed(
        "M",
        terminated(separated_list0(sym(','), joint), opt(sym(','))),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;
    use approx::assert_abs_diff_eq;

    const SLIDER_CRANK: &str = "M[
        J[R, color[Green], P[0.0, 0.0], L[ground, L1]],  # crank pivot
        J[R, color[(255, 0, 0)], P[0.0, 10.0], L[L1, L2]],
        J[RP, A[0.0], color[Green], P[20.0, 0.0], L[ground, L2]],
    ]";

    #[test]
    fn test_parse_slider_crank() {
        let joints = parse_mechanism(SLIDER_CRANK).unwrap();
        assert_eq!(joints.len(), 3);
        assert_eq!(joints[0], Joint::revolute(&["ground", "L1"], 0.0, 0.0));
        assert_eq!(joints[1].links, vec!["L1".to_string(), "L2".to_string()]);
        assert_eq!(joints[2].kind, JointKind::RP);
        assert_eq!(joints[2].base, Coord::new(20.0, 0.0));
        assert_eq!(joints[2].pin, joints[2].base);
    }

    #[test]
    fn test_slider_angle_normalized() {
        let joints = parse_mechanism("M[J[P, A[-30], P[1, 2], L[ground, L1]]]").unwrap();
        assert_eq!(joints[0].kind, JointKind::P);
        assert_abs_diff_eq!(joints[0].angle, 150.0);
    }

    #[test]
    fn test_missing_angle_defaults_to_zero() {
        let joints = parse_mechanism("M[J[RP, P[3.5, -1e-3], L[ground, L2]]]").unwrap();
        assert_abs_diff_eq!(joints[0].angle, 0.0);
        assert_abs_diff_eq!(joints[0].base.y, -1e-3);
    }

    #[test]
    fn test_empty_mechanism() {
        assert!(parse_mechanism("M[]").unwrap().is_empty());
        assert!(parse_mechanism("  M[ # nothing here\n ]  ").unwrap().is_empty());
        let floating = parse_mechanism("M[J[R, P[1.0, 1.0], L[]]]").unwrap();
        assert!(floating[0].no_link());
    }

    #[test]
    fn test_display_reads_back() {
        let joints = parse_mechanism(SLIDER_CRANK).unwrap();
        let text = mechanism_expr(&joints);
        assert!(text.starts_with("M[\n    J[R, P[0.0, 0.0], L[ground, L1]],"));
        assert!(text.contains("J[RP, A[0.0], P[20.0, 0.0], L[ground, L2]]"));
        assert_eq!(parse_mechanism(&text).unwrap(), joints);
    }

    #[test]
    fn test_error_reports_offset() {
        let err = parse_mechanism("M[J[X, P[0, 0], L[ground]]]").unwrap_err();
        assert!(matches!(err, SolveError::InvalidMechanism { offset: 2, .. }));

        let err = "M[J[R, P[0, 0], L[ground]]] trailing".parse::<Mechanism>().unwrap_err();
        assert!(matches!(err, SolveError::InvalidMechanism { offset: 28, .. }));
    }
}
