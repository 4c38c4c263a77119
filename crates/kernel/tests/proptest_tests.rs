//! Property-based tests for the closed-form kernel and the solve pipeline.

use proptest::prelude::*;

use pmks_kernel::geometry::{circle_by_angle, circle_circle_intersect, distance};
use pmks_kernel::{
    Bindings, Coord, Joint, JointKind, Mechanism, compute_dof, solve, synthesize,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Arbitrary 2D coordinate in a reasonable floating-point range.
fn arb_coord() -> impl Strategy<Value = Coord> {
    (-500.0f64..500.0, -500.0f64..500.0).prop_map(|(x, y)| Coord::new(x, y))
}

/// Arbitrary positive radius (avoids degenerate zero-size circles).
fn arb_radius() -> impl Strategy<Value = f64> {
    0.1f64..500.0
}

/// Arbitrary angle in radians.
fn arb_angle() -> impl Strategy<Value = f64> {
    -std::f64::consts::PI..std::f64::consts::PI
}

/// Crank angle in degrees away from the four-bar's folded pose at 0.
fn arb_crank_degrees() -> impl Strategy<Value = f64> {
    5.0f64..355.0
}

const TOL: f64 = 1e-6;

fn four_bar() -> Vec<Joint> {
    vec![
        Joint::revolute(&["ground", "L0"], 0.0, 0.0),
        Joint::revolute(&["L0", "L1"], 0.0, 10.0),
        Joint::revolute(&["L1", "L2"], 10.0, 10.0),
        Joint::revolute(&["ground", "L2"], 10.0, 0.0),
    ]
}

// ---------------------------------------------------------------------------
// 1. Circle by angle keeps the radius and mirrors under `inverse`
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn circle_by_angle_roundtrip(
        c in arb_coord(),
        r in arb_radius(),
        a in arb_angle(),
    ) {
        let p = circle_by_angle(c, r, a, None, false);
        prop_assert!((distance(c, p) - r).abs() < TOL * r.max(1.0),
            "distance {} != radius {}", distance(c, p), r);

        // Without a reference the base angle is the X axis, so the inverse
        // root is the mirror image across it.
        let q = circle_by_angle(c, r, a, None, true);
        prop_assert!((q.x - p.x).abs() < TOL * r.max(1.0));
        prop_assert!(((q.y - c.y) + (p.y - c.y)).abs() < TOL * r.max(1.0));
    }
}

// ---------------------------------------------------------------------------
// 2. Both circle-circle roots lie on both circles
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn circle_circle_roots_on_both_circles(
        c1 in arb_coord(),
        c2 in arb_coord(),
        p in arb_coord(),
    ) {
        let d = distance(c1, c2);
        prop_assume!(d > 1e-2);
        // Keep p off the center line so the two roots are distinct.
        let cross = (c2.x - c1.x) * (p.y - c1.y) - (c2.y - c1.y) * (p.x - c1.x);
        prop_assume!((cross / d).abs() > 1e-2);

        let r1 = distance(c1, p);
        let r2 = distance(c2, p);
        let left = circle_circle_intersect(c1, r1, r2, c2, false);
        let right = circle_circle_intersect(c1, r1, r2, c2, true);
        prop_assert!(!left.is_nan() && !right.is_nan());

        let scale = r1.max(r2).max(1.0);
        for root in [left, right] {
            prop_assert!((distance(root, c1) - r1).abs() < TOL * scale);
            prop_assert!((distance(root, c2) - r2).abs() < TOL * scale);
        }
        prop_assert!(distance(left, right) > 1e-6);
        // p is one of the two roots, on the side its orientation says.
        let expected = if cross > 0.0 { left } else { right };
        prop_assert!(distance(expected, p) < 1e-4 * scale);
    }
}

// ---------------------------------------------------------------------------
// 3. Separate circles never intersect
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn separate_circles_yield_nan(
        c1 in arb_coord(),
        c2 in arb_coord(),
        f1 in 0.01f64..0.49,
        f2 in 0.01f64..0.49,
    ) {
        let d = distance(c1, c2);
        prop_assume!(d > 1.0);
        let p = circle_circle_intersect(c1, d * f1, d * f2, c2, false);
        prop_assert!(p.is_nan());
    }
}

// ---------------------------------------------------------------------------
// 4. Each extra revolute joint between existing links removes two DOF
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn extra_revolute_joint_removes_two_dof(
        pairs in prop::collection::vec((0usize..3, 1usize..3), 1..5),
    ) {
        let names = ["L0", "L1", "L2"];
        let mut joints = four_bar();
        let mut dof = compute_dof(&joints);
        for (a, offset) in pairs {
            let b = (a + offset) % 3;
            joints.push(Joint::revolute(&[names[a], names[b]], 1.0, 1.0));
            let next = compute_dof(&joints);
            prop_assert_eq!(next, dof - 2);
            dof = next;
        }
    }
}

// ---------------------------------------------------------------------------
// 5. Four-bar solves are deterministic and keep link lengths
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn four_bar_solve_is_deterministic(deg in arb_crank_degrees()) {
        let joints = four_bar();
        let stack = synthesize(&joints, &[(0, 1)]);
        let bindings = Bindings::new();
        let first = solve(&stack, &bindings, &joints, &[deg]).unwrap();
        let second = solve(&stack, &bindings, &joints, &[deg]).unwrap();
        prop_assert_eq!(&first, &second);

        let p: Vec<Coord> = first.iter().map(|s| s.position()).collect();
        prop_assert!((distance(p[0], p[1]) - 10.0).abs() < TOL);
        prop_assert!((distance(p[1], p[2]) - 10.0).abs() < TOL);
        prop_assert!((distance(p[2], p[3]) - 10.0).abs() < TOL);
    }
}

// ---------------------------------------------------------------------------
// 6. The slider-crank pin stays in its slot
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn slider_crank_pin_on_slot(deg in 0.0f64..360.0) {
        let joints = vec![
            Joint::revolute(&["ground", "L1"], 0.0, 0.0),
            Joint::revolute(&["L1", "L2"], 0.0, 10.0),
            Joint::slider(JointKind::RP, &["ground", "L2"], 0.0, 20.0, 0.0),
        ];
        let stack = synthesize(&joints, &[(0, 1)]);
        let solved = solve(&stack, &Bindings::new(), &joints, &[deg]).unwrap();
        let crank = solved[1].position();
        let pin = solved[2].position();
        prop_assert!(pin.y.abs() < TOL);
        prop_assert!((distance(crank, pin) - 500f64.sqrt()).abs() < TOL);
        prop_assert!(pin.x > 0.0);
    }
}

// ---------------------------------------------------------------------------
// 7. PMKS expressions read back to the same joints
// ---------------------------------------------------------------------------

fn arb_joint() -> impl Strategy<Value = Joint> {
    let names = prop::sample::subsequence(vec!["ground", "L1", "L2", "L3", "slot_4"], 0..4);
    let kind = prop_oneof![Just(JointKind::R), Just(JointKind::P), Just(JointKind::RP)];
    (kind, names, 0.0f64..180.0, arb_coord()).prop_map(|(kind, names, angle, c)| match kind {
        JointKind::R => Joint::revolute(&names, c.x, c.y),
        _ => Joint::slider(kind, &names, angle, c.x, c.y),
    })
}

proptest! {
    #[test]
    fn mechanism_expression_reads_back(joints in prop::collection::vec(arb_joint(), 0..8)) {
        let text = Mechanism(joints.clone()).to_string();
        let back: Mechanism = text.parse().unwrap();
        prop_assert_eq!(back.into_joints(), joints);
    }
}
