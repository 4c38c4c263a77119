use std::collections::HashSet;

use crate::model::{GROUND, Joint, JointKind};

/// Mobility of the mechanism by the planar Gruebler-Kutzbach equation.
///
/// Only joints on two or more links take part. A revolute joint on `n`
/// links acts as `n - 1` full joints; a prismatic joint as one full joint
/// plus `n - 2` extra; a revolute-prismatic joint as one half joint plus
/// `n - 2` full joints.
pub fn compute_dof(joints: &[Joint]) -> i32 {
    let mut links: HashSet<&str> = HashSet::from([GROUND]);
    let mut j1 = 0i32;
    let mut j2 = 0i32;
    for joint in joints {
        let n = joint.links.len() as i32;
        if n < 2 {
            continue;
        }
        links.extend(joint.links.iter().map(String::as_str));
        match joint.kind {
            JointKind::R => j1 += n - 1,
            JointKind::P => j1 += 1 + (n - 2),
            JointKind::RP => {
                j1 += n - 2;
                j2 += 1;
            }
        }
    }
    3 * (links.len() as i32 - 1) - 2 * j1 - j2
}
