//! Support polygon feasibility
//!
//! Decides which contact regime can realize a ZMP reference: the CoM→ZMP
//! ray is extended onto each candidate sole plane and tested against the
//! sole rectangle, then against the double support quadrilateral spanned by
//! the inner toe and heel corners of both feet.

use nalgebra::Vector3;
use stride_core::math::{Axis, Plane, Pose};

use crate::config::FootSize;
use crate::step::{FootType, StepData};

/// Vertical CoM→ZMP offsets below this are treated as degenerate
const VERTICAL_EPSILON: f64 = 1e-12;

/// Contact regime able to realize `zmp` (world frame) for the feet and CoM in `step`
///
/// Regions are tested right foot, left foot, then double support; the first
/// match wins. `Airborne` means no region contains the projected ZMP.
///
/// # Arguments
/// * `step` - Foot poses and CoM to test against
/// * `zmp` - ZMP reference [m]
/// * `foot` - Sole extents
/// * `margin` - Shrink of the toe, heel and outer edges [m]
pub fn support_foot_type(step: &StepData, zmp: &Vector3<f64>, foot: &FootSize, margin: f64) -> FootType {
    let com = step.com;
    let dz = zmp.z - com.z;
    if dz.abs() < VERTICAL_EPSILON {
        return FootType::Airborne;
    }

    let on_sole = |pose: &Pose| -> Option<Vector3<f64>> {
        let plane = Plane::from_point_normal(&pose.translation, &pose.axis(Axis::Z))?;
        let hit = plane.intersect_line(&com, zmp)?;
        Some(pose.inverse_transform_point(&hit))
    };

    if let Some(d) = on_sole(&step.rfoot) {
        if d.x < foot.toe - margin && d.x > -(foot.heel - margin) && d.y > -(foot.outer - margin) && d.y < foot.inner {
            return FootType::Right;
        }
    }

    if let Some(d) = on_sole(&step.lfoot) {
        if d.x < foot.toe - margin && d.x > -(foot.heel - margin) && d.y < foot.outer - margin && d.y > -foot.inner {
            return FootType::Left;
        }
    }

    // Inner corners, projected along the CoM ray to the ZMP height
    let project = |pose: &Pose, local: Vector3<f64>| -> Vector3<f64> {
        let v = pose.transform_point(&local) - com;
        v / v.z * dz + com
    };
    let rt = project(&step.rfoot, Vector3::new(foot.toe - margin, foot.inner, 0.0));
    let rh = project(&step.rfoot, Vector3::new(-foot.heel + margin, foot.inner, 0.0));
    let lt = project(&step.lfoot, Vector3::new(foot.toe - margin, -foot.inner, 0.0));
    let lh = project(&step.lfoot, Vector3::new(-foot.heel + margin, -foot.inner, 0.0));

    let rt2zmp = zmp - rt;
    let lh2zmp = zmp - lh;
    let inside = (lt - rt).cross(&rt2zmp).z >= 0.0
        && (rh - rt).cross(&rt2zmp).z <= 0.0
        && (rh - lh).cross(&lh2zmp).z >= 0.0
        && (lt - lh).cross(&lh2zmp).z <= 0.0;

    if inside {
        FootType::Double
    } else {
        FootType::Airborne
    }
}
