//! Plane geometry
//!
//! Plane equations and plane/line intersection used to project a ZMP
//! reference onto a foot's sole plane.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Degeneracy threshold for normals and line directions
const GEOMETRY_EPSILON: f64 = 1e-12;

/// Plane `n · x + d = 0` with unit normal oriented upward (n.z ≥ 0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal
    pub normal: Vector3<f64>,
    /// Signed offset
    pub d: f64,
}

impl Plane {
    /// Plane through `point` with normal `normal`
    ///
    /// Returns `None` for a zero-length normal.
    pub fn from_point_normal(point: &Vector3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        if normal.norm() < GEOMETRY_EPSILON {
            return None;
        }

        let mut n = normal.normalize();
        if n.z < 0.0 {
            n = -n;
        }

        Some(Self {
            normal: n,
            d: -point.dot(&n),
        })
    }

    /// Plane through three points
    ///
    /// Returns `None` when the points are collinear.
    pub fn from_points(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        Self::from_point_normal(a, &n)
    }

    /// Signed distance from the plane along its normal
    pub fn signed_distance(&self, point: &Vector3<f64>) -> f64 {
        self.normal.dot(point) + self.d
    }

    /// Intersection of the line through `a` and `b` with this plane
    ///
    /// ```text
    /// x = a + t (b - a),   t = (-d - n·a) / n·(b - a)
    /// ```
    ///
    /// The line is unbounded in both directions. Returns `None` when the
    /// line is parallel to the plane.
    pub fn intersect_line(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Option<Vector3<f64>> {
        let ab = b - a;
        let denom = self.normal.dot(&ab);
        if denom.abs() < GEOMETRY_EPSILON {
            return None;
        }

        let t = (-self.d - self.normal.dot(a)) / denom;
        Some(a + ab * t)
    }
}
