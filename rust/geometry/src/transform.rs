// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rigid transforms between linked documents
//!
//! A linked document places its contents in the host document through a
//! rotation plus translation. Zone geometry read from a link is moved into
//! host coordinates before any containment test runs.

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Rotation + translation (no scale, no shear)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidTransform {
    isometry: Isometry3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            isometry: Isometry3::identity(),
        }
    }

    /// Translation followed by a rotation about the vertical axis, the common
    /// case for building links
    pub fn from_parts(translation: Vector3<f64>, rotation_z: f64) -> Self {
        Self {
            isometry: Isometry3::new(translation, Vector3::z() * rotation_z),
        }
    }

    /// Build from an origin and the link's local Z and X axes expressed in
    /// host coordinates
    ///
    /// Axes are orthonormalized: X is projected onto the plane perpendicular
    /// to Z, and Y is Z × X.
    pub fn from_axes(origin: Point3<f64>, z_axis: Vector3<f64>, x_axis: Vector3<f64>) -> Self {
        let z = z_axis.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        let x_normalized = x_axis.try_normalize(1e-12).unwrap_or_else(Vector3::x);

        // Ensure X is orthogonal to Z
        let x_orthogonal = x_normalized - z * x_normalized.dot(&z);
        let x = if x_orthogonal.norm() > 1e-6 {
            x_orthogonal.normalize()
        } else if z.z.abs() < 0.9 {
            Vector3::z().cross(&z).normalize()
        } else {
            Vector3::x().cross(&z).normalize()
        };
        let y = z.cross(&x).normalize();

        let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]));
        Self {
            isometry: Isometry3::from_parts(
                Translation3::from(origin.coords),
                UnitQuaternion::from_rotation_matrix(&rotation),
            ),
        }
    }

    /// Map a point from link coordinates into host coordinates
    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.isometry.transform_point(point)
    }

    /// Map a point from host coordinates back into link coordinates
    #[inline]
    pub fn apply_inverse(&self, point: &Point3<f64>) -> Point3<f64> {
        self.isometry.inverse_transform_point(point)
    }

    pub fn inverse(&self) -> Self {
        Self {
            isometry: self.isometry.inverse(),
        }
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.isometry.translation.vector
    }

    /// Rotation angle about the vertical axis (exact for plan rotations)
    pub fn rotation_z(&self) -> f64 {
        self.isometry.rotation.euler_angles().2
    }

    pub fn is_identity(&self) -> bool {
        self.isometry.translation.vector.norm() < 1e-12 && self.isometry.rotation.angle() < 1e-12
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_is_noop() {
        let t = RigidTransform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(t.apply(&p), p);
        assert!(t.is_identity());
    }

    #[test]
    fn test_quarter_turn_then_translate() {
        let t = RigidTransform::from_parts(Vector3::new(100.0, 0.0, 5.0), FRAC_PI_2);
        let p = t.apply(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = RigidTransform::from_parts(Vector3::new(-3.0, 7.5, 1.0), 0.7);
        let p = Point3::new(4.0, -2.0, 9.0);
        let back = t.apply_inverse(&t.apply(&p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-9);
    }

    #[test]
    fn test_from_axes_orthogonalizes() {
        // X slightly tilted towards Z gets projected back onto the XY plane
        let t = RigidTransform::from_axes(
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 1.0, 0.1),
        );
        let p = t.apply(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-9);
    }
}
