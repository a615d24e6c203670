// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes

use crate::transform::RigidTransform;
use nalgebra::Point3;

/// Axis-aligned bounding box in model coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two corners (order does not matter)
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest box enclosing all points, `None` for an empty iterator
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.expand(p);
        }
        Some(bounds)
    }

    /// Grow the box to include a point
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Closed containment test (points on a face count as inside)
    #[inline]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// True when any extent is NaN or the box is inverted
    pub fn is_degenerate(&self) -> bool {
        let values = [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ];
        values.iter().any(|v| !v.is_finite())
            || self.min.x > self.max.x
            || self.min.y > self.max.y
            || self.min.z > self.max.z
    }

    /// Bounds of this box after a rigid transform (encloses all eight corners)
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        let (lo, hi) = (self.min, self.max);
        let corners = [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
        .map(|c| transform.apply(&c));

        // Eight corners are never empty
        Self::from_points(corners.iter()).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_new_orders_corners() {
        let b = Aabb::new(Point3::new(5.0, 0.0, 3.0), Point3::new(1.0, 2.0, -1.0));
        assert_eq!(b.min, Point3::new(1.0, 0.0, -1.0));
        assert_eq!(b.max, Point3::new(5.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains_is_closed() {
        let b = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(b.contains(&Point3::new(0.5, 0.5, 0.5)));
        assert!(b.contains(&Point3::new(1.0, 0.0, 0.5)));
        assert!(!b.contains(&Point3::new(1.0001, 0.5, 0.5)));
    }

    #[test]
    fn test_from_points_empty() {
        let none: Vec<Point3<f64>> = Vec::new();
        assert!(Aabb::from_points(none.iter()).is_none());
    }

    #[test]
    fn test_transformed_by_quarter_turn() {
        let b = Aabb::new(Point3::origin(), Point3::new(2.0, 1.0, 1.0));
        let t = RigidTransform::from_parts(
            Vector3::new(10.0, 0.0, 0.0),
            std::f64::consts::FRAC_PI_2,
        );
        let moved = b.transformed(&t);
        assert_relative_eq!(moved.min.x, 9.0, epsilon = 1e-9);
        assert_relative_eq!(moved.max.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(moved.min.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(moved.max.y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate() {
        let mut b = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(!b.is_degenerate());
        b.max.x = f64::NAN;
        assert!(b.is_degenerate());
    }
}
