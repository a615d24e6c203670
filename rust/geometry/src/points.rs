// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representative points for containment testing
//!
//! Point-like elements are tested at their insertion point. Linear elements
//! (walls, pipes, conduits) are sampled along their curve, because a single
//! midpoint frequently sits exactly on a room boundary. Any one sample
//! passing is enough for containment.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Sample points for one element, in test order
pub type SamplePoints = SmallVec<[Point3<f64>; 5]>;

/// Fractions of curve length sampled for linear elements
pub const CURVE_FRACTIONS: [f64; 3] = [0.25, 0.5, 0.75];

/// How an element is located in the model
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Location {
    /// Insertion point (furniture, devices, fixtures)
    Point(Point3<f64>),
    /// Location curve as a polyline (walls, pipes, ducts)
    Curve(Vec<Point3<f64>>),
    /// No native location
    #[default]
    None,
}

/// Generates representative points from an element's location
#[derive(Debug, Clone, Copy)]
pub struct PointSampler {
    curve_offset: f64,
}

impl PointSampler {
    /// `curve_offset` is the perpendicular distance of the extra samples taken
    /// beside a curve's midpoint
    pub fn new(curve_offset: f64) -> Self {
        Self { curve_offset }
    }

    /// Representative points for an element
    ///
    /// `planar` marks area-like elements whose location is not meaningful;
    /// they always use the bounding-box centre.
    pub fn points(&self, location: &Location, bounds: Option<&Aabb>, planar: bool) -> Result<SamplePoints> {
        let mut points = SamplePoints::new();

        if !planar {
            match location {
                Location::Point(p) if is_finite(p) => points.push(*p),
                Location::Curve(curve) => self.sample_curve(curve, &mut points),
                _ => {}
            }
        }

        if points.is_empty() {
            if let Some(b) = bounds.filter(|b| !b.is_degenerate()) {
                points.push(b.center());
            }
        }

        if points.is_empty() {
            return Err(Error::NoLocation(
                "element has neither a usable location nor a bounding box".to_string(),
            ));
        }
        Ok(points)
    }

    fn sample_curve(&self, curve: &[Point3<f64>], out: &mut SamplePoints) {
        let curve: SmallVec<[Point3<f64>; 8]> = curve.iter().copied().filter(is_finite).collect();
        match curve.len() {
            0 => return,
            1 => {
                out.push(curve[0]);
                return;
            }
            _ => {}
        }

        let length = polyline_length(&curve);
        if length < 1e-12 {
            out.push(curve[0]);
            return;
        }

        for fraction in CURVE_FRACTIONS {
            out.push(point_at_fraction(&curve, length, fraction).0);
        }

        // Midpoint nudged to either side of the curve in plan
        let (mid, tangent) = point_at_fraction(&curve, length, 0.5);
        let perpendicular = Vector3::new(-tangent.y, tangent.x, 0.0);
        if let Some(dir) = perpendicular.try_normalize(1e-12) {
            out.push(mid + dir * self.curve_offset);
            out.push(mid - dir * self.curve_offset);
        }
    }
}

impl Default for PointSampler {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[inline]
fn is_finite(p: &Point3<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

fn polyline_length(curve: &[Point3<f64>]) -> f64 {
    curve.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Point at `fraction` of the total length plus the direction of the
/// segment it falls on
fn point_at_fraction(curve: &[Point3<f64>], length: f64, fraction: f64) -> (Point3<f64>, Vector3<f64>) {
    let target = length * fraction;
    let mut walked = 0.0;

    for w in curve.windows(2) {
        let segment = w[1] - w[0];
        let segment_length = segment.norm();
        if segment_length < 1e-12 {
            continue;
        }
        if walked + segment_length >= target {
            let t = (target - walked) / segment_length;
            return (w[0] + segment * t, segment);
        }
        walked += segment_length;
    }

    // Floating point slack on the final segment
    let n = curve.len();
    (curve[n - 1], curve[n - 1] - curve[n - 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_location() {
        let sampler = PointSampler::default();
        let pts = sampler
            .points(&Location::Point(Point3::new(1.0, 2.0, 3.0)), None, false)
            .unwrap();
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0], Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_straight_curve_samples() {
        let sampler = PointSampler::new(0.1);
        let wall = Location::Curve(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(8.0, 0.0, 0.0)]);
        let pts = sampler.points(&wall, None, false).unwrap();

        assert_eq!(pts.len(), 5);
        assert_relative_eq!(pts[0].x, 2.0);
        assert_relative_eq!(pts[1].x, 4.0);
        assert_relative_eq!(pts[2].x, 6.0);
        // Perpendicular nudges at the midpoint
        assert_relative_eq!(pts[3].x, 4.0);
        assert_relative_eq!(pts[3].y, 0.1);
        assert_relative_eq!(pts[4].y, -0.1);
    }

    #[test]
    fn test_polyline_fractions_follow_length() {
        let sampler = PointSampler::default();
        let curve = Location::Curve(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 6.0, 0.0),
        ]);
        let pts = sampler.points(&curve, None, false).unwrap();
        // Total length 8: 25% = 2 (corner), 50% = 4 → (2, 2), 75% = 6 → (2, 4)
        assert_relative_eq!(pts[0].x, 2.0);
        assert_relative_eq!(pts[0].y, 0.0);
        assert_relative_eq!(pts[1].y, 2.0);
        assert_relative_eq!(pts[2].y, 4.0);
    }

    #[test]
    fn test_vertical_curve_has_no_offsets() {
        let sampler = PointSampler::default();
        let riser = Location::Curve(vec![Point3::new(1.0, 1.0, 0.0), Point3::new(1.0, 1.0, 4.0)]);
        let pts = sampler.points(&riser, None, false).unwrap();
        assert_eq!(pts.len(), 3);
    }

    #[test]
    fn test_bounding_box_fallback() {
        let sampler = PointSampler::default();
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0));
        let pts = sampler.points(&Location::None, Some(&bounds), false).unwrap();
        assert_eq!(pts.as_slice(), &[Point3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_planar_ignores_location() {
        let sampler = PointSampler::default();
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.0));
        let pts = sampler
            .points(&Location::Point(Point3::new(99.0, 99.0, 0.0)), Some(&bounds), true)
            .unwrap();
        assert_eq!(pts.as_slice(), &[Point3::new(5.0, 5.0, 0.0)]);
    }

    #[test]
    fn test_no_location() {
        let sampler = PointSampler::default();
        assert!(matches!(
            sampler.points(&Location::None, None, false),
            Err(Error::NoLocation(_))
        ));
    }
}
