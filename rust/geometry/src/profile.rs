// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed 2D boundary loops
//!
//! Hosts hand zone boundaries over as a chain of segments. A loop is only
//! accepted when the chain is continuous, closed, free of self-intersections
//! and encloses a non-zero area.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use nalgebra::{Point2, Point3};

/// One straight boundary segment in model coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundarySegment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl BoundarySegment {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    /// Build a closed chain of segments through `points` at elevation `z`
    pub fn chain(points: &[(f64, f64)], z: f64) -> Vec<Self> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % n];
                Self::new(Point3::new(x0, y0, z), Point3::new(x1, y1, z))
            })
            .collect()
    }
}

/// A validated, closed, simple polygon on a horizontal plane
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLoop {
    points: Vec<Point2<f64>>,
    elevation: f64,
}

impl BoundaryLoop {
    /// Assemble a loop from connected segments
    ///
    /// `tolerance` is the largest XY gap accepted between the end of one
    /// segment and the start of the next. The loop elevation is taken from
    /// the first segment.
    pub fn from_segments(segments: &[BoundarySegment], tolerance: f64) -> Result<Self> {
        let first = segments
            .first()
            .ok_or_else(|| Error::InvalidBoundary("no boundary segments".to_string()))?;

        let n = segments.len();
        for i in 0..n {
            let current = &segments[i];
            let next = &segments[(i + 1) % n];
            let gap = planar_distance(&current.end, &next.start);
            if gap > tolerance {
                return Err(if i + 1 == n {
                    Error::InvalidBoundary(format!("loop is open (gap of {:.4})", gap))
                } else {
                    Error::InvalidBoundary(format!(
                        "gap of {:.4} between segments {} and {}",
                        gap,
                        i,
                        i + 1
                    ))
                });
            }
        }

        let points = segments
            .iter()
            .filter(|s| planar_distance(&s.start, &s.end) > tolerance)
            .map(|s| Point2::new(s.start.x, s.start.y))
            .collect();

        Self::from_points(points, first.start.z)
    }

    /// Validate an explicit vertex list (implicitly closed)
    pub fn from_points(points: Vec<Point2<f64>>, elevation: f64) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::InvalidBoundary(format!(
                "need at least 3 vertices, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) || !elevation.is_finite() {
            return Err(Error::InvalidBoundary("non-finite coordinate".to_string()));
        }
        if let Some((i, j)) = find_self_intersection(&points) {
            return Err(Error::InvalidBoundary(format!(
                "edges {} and {} intersect",
                i, j
            )));
        }

        let boundary = Self { points, elevation };
        if boundary.area() < 1e-12 {
            return Err(Error::InvalidBoundary("zero area".to_string()));
        }
        Ok(boundary)
    }

    #[inline]
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    #[inline]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Move the loop to another elevation
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    /// Shoelace area, positive for counter-clockwise loops
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Reorder vertices so the loop runs counter-clockwise
    pub fn counter_clockwise(mut self) -> Self {
        if self.signed_area() < 0.0 {
            self.points.reverse();
        }
        self
    }

    /// 2D ray-casting point-in-polygon test
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        let polygon = &self.points;
        let n = polygon.len();
        let mut inside = false;

        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (polygon[i].x, polygon[i].y);
            let (xj, yj) = (polygon[j].x, polygon[j].y);

            if ((yi > point.y) != (yj > point.y))
                && (point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// The host's own "is this point in the room" boundary: a plan polygon with
/// optional holes, bounded vertically by `[base, top)`
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBoundary {
    outer: BoundaryLoop,
    holes: Vec<BoundaryLoop>,
    base: f64,
    top: f64,
}

impl PlanBoundary {
    pub fn new(outer: BoundaryLoop, holes: Vec<BoundaryLoop>, base: f64, top: f64) -> Result<Self> {
        if !(top > base) {
            return Err(Error::InvalidBoundary(format!(
                "top {:.3} is not above base {:.3}",
                top, base
            )));
        }
        Ok(Self {
            outer,
            holes,
            base,
            top,
        })
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        if point.z < self.base || point.z >= self.top {
            return false;
        }
        let plan = Point2::new(point.x, point.y);
        self.outer.contains(&plan) && !self.holes.iter().any(|h| h.contains(&plan))
    }

    /// Net plan area (outer minus holes)
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(BoundaryLoop::area).sum();
        (self.outer.area() - holes).max(0.0)
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::new(
            Point3::new(self.outer.points[0].x, self.outer.points[0].y, self.base),
            Point3::new(self.outer.points[0].x, self.outer.points[0].y, self.top),
        );
        for p in &self.outer.points {
            bounds.expand(&Point3::new(p.x, p.y, self.base));
        }
        bounds
    }
}

#[inline]
fn planar_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Find the first pair of non-adjacent edges that touch or cross
fn find_self_intersection(points: &[Point2<f64>]) -> Option<(usize, usize)> {
    let n = points.len();
    for i in 0..n {
        let a0 = &points[i];
        let a1 = &points[(i + 1) % n];
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            let b0 = &points[j];
            let b1 = &points[(j + 1) % n];
            if adjacent {
                // Adjacent edges may only share their common vertex
                if collinear_overlap(a0, a1, b0, b1) {
                    return Some((i, j));
                }
                continue;
            }
            if segments_intersect(a0, a1, b0, b1) {
                return Some((i, j));
            }
        }
    }
    None
}

#[inline]
fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[inline]
fn on_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) - 1e-12
        && p.x <= a.x.max(b.x) + 1e-12
        && p.y >= a.y.min(b.y) - 1e-12
        && p.y <= a.y.max(b.y) + 1e-12
}

fn segments_intersect(a0: &Point2<f64>, a1: &Point2<f64>, b0: &Point2<f64>, b1: &Point2<f64>) -> bool {
    const EPS: f64 = 1e-12;
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);

    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }

    (d1.abs() <= EPS && on_segment(b0, b1, a0))
        || (d2.abs() <= EPS && on_segment(b0, b1, a1))
        || (d3.abs() <= EPS && on_segment(a0, a1, b0))
        || (d4.abs() <= EPS && on_segment(a0, a1, b1))
}

/// Adjacent edges folding back onto each other
fn collinear_overlap(a0: &Point2<f64>, a1: &Point2<f64>, b0: &Point2<f64>, b1: &Point2<f64>) -> bool {
    // Shared vertex is a1 == b0 (or b1 == a0 for the wrap-around pair)
    let (shared, p, q) = if a1 == b0 {
        (a1, a0, b1)
    } else {
        (a0, a1, b0)
    };
    let u = p - shared;
    let v = q - shared;
    let cross = u.x * v.y - u.y * v.x;
    cross.abs() <= 1e-12 * u.norm().max(1.0) * v.norm().max(1.0) && u.dot(&v) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_segments(size: f64, z: f64) -> Vec<BoundarySegment> {
        BoundarySegment::chain(&[(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)], z)
    }

    #[test]
    fn test_loop_from_closed_segments() {
        let boundary = BoundaryLoop::from_segments(&square_segments(10.0, 3.0), 0.001).unwrap();
        assert_eq!(boundary.points().len(), 4);
        assert_relative_eq!(boundary.area(), 100.0);
        assert_relative_eq!(boundary.elevation(), 3.0);
    }

    #[test]
    fn test_loop_with_gap_is_rejected() {
        let mut segments = square_segments(10.0, 0.0);
        segments[1].start.x += 0.5;
        let err = BoundaryLoop::from_segments(&segments, 0.001).unwrap_err();
        assert!(matches!(err, Error::InvalidBoundary(_)));
    }

    #[test]
    fn test_open_loop_is_rejected() {
        let mut segments = square_segments(10.0, 0.0);
        segments.pop();
        assert!(BoundaryLoop::from_segments(&segments, 0.001).is_err());
    }

    #[test]
    fn test_bow_tie_is_rejected() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        let err = BoundaryLoop::from_points(points, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidBoundary(_)));
    }

    #[test]
    fn test_small_gap_within_tolerance_is_accepted() {
        let mut segments = square_segments(10.0, 0.0);
        segments[2].start.y += 0.0005;
        assert!(BoundaryLoop::from_segments(&segments, 0.001).is_ok());
    }

    #[test]
    fn test_contains_concave() {
        let l_shape = BoundaryLoop::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 1.0),
                Point2::new(1.0, 1.0),
                Point2::new(1.0, 4.0),
                Point2::new(0.0, 4.0),
            ],
            0.0,
        )
        .unwrap();
        assert!(l_shape.contains(&Point2::new(0.5, 3.0)));
        assert!(l_shape.contains(&Point2::new(3.0, 0.5)));
        assert!(!l_shape.contains(&Point2::new(3.0, 3.0)));
    }

    #[test]
    fn test_plan_boundary_vertical_extent_and_holes() {
        let outer = BoundaryLoop::from_segments(&square_segments(10.0, 0.0), 0.001).unwrap();
        let hole = BoundaryLoop::from_points(
            vec![
                Point2::new(4.0, 4.0),
                Point2::new(6.0, 4.0),
                Point2::new(6.0, 6.0),
                Point2::new(4.0, 6.0),
            ],
            0.0,
        )
        .unwrap();
        let plan = PlanBoundary::new(outer, vec![hole], 0.0, 3.0).unwrap();

        assert!(plan.contains(&Point3::new(1.0, 1.0, 1.0)));
        assert!(!plan.contains(&Point3::new(5.0, 5.0, 1.0)));
        assert!(!plan.contains(&Point3::new(1.0, 1.0, 3.0)));
        assert!(!plan.contains(&Point3::new(1.0, 1.0, -0.1)));
        assert_relative_eq!(plan.area(), 96.0);
    }

    #[test]
    fn test_counter_clockwise() {
        let cw = BoundaryLoop::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 1.0),
                Point2::new(1.0, 0.0),
            ],
            0.0,
        )
        .unwrap();
        assert!(cw.signed_area() < 0.0);
        assert!(cw.counter_clockwise().signed_area() > 0.0);
    }
}
