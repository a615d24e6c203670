// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion of boundary loops into prism solids

use crate::error::{Error, Result};
use crate::profile::BoundaryLoop;
use crate::solid::{Solid, TriangleMesh};
use crate::triangulation::triangulate_polygon;
use nalgebra::{Point2, Point3};

/// Extrude a boundary loop vertically from `base_z` by `height`
///
/// The loop's own elevation is ignored; the prism always starts at `base_z`.
pub fn extrude_loop(boundary: &BoundaryLoop, base_z: f64, height: f64) -> Result<Solid> {
    if !(height > 0.0) || !height.is_finite() {
        return Err(Error::InvalidExtrusion(format!(
            "height must be positive, got {}",
            height
        )));
    }

    // Counter-clockwise outer loops give outward-facing side walls
    let outer = boundary.clone().counter_clockwise();
    let points = outer.points();
    let indices = triangulate_polygon(points)?;

    let top_z = base_z + height;
    let n = points.len();
    let mut mesh = TriangleMesh::new(
        Vec::with_capacity(n * 2),
        Vec::with_capacity(indices.len() / 3 * 2 + n * 2),
    );

    create_caps(points, &indices, base_z, top_z, &mut mesh);
    create_side_walls(points, &mut mesh);

    Solid::new(mesh)
}

/// Bottom cap at `base_z` (facing down) and top cap at `top_z` (facing up)
///
/// Bottom vertices occupy `0..n`, top vertices `n..2n`.
fn create_caps(points: &[Point2<f64>], indices: &[usize], base_z: f64, top_z: f64, mesh: &mut TriangleMesh) {
    let n = points.len() as u32;

    for p in points {
        mesh.vertices.push(Point3::new(p.x, p.y, base_z));
    }
    for p in points {
        mesh.vertices.push(Point3::new(p.x, p.y, top_z));
    }

    for tri in indices.chunks_exact(3) {
        let (i0, mut i1, mut i2) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);

        // Triangulators do not promise a winding; force counter-clockwise in plan
        let (p0, p1, p2) = (&points[tri[0]], &points[tri[1]], &points[tri[2]]);
        let cross = (p1.x - p0.x) * (p2.y - p0.y) - (p1.y - p0.y) * (p2.x - p0.x);
        if cross < 0.0 {
            std::mem::swap(&mut i1, &mut i2);
        }

        // Reverse winding for bottom cap
        mesh.triangles.push([i0, i2, i1]);
        mesh.triangles.push([n + i0, n + i1, n + i2]);
    }
}

/// Side quads between consecutive boundary vertices, sharing the cap vertices
fn create_side_walls(points: &[Point2<f64>], mesh: &mut TriangleMesh) {
    let n = points.len();
    let offset = n as u32;

    for i in 0..n {
        let j = (i + 1) % n;
        let edge = points[j] - points[i];
        if edge.norm_squared() < 1e-20 {
            continue; // duplicate consecutive point
        }

        let (b0, b1) = (i as u32, j as u32);
        let (t0, t1) = (offset + b0, offset + b1);
        mesh.triangles.push([b0, b1, t1]);
        mesh.triangles.push([b0, t1, t0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::BoundarySegment;
    use approx::assert_relative_eq;

    fn l_shape() -> BoundaryLoop {
        BoundaryLoop::from_points(
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
        .unwrap()
    }

    #[test]
    fn test_extrude_square_volume() {
        let segments =
            BoundarySegment::chain(&[(0.0, 0.0), (5.0, 0.0), (5.0, 4.0), (0.0, 4.0)], 0.0);
        let boundary = BoundaryLoop::from_segments(&segments, 0.001).unwrap();
        let solid = extrude_loop(&boundary, 2.0, 3.0).unwrap();

        assert_relative_eq!(solid.volume(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(solid.bounds().min.z, 2.0);
        assert_relative_eq!(solid.bounds().max.z, 5.0);
    }

    #[test]
    fn test_extrude_concave_containment() {
        let solid = extrude_loop(&l_shape(), 0.0, 3.0).unwrap();

        assert_relative_eq!(solid.volume(), 21.0, epsilon = 1e-9);
        assert!(solid.contains_point(&Point3::new(0.5, 3.5, 1.0), 0.01));
        assert!(solid.contains_point(&Point3::new(3.5, 0.5, 1.0), 0.01));
        // In the notch of the L
        assert!(!solid.contains_point(&Point3::new(3.0, 3.0, 1.0), 0.01));
        // Above the prism
        assert!(!solid.contains_point(&Point3::new(0.5, 0.5, 3.5), 0.01));
    }

    #[test]
    fn test_clockwise_loop_extrudes_the_same() {
        let cw = BoundaryLoop::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 2.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 0.0),
            ],
            0.0,
        )
        .unwrap();
        let solid = extrude_loop(&cw, 0.0, 1.0).unwrap();
        assert_relative_eq!(solid.volume(), 4.0, epsilon = 1e-9);
    }

    /// Points strictly inside every internal cap diagonal, at mid height
    fn diagonal_points(boundary: &BoundaryLoop, z: f64) -> Vec<Point3<f64>> {
        let outer = boundary.clone().counter_clockwise();
        let points = outer.points();
        let n = points.len();
        let indices = triangulate_polygon(points).unwrap();

        let mut samples = Vec::new();
        for tri in indices.chunks_exact(3) {
            for (i, j) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let gap = i.abs_diff(j);
                if gap == 1 || gap == n - 1 {
                    continue; // boundary edge
                }
                for k in 1..200 {
                    let p = points[i] + (points[j] - points[i]) * (k as f64 / 200.0);
                    samples.push(Point3::new(p.x, p.y, z));
                }
            }
        }
        samples
    }

    #[test]
    fn test_fan_cap_diagonals_are_inside() {
        // Convex heptagon, capped with a fan from its first vertex
        let heptagon: Vec<Point2<f64>> = (0..7)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 7.0 + 0.3;
                Point2::new(0.37 + 5.0 * a.cos(), 1.21 + 5.0 * a.sin())
            })
            .collect();
        let boundary = BoundaryLoop::from_points(heptagon, 0.0).unwrap();
        let solid = extrude_loop(&boundary, 0.0, 3.0).unwrap();

        let samples = diagonal_points(&boundary, 1.5);
        assert!(!samples.is_empty());
        for p in samples {
            assert!(solid.contains_point(&p, 0.01), "{:?}", p);
        }
    }

    #[test]
    fn test_earcut_cap_diagonals_are_inside() {
        let boundary = BoundaryLoop::from_points(
            vec![
                Point2::new(0.1, 0.3),
                Point2::new(6.7, 0.3),
                Point2::new(6.7, 2.9),
                Point2::new(3.3, 1.7),
                Point2::new(2.1, 5.3),
                Point2::new(0.1, 4.1),
            ],
            0.0,
        )
        .unwrap();
        let solid = extrude_loop(&boundary, 1.0, 2.5).unwrap();

        let samples = diagonal_points(&boundary, 2.25);
        assert!(!samples.is_empty());
        for p in samples {
            assert!(solid.contains_point(&p, 0.01), "{:?}", p);
        }
    }

    #[test]
    fn test_non_positive_height_is_rejected() {
        assert!(matches!(
            extrude_loop(&l_shape(), 0.0, 0.0),
            Err(Error::InvalidExtrusion(_))
        ));
        assert!(extrude_loop(&l_shape(), 0.0, -1.0).is_err());
    }
}
