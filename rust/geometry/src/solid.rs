// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed triangle solids and the probe-segment containment test
//!
//! A point is inside a solid when a short vertical probe segment starting at
//! the point has a non-empty interior part. Crossings of the vertical line
//! through the point are counted by parity, which holds for non-convex and
//! multi-shell solids as long as the shells are closed.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::transform::RigidTransform;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Volumes at or below this are treated as empty
pub const MIN_VOLUME: f64 = 1e-9;

/// Raw indexed triangle mesh as supplied by a host
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Closed, outward-facing box mesh
    pub fn from_box(bounds: &Aabb) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let vertices = vec![
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ];
        let triangles = vec![
            // bottom
            [0, 2, 1],
            [0, 3, 2],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // front (y = lo)
            [0, 1, 5],
            [0, 5, 4],
            // right (x = hi)
            [1, 2, 6],
            [1, 6, 5],
            // back (y = hi)
            [2, 3, 7],
            [2, 7, 6],
            // left (x = lo)
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self {
            vertices,
            triangles,
        }
    }

    /// Enclosed volume via the divergence theorem (absolute value)
    pub fn volume(&self) -> f64 {
        let mut sum = 0.0;
        for tri in &self.triangles {
            let (Some(a), Some(b), Some(c)) = (
                self.vertices.get(tri[0] as usize),
                self.vertices.get(tri[1] as usize),
                self.vertices.get(tri[2] as usize),
            ) else {
                continue;
            };
            sum += a.coords.dot(&b.coords.cross(&c.coords));
        }
        (sum / 6.0).abs()
    }
}

/// A validated closed solid with cached bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    mesh: TriangleMesh,
    bounds: Aabb,
    volume: f64,
}

impl Solid {
    /// Validate a mesh as a solid
    ///
    /// Fails with `NoGeometry` for empty meshes or dangling indices and with
    /// `NoVolume` when the enclosed volume is not positive.
    pub fn new(mesh: TriangleMesh) -> Result<Self> {
        if mesh.triangles.is_empty() {
            return Err(Error::NoGeometry("mesh has no triangles".to_string()));
        }
        let vertex_count = mesh.vertices.len();
        if let Some(bad) = mesh
            .triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(Error::NoGeometry(format!(
                "triangle index {} out of range ({} vertices)",
                bad, vertex_count
            )));
        }

        let bounds = Aabb::from_points(mesh.vertices.iter())
            .ok_or_else(|| Error::NoGeometry("mesh has no vertices".to_string()))?;
        if bounds.is_degenerate() {
            return Err(Error::NoGeometry("mesh has non-finite vertices".to_string()));
        }

        let volume = mesh.volume();
        if volume <= MIN_VOLUME {
            return Err(Error::NoVolume(format!("volume {:.3e}", volume)));
        }

        Ok(Self {
            mesh,
            bounds,
            volume,
        })
    }

    /// Pick the first sub-solid with positive volume
    pub fn first_with_volume(parts: &[TriangleMesh]) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::NoGeometry("no solids".to_string()));
        }
        parts
            .iter()
            .find_map(|part| Self::new(part.clone()).ok())
            .ok_or_else(|| {
                Error::NoVolume(format!("none of {} solids has a positive volume", parts.len()))
            })
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Copy of this solid moved by a rigid transform
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        let vertices: Vec<Point3<f64>> = self
            .mesh
            .vertices
            .iter()
            .map(|v| transform.apply(v))
            .collect();
        let bounds = Aabb::from_points(vertices.iter()).unwrap_or(self.bounds);
        Self {
            mesh: TriangleMesh::new(vertices, self.mesh.triangles.clone()),
            bounds,
            // Rigid motions preserve volume
            volume: self.volume,
        }
    }

    /// Heights at which the vertical line through `(x, y)` crosses the
    /// surface, unsorted
    ///
    /// Each triangle is tested in plan with edge orientations evaluated in a
    /// canonical vertex order, so a line through an edge or vertex shared by
    /// neighbouring triangles is counted by exactly one of them. A line lying
    /// exactly on an edge is resolved as if moved by `(ε, ε²)`.
    pub fn vertical_crossings(&self, x: f64, y: f64) -> SmallVec<[f64; 8]> {
        let mut heights = SmallVec::new();
        for tri in &self.mesh.triangles {
            let v0 = &self.mesh.vertices[tri[0] as usize];
            let v1 = &self.mesh.vertices[tri[1] as usize];
            let v2 = &self.mesh.vertices[tri[2] as usize];
            if let Some(z) = vertical_crossing(x, y, v0, v1, v2) {
                heights.push(z);
            }
        }
        heights
    }

    /// Probe-segment containment: `point → point + (0, 0, epsilon)` must have
    /// a non-empty interior part
    ///
    /// The point itself is inside when an odd number of crossings lies above
    /// it; otherwise the probe still reaches the interior when it crosses the
    /// surface before its end.
    pub fn contains_point(&self, point: &Point3<f64>, epsilon: f64) -> bool {
        let crossings = self.vertical_crossings(point.x, point.y);
        let above = crossings.iter().filter(|&&z| z > point.z).count();
        above % 2 == 1
            || crossings
                .iter()
                .any(|&z| z > point.z && z < point.z + epsilon)
    }
}

/// Height of the triangle's plane above `(x, y)` when the vertical line
/// through `(x, y)` crosses the triangle
fn vertical_crossing(
    x: f64,
    y: f64,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> Option<f64> {
    let normal: Vector3<f64> = (v1 - v0).cross(&(v2 - v0));
    // Vertical in plan
    if normal.z == 0.0 {
        return None;
    }

    let side = left_of_edge(v0, v1, x, y)?;
    if left_of_edge(v1, v2, x, y)? != side || left_of_edge(v2, v0, x, y)? != side {
        return None;
    }

    Some(v0.z - (normal.x * (x - v0.x) + normal.y * (y - v0.y)) / normal.z)
}

/// Whether `(x, y)` lies left of the plan edge `a → b`
///
/// The orientation is always evaluated from the lexicographically smaller
/// endpoint, so both triangles sharing an edge see bit-identical values. A
/// zero orientation is broken by nudging the point to `(x + ε, y + ε²)`.
/// `None` for an edge that is a single point in plan.
fn left_of_edge(a: &Point3<f64>, b: &Point3<f64>, x: f64, y: f64) -> Option<bool> {
    let swapped = b.x < a.x || (b.x == a.x && b.y < a.y);
    let (lo, hi) = if swapped { (b, a) } else { (a, b) };
    let (dx, dy) = (hi.x - lo.x, hi.y - lo.y);
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    let orientation = dx * (y - lo.y) - dy * (x - lo.x);
    let left = if orientation != 0.0 {
        orientation > 0.0
    } else if dy != 0.0 {
        dy < 0.0
    } else {
        dx > 0.0
    };
    Some(left != swapped)
}
