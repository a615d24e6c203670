// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ZoneMap Geometry
//!
//! Geometry kernel for spatial containment: boundary loops and plan
//! boundaries, extruded and meshed solids with a vertical-crossing inside test,
//! representative sample points, and a grid spatial hash for candidate
//! pruning. Uses earcutr for cap triangulation and nalgebra for transforms.

pub mod bounds;
pub mod error;
pub mod extrusion;
pub mod points;
pub mod profile;
pub mod solid;
pub mod spatial_index;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use bounds::Aabb;
pub use error::{Error, Result};
pub use extrusion::extrude_loop;
pub use points::{Location, PointSampler, SamplePoints};
pub use profile::{BoundaryLoop, BoundarySegment, PlanBoundary};
pub use solid::{Solid, TriangleMesh};
pub use spatial_index::{SpatialHashIndex, DEFAULT_CELL_SIZE};
pub use transform::RigidTransform;
pub use triangulation::triangulate_polygon;
