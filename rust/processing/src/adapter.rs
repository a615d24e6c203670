// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry adapter: zone shapes into containment-ready forms

use crate::levels::LevelTable;
use crate::model::{ZoneEntity, ZoneKind, ZoneShape};
use crate::settings::EngineSettings;
use zonemap_geometry::{
    extrude_loop, Aabb, BoundaryLoop, BoundarySegment, Error, PlanBoundary, Result, RigidTransform, Solid,
};

/// Cached geometric form of one zone, valid for one configuration run
#[derive(Debug, Clone)]
pub enum GeometricForm {
    /// Host boundary test, no explicit solid
    Native { boundary: PlanBoundary, bounds: Aabb },
    /// Closed solid (extruded area or mass)
    Solid(Solid),
}

impl GeometricForm {
    pub fn bounds(&self) -> &Aabb {
        match self {
            GeometricForm::Native { bounds, .. } => bounds,
            GeometricForm::Solid(solid) => solid.bounds(),
        }
    }

    /// Move a solid form into primary document coordinates; native forms
    /// stay in link coordinates and are tested with inverse-mapped points
    pub fn placed(self, transform: &RigidTransform) -> Self {
        match self {
            GeometricForm::Solid(solid) if !transform.is_identity() => {
                GeometricForm::Solid(solid.transformed(transform))
            }
            other => other,
        }
    }
}

/// Materializes zone geometry using the level table of the zone's document
pub struct GeometryAdapter<'a> {
    levels: &'a LevelTable,
    settings: &'a EngineSettings,
}

impl<'a> GeometryAdapter<'a> {
    pub fn new(levels: &'a LevelTable, settings: &'a EngineSettings) -> Self {
        Self { levels, settings }
    }

    pub fn materialize(&self, zone: &ZoneEntity, kind: ZoneKind) -> Result<GeometricForm> {
        match (kind, &zone.shape) {
            (ZoneKind::Room | ZoneKind::Space, ZoneShape::Native { loops, base, top }) => {
                self.native(loops, *base, *top)
            }
            (ZoneKind::Area, ZoneShape::Boundary { loops }) => self.extruded(zone, loops),
            (ZoneKind::Solid, ZoneShape::Solids { parts }) => {
                Solid::first_with_volume(parts).map(GeometricForm::Solid)
            }
            (_, ZoneShape::None) => Err(Error::NoGeometry(format!("{} zone is not placed", kind))),
            (_, _) => Err(Error::NoGeometry(format!(
                "{} zone carries no {} geometry",
                kind,
                expected_shape(kind)
            ))),
        }
    }

    fn native(&self, loops: &[Vec<BoundarySegment>], base: f64, top: f64) -> Result<GeometricForm> {
        let (outer, holes) = loops
            .split_first()
            .ok_or_else(|| Error::NoGeometry("zone has no boundary".to_string()))?;

        let tolerance = self.settings.boundary_tolerance;
        let outer = BoundaryLoop::from_segments(outer, tolerance)?;
        let holes = holes
            .iter()
            .map(|h| BoundaryLoop::from_segments(h, tolerance))
            .collect::<Result<Vec<_>>>()?;

        let boundary = PlanBoundary::new(outer, holes, base, top)?;
        if boundary.area() <= 0.0 {
            return Err(Error::NoGeometry("zone has zero area".to_string()));
        }
        let bounds = boundary.bounds();
        Ok(GeometricForm::Native { boundary, bounds })
    }

    /// Extrude the first boundary loop from the level elevation to the next
    /// level up
    fn extruded(&self, zone: &ZoneEntity, loops: &[Vec<BoundarySegment>]) -> Result<GeometricForm> {
        let first = loops
            .first()
            .ok_or_else(|| Error::NoGeometry("area has no boundary".to_string()))?;
        let boundary = BoundaryLoop::from_segments(first, self.settings.boundary_tolerance)?;

        let elevation = zone
            .level
            .and_then(|level| self.levels.elevation(level))
            .ok_or_else(|| Error::NoGeometry("area has no level".to_string()))?;
        let boundary = boundary.with_elevation(elevation);
        let height = self.levels.height_at(elevation, self.settings.default_height);

        extrude_loop(&boundary, elevation, height).map(GeometricForm::Solid)
    }
}

fn expected_shape(kind: ZoneKind) -> &'static str {
    match kind {
        ZoneKind::Room | ZoneKind::Space => "native boundary",
        ZoneKind::Area => "boundary loop",
        ZoneKind::Solid => "solid",
    }
}
