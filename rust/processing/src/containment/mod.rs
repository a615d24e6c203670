// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Containment strategies
//!
//! One strategy is selected per configuration from the zone kind and then
//! queried for every target, so the per-target loop never re-dispatches on
//! category. All strategies are read-only after construction and can be
//! shared across worker threads.

mod native;
mod solid;

pub use native::{NativeRoomContainment, NativeSpaceContainment, NativeZone};
pub use solid::{SolidContainment, SolidZone};

use crate::adapter::GeometricForm;
use crate::model::{ElementId, ZoneKind};
use crate::phase::PhaseSet;
use crate::settings::EngineSettings;
use std::ops::Range;
use zonemap_geometry::{Point3, RigidTransform};

/// A materialized zone ready for strategy construction
#[derive(Debug, Clone)]
pub struct PreparedZone {
    pub id: ElementId,
    pub form: GeometricForm,
    /// Phase indices (primary timeline) in which the zone is valid
    pub phases: PhaseSet,
}

/// What one target contributes to a containment query
#[derive(Debug, Clone)]
pub struct TargetQuery<'a> {
    pub points: &'a [Point3<f64>],
    /// Phase indices in which the target exists
    pub phases: Range<usize>,
}

#[derive(Debug)]
pub enum Containment {
    NativeRoom(NativeRoomContainment),
    NativeSpace(NativeSpaceContainment),
    ExtrudedArea(SolidContainment),
    SolidGeometry(SolidContainment),
}

impl Containment {
    /// Build the strategy for `kind`
    ///
    /// `link` places zones from a linked document into primary coordinates.
    /// `phase_aware` only affects room containment; it is off when the
    /// primary document has no timeline or the link's phases do not map onto
    /// it.
    pub fn build(
        kind: ZoneKind,
        zones: Vec<PreparedZone>,
        link: RigidTransform,
        phase_aware: bool,
        settings: &EngineSettings,
    ) -> Self {
        match kind {
            ZoneKind::Room => Containment::NativeRoom(NativeRoomContainment::new(
                native_zones(zones),
                link,
                phase_aware,
            )),
            ZoneKind::Space => {
                Containment::NativeSpace(NativeSpaceContainment::new(native_zones(zones), link))
            }
            ZoneKind::Area => Containment::ExtrudedArea(SolidContainment::new(
                solid_zones(zones, &link),
                settings.cell_size,
                settings.probe_epsilon,
            )),
            ZoneKind::Solid => Containment::SolidGeometry(SolidContainment::new(
                solid_zones(zones, &link),
                settings.cell_size,
                settings.probe_epsilon,
            )),
        }
    }

    /// Zone containing the target, if any
    pub fn resolve(&self, query: &TargetQuery<'_>) -> Option<ElementId> {
        match self {
            Containment::NativeRoom(c) => c.resolve(query),
            Containment::NativeSpace(c) => c.resolve(query.points),
            Containment::ExtrudedArea(c) | Containment::SolidGeometry(c) => c.resolve(query.points),
        }
    }

    pub fn zone_count(&self) -> usize {
        match self {
            Containment::NativeRoom(c) => c.len(),
            Containment::NativeSpace(c) => c.len(),
            Containment::ExtrudedArea(c) | Containment::SolidGeometry(c) => c.len(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Containment::NativeRoom(_) => "native-room",
            Containment::NativeSpace(_) => "native-space",
            Containment::ExtrudedArea(_) => "extruded-area",
            Containment::SolidGeometry(_) => "solid-geometry",
        }
    }
}

fn native_zones(zones: Vec<PreparedZone>) -> Vec<NativeZone> {
    zones
        .into_iter()
        .filter_map(|z| match z.form {
            GeometricForm::Native { boundary, .. } => Some(NativeZone {
                id: z.id,
                boundary,
                phases: z.phases,
            }),
            GeometricForm::Solid(_) => {
                tracing::debug!(zone = %z.id, "solid form handed to native containment, skipped");
                None
            }
        })
        .collect()
}

fn solid_zones(zones: Vec<PreparedZone>, link: &RigidTransform) -> Vec<SolidZone> {
    zones
        .into_iter()
        .filter_map(|z| match z.form.placed(link) {
            GeometricForm::Solid(solid) => Some(SolidZone { id: z.id, solid }),
            GeometricForm::Native { .. } => {
                tracing::debug!(zone = %z.id, "native form handed to solid containment, skipped");
                None
            }
        })
        .collect()
}
