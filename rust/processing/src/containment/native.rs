// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room and space containment through the host boundary test

use super::TargetQuery;
use crate::model::ElementId;
use crate::phase::PhaseSet;
use smallvec::SmallVec;
use zonemap_geometry::{PlanBoundary, Point3, RigidTransform};

#[derive(Debug, Clone)]
pub struct NativeZone {
    pub id: ElementId,
    pub boundary: PlanBoundary,
    pub phases: PhaseSet,
}

/// Zones sorted by id, tested in link coordinates
#[derive(Debug)]
struct NativeZones {
    zones: Vec<NativeZone>,
    link: RigidTransform,
}

impl NativeZones {
    fn new(mut zones: Vec<NativeZone>, link: RigidTransform) -> Self {
        zones.sort_by_key(|z| z.id);
        Self { zones, link }
    }

    /// Query points mapped into the zones' document
    fn local_points(&self, points: &[Point3<f64>]) -> SmallVec<[Point3<f64>; 5]> {
        if self.link.is_identity() {
            points.iter().copied().collect()
        } else {
            points.iter().map(|p| self.link.apply_inverse(p)).collect()
        }
    }
}

fn contains_any(zone: &NativeZone, points: &[Point3<f64>]) -> bool {
    points.iter().any(|p| zone.boundary.contains(p))
}

/// Phase-aware room containment
///
/// Among rooms containing any sample point, the one valid in the latest
/// phase shared with the target wins; within that phase the lowest id wins.
#[derive(Debug)]
pub struct NativeRoomContainment {
    inner: NativeZones,
    phase_aware: bool,
}

impl NativeRoomContainment {
    pub fn new(zones: Vec<NativeZone>, link: RigidTransform, phase_aware: bool) -> Self {
        Self {
            inner: NativeZones::new(zones, link),
            phase_aware,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.zones.is_empty()
    }

    pub fn resolve(&self, query: &TargetQuery<'_>) -> Option<ElementId> {
        let points = self.inner.local_points(query.points);

        if !self.phase_aware {
            return self
                .inner
                .zones
                .iter()
                .find(|z| contains_any(z, &points))
                .map(|z| z.id);
        }

        // (latest shared phase, room)
        let mut best: Option<(usize, ElementId)> = None;
        for zone in &self.inner.zones {
            let Some(latest) = zone.phases.latest_in(&query.phases) else {
                continue;
            };
            // Zones come in id order, so an equal phase never displaces a lower id
            if best.is_some_and(|(phase, _)| phase >= latest) {
                continue;
            }
            if contains_any(zone, &points) {
                best = Some((latest, zone.id));
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Space containment: first space by id containing any sample point
#[derive(Debug)]
pub struct NativeSpaceContainment {
    inner: NativeZones,
}

impl NativeSpaceContainment {
    pub fn new(zones: Vec<NativeZone>, link: RigidTransform) -> Self {
        Self {
            inner: NativeZones::new(zones, link),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.zones.is_empty()
    }

    pub fn resolve(&self, points: &[Point3<f64>]) -> Option<ElementId> {
        let points = self.inner.local_points(points);
        self.inner
            .zones
            .iter()
            .find(|z| contains_any(z, &points))
            .map(|z| z.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Range;
    use zonemap_geometry::{BoundaryLoop, Point2, Vector3};

    fn room(id: i64, x0: f64, x1: f64, phases: Range<usize>) -> NativeZone {
        room_in(id, x0, x1, PhaseSet::from(phases))
    }

    fn room_in(id: i64, x0: f64, x1: f64, phases: PhaseSet) -> NativeZone {
        let outer = BoundaryLoop::from_points(
            vec![
                Point2::new(x0, 0.0),
                Point2::new(x1, 0.0),
                Point2::new(x1, 10.0),
                Point2::new(x0, 10.0),
            ],
            0.0,
        )
        .unwrap();
        NativeZone {
            id: ElementId(id),
            boundary: PlanBoundary::new(outer, Vec::new(), 0.0, 3.0).unwrap(),
            phases,
        }
    }

    fn query(points: &[Point3<f64>], phases: Range<usize>) -> TargetQuery<'_> {
        TargetQuery { points, phases }
    }

    #[test]
    fn test_latest_phase_wins() {
        // Room 1 only in phase 0, room 2 from phase 1 on, same footprint
        let rooms = NativeRoomContainment::new(
            vec![room(1, 0.0, 10.0, 0..1), room(2, 0.0, 10.0, 1..3)],
            RigidTransform::identity(),
            true,
        );
        let p = [Point3::new(5.0, 5.0, 1.0)];

        assert_eq!(rooms.resolve(&query(&p, 0..3)), Some(ElementId(2)));
        assert_eq!(rooms.resolve(&query(&p, 0..1)), Some(ElementId(1)));
    }

    #[test]
    fn test_demolished_room_never_matches_later_target() {
        let rooms = NativeRoomContainment::new(
            vec![room(1, 0.0, 10.0, 0..1)],
            RigidTransform::identity(),
            true,
        );
        let p = [Point3::new(5.0, 5.0, 1.0)];
        assert_eq!(rooms.resolve(&query(&p, 1..3)), None);
    }

    #[test]
    fn test_gap_in_zone_phases_is_respected() {
        // Room 1 valid in phases 0 and 2 but not 1
        let rooms = NativeRoomContainment::new(
            vec![
                room_in(1, 0.0, 10.0, PhaseSet::from_indices([2, 0])),
                room(2, 0.0, 10.0, 1..2),
            ],
            RigidTransform::identity(),
            true,
        );
        let p = [Point3::new(5.0, 5.0, 1.0)];

        assert_eq!(rooms.resolve(&query(&p, 1..2)), Some(ElementId(2)));
        assert_eq!(rooms.resolve(&query(&p, 0..3)), Some(ElementId(1)));
        assert_eq!(rooms.resolve(&query(&p, 0..2)), Some(ElementId(2)));

        let gapped = NativeRoomContainment::new(
            vec![room_in(1, 0.0, 10.0, PhaseSet::from_indices([0, 2]))],
            RigidTransform::identity(),
            true,
        );
        assert_eq!(gapped.resolve(&query(&p, 1..2)), None);
    }

    #[test]
    fn test_same_phase_overlap_lowest_id() {
        let rooms = NativeRoomContainment::new(
            vec![room(9, 0.0, 10.0, 0..2), room(4, 0.0, 10.0, 0..2)],
            RigidTransform::identity(),
            true,
        );
        let p = [Point3::new(5.0, 5.0, 1.0)];
        assert_eq!(rooms.resolve(&query(&p, 0..2)), Some(ElementId(4)));
    }

    #[test]
    fn test_any_sample_point_suffices() {
        let spaces = NativeSpaceContainment::new(
            vec![room(3, 0.0, 10.0, 0..1), room(5, 10.0, 20.0, 0..1)],
            RigidTransform::identity(),
        );
        // First sample sits in no space, second in space 5
        let pts = [Point3::new(-1.0, 5.0, 1.0), Point3::new(15.0, 5.0, 1.0)];
        assert_eq!(spaces.resolve(&pts), Some(ElementId(5)));
        assert_eq!(spaces.resolve(&[Point3::new(5.0, 5.0, 5.0)]), None);
    }

    #[test]
    fn test_linked_rooms_use_inverse_transform() {
        // Link shifted 100 units in X
        let link = RigidTransform::from_parts(Vector3::new(100.0, 0.0, 0.0), 0.0);
        let rooms = NativeRoomContainment::new(vec![room(1, 0.0, 10.0, 0..1)], link, false);

        assert_eq!(
            rooms.resolve(&query(&[Point3::new(105.0, 5.0, 1.0)], 0..0)),
            Some(ElementId(1))
        );
        assert_eq!(rooms.resolve(&query(&[Point3::new(5.0, 5.0, 1.0)], 0..0)), None);
    }
}
