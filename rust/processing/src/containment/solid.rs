// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid containment with a spatial hash pre-filter
//!
//! Shared by extruded areas and mass / generic-model zones. For each sample
//! point the candidates from the grid are tried in ascending id order: a
//! bounding-box reject first, then the probe-segment solid test. The first
//! passing candidate wins, which makes overlapping zones resolve to the
//! lowest id whatever the cell layout.

use crate::model::ElementId;
use zonemap_geometry::{Point3, Solid, SpatialHashIndex};

#[derive(Debug, Clone)]
pub struct SolidZone {
    pub id: ElementId,
    pub solid: Solid,
}

#[derive(Debug)]
pub struct SolidContainment {
    /// Sorted by id; index keys are positions in this list
    zones: Vec<SolidZone>,
    index: SpatialHashIndex<usize>,
    probe_epsilon: f64,
}

impl SolidContainment {
    pub fn new(mut zones: Vec<SolidZone>, cell_size: f64, probe_epsilon: f64) -> Self {
        zones.sort_by_key(|z| z.id);
        let index = SpatialHashIndex::build(
            cell_size,
            zones.iter().enumerate().map(|(i, z)| (i, *z.solid.bounds())),
        );
        tracing::debug!(
            zones = zones.len(),
            cells = index.cell_count(),
            cell_size = index.cell_size(),
            "spatial index built"
        );
        Self {
            zones,
            index,
            probe_epsilon,
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn resolve(&self, points: &[Point3<f64>]) -> Option<ElementId> {
        points.iter().find_map(|p| self.resolve_point(p))
    }

    fn resolve_point(&self, point: &Point3<f64>) -> Option<ElementId> {
        self.index
            .candidates(point)
            .into_iter()
            .map(|i| &self.zones[i])
            .find(|z| self.contains(z, point))
            .map(|z| z.id)
    }

    #[inline]
    fn contains(&self, zone: &SolidZone, point: &Point3<f64>) -> bool {
        zone.solid.bounds().contains(point) && zone.solid.contains_point(point, self.probe_epsilon)
    }

    /// All-pairs scan without the index
    #[cfg(test)]
    fn resolve_exhaustive(&self, points: &[Point3<f64>]) -> Option<ElementId> {
        points
            .iter()
            .find_map(|p| self.zones.iter().find(|z| self.contains(z, p)).map(|z| z.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use zonemap_geometry::{Aabb, TriangleMesh};

    fn block(id: i64, min: (f64, f64, f64), max: (f64, f64, f64)) -> SolidZone {
        let bounds = Aabb::new(Point3::new(min.0, min.1, min.2), Point3::new(max.0, max.1, max.2));
        SolidZone {
            id: ElementId(id),
            solid: Solid::new(TriangleMesh::from_box(&bounds)).unwrap(),
        }
    }

    #[test]
    fn test_overlap_resolves_to_lowest_id() {
        // Inserted out of order, spanning several cells
        let containment = SolidContainment::new(
            vec![
                block(2, (0.0, 0.0, 0.0), (120.0, 120.0, 10.0)),
                block(1, (40.0, 40.0, 0.0), (60.0, 60.0, 10.0)),
            ],
            50.0,
            0.01,
        );
        let p = [Point3::new(55.0, 55.0, 5.0)];
        assert_eq!(containment.resolve(&p), Some(ElementId(1)));
        assert_eq!(containment.resolve(&[Point3::new(100.0, 100.0, 5.0)]), Some(ElementId(2)));
    }

    #[test]
    fn test_vertical_extent_checked() {
        let containment =
            SolidContainment::new(vec![block(1, (0.0, 0.0, 0.0), (10.0, 10.0, 3.0))], 50.0, 0.01);
        assert_eq!(containment.resolve(&[Point3::new(5.0, 5.0, 4.0)]), None);
        assert_eq!(containment.resolve(&[Point3::new(5.0, 5.0, 2.0)]), Some(ElementId(1)));
    }

    #[test]
    fn test_first_point_with_a_match_decides() {
        let containment = SolidContainment::new(
            vec![
                block(1, (0.0, 0.0, 0.0), (10.0, 10.0, 3.0)),
                block(2, (20.0, 0.0, 0.0), (30.0, 10.0, 3.0)),
            ],
            5.0,
            0.01,
        );
        let pts = [
            Point3::new(-5.0, 5.0, 1.0),
            Point3::new(25.0, 5.0, 1.0),
            Point3::new(5.0, 5.0, 1.0),
        ];
        assert_eq!(containment.resolve(&pts), Some(ElementId(2)));
    }

    #[test]
    fn test_boundary_point_is_consistent() {
        let containment =
            SolidContainment::new(vec![block(1, (0.0, 0.0, 0.0), (10.0, 10.0, 3.0))], 50.0, 0.01);
        let on_face = [Point3::new(10.0, 5.0, 1.0)];
        let first = containment.resolve(&on_face);
        for _ in 0..10 {
            assert_eq!(containment.resolve(&on_face), first);
        }
    }

    fn block_strategy() -> impl Strategy<Value = ((f64, f64, f64), (f64, f64, f64))> {
        (
            -100.0..100.0f64,
            -100.0..100.0f64,
            0.0..5.0f64,
            1.0..80.0f64,
            1.0..80.0f64,
            1.0..6.0f64,
        )
            .prop_map(|(x, y, z, w, d, h)| ((x, y, z), (x + w, y + d, z + h)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_index_matches_exhaustive(
            blocks in prop::collection::vec(block_strategy(), 1..25),
            points in prop::collection::vec((-120.0..200.0f64, -120.0..200.0f64, -1.0..12.0f64), 1..30),
            cell_size in 10.0..60.0f64,
        ) {
            let zones = blocks
                .iter()
                .enumerate()
                .map(|(i, (min, max))| block(i as i64 * 7 % 31, *min, *max))
                .collect();
            let containment = SolidContainment::new(zones, cell_size, 0.01);

            for (x, y, z) in points {
                let p = [Point3::new(x, y, z)];
                prop_assert_eq!(containment.resolve(&p), containment.resolve_exhaustive(&p));
            }
        }
    }
}
