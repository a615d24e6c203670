// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level elevations used to size extruded area zones

use crate::model::{ElementId, Level};
use rustc_hash::FxHashMap;

/// Levels sorted by elevation
#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    elevations: Vec<f64>,
    by_id: FxHashMap<ElementId, f64>,
}

impl LevelTable {
    pub fn new(levels: &[Level]) -> Self {
        let mut elevations: Vec<f64> = levels
            .iter()
            .map(|l| l.elevation)
            .filter(|e| e.is_finite())
            .collect();
        elevations.sort_by(|a, b| a.total_cmp(b));
        elevations.dedup();

        let by_id = levels.iter().map(|l| (l.id, l.elevation)).collect();
        Self { elevations, by_id }
    }

    pub fn elevation(&self, level: ElementId) -> Option<f64> {
        self.by_id.get(&level).copied()
    }

    /// Elevation of the nearest level strictly above `elevation`
    pub fn next_above(&self, elevation: f64) -> Option<f64> {
        let idx = self.elevations.partition_point(|&e| e <= elevation + 1e-9);
        self.elevations.get(idx).copied()
    }

    /// Level-to-level height at `elevation`, or `default_height` when there
    /// is no level above or the difference is not positive
    pub fn height_at(&self, elevation: f64, default_height: f64) -> f64 {
        match self.next_above(elevation) {
            Some(top) if top - elevation > 0.0 => top - elevation,
            _ => default_height,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
