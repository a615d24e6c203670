// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hash index for zone candidate lookup
//!
//! A 2D grid on the horizontal plane. Every zone is registered in each cell
//! its bounding box overlaps; vertical extent is left to the bounding-box and
//! solid tests. Queries gather the 3x3 neighborhood around a point's cell so
//! the candidate set is a small constant for zones of realistic size.

use crate::bounds::Aabb;
use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

/// Default cell edge length in model units
pub const DEFAULT_CELL_SIZE: f64 = 50.0;

/// Zones spanning more cells than this are kept in a separate list that every
/// query returns, instead of being smeared across the grid
const MAX_CELLS_PER_ENTRY: i64 = 65_536;

/// Grid index mapping `(ix, iy)` cells to the zone keys overlapping them.
///
/// Cell lists are kept sorted by key so candidates come back in ascending
/// identifier order. The index is a snapshot: it is built once and not
/// updated when geometry changes.
#[derive(Debug, Clone)]
pub struct SpatialHashIndex<K> {
    cell_size: f64,
    cells: FxHashMap<(i64, i64), Vec<K>>,
    oversized: Vec<K>,
    keys: FxHashSet<K>,
}

impl<K: Copy + Ord + Hash> SpatialHashIndex<K> {
    /// Creates an empty index. Non-positive or non-finite sizes fall back to
    /// [`DEFAULT_CELL_SIZE`].
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: FxHashMap::default(),
            oversized: Vec::new(),
            keys: FxHashSet::default(),
        }
    }

    /// Builds an index from `(key, bounds)` pairs
    pub fn build<I>(cell_size: f64, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Aabb)>,
    {
        let mut index = Self::new(cell_size);
        for (key, bounds) in entries {
            index.insert(key, &bounds);
        }
        index
    }

    /// Registers a key in every cell its bounding box overlaps.
    ///
    /// Returns `false` (and registers nothing) for degenerate boxes.
    pub fn insert(&mut self, key: K, bounds: &Aabb) -> bool {
        if bounds.is_degenerate() {
            return false;
        }

        let (x0, y0) = self.cell_coords(bounds.min.x, bounds.min.y);
        let (x1, y1) = self.cell_coords(bounds.max.x, bounds.max.y);

        let span = (i128::from(x1) - i128::from(x0) + 1) * (i128::from(y1) - i128::from(y0) + 1);
        if span > i128::from(MAX_CELLS_PER_ENTRY) {
            insert_sorted(&mut self.oversized, key);
        } else {
            for ix in x0..=x1 {
                for iy in y0..=y1 {
                    insert_sorted(self.cells.entry((ix, iy)).or_default(), key);
                }
            }
        }

        self.keys.insert(key);
        true
    }

    /// Candidate keys for a point: the union of its 3x3 cell neighborhood,
    /// deduplicated and sorted ascending.
    pub fn candidates(&self, point: &Point3<f64>) -> Vec<K> {
        let (cx, cy) = self.cell_coords(point.x, point.y);
        let mut seen: FxHashSet<K> = FxHashSet::default();
        let mut result: Vec<K> = Vec::new();

        // Search 3x3 neighborhood
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(keys) = self.cells.get(&(cx + dx, cy + dy)) {
                    for &key in keys {
                        if seen.insert(key) {
                            result.push(key);
                        }
                    }
                }
            }
        }

        for &key in &self.oversized {
            if seen.insert(key) {
                result.push(key);
            }
        }

        result.sort_unstable();
        result
    }

    /// Keys registered in one cell, in ascending order
    pub fn cell(&self, ix: i64, iy: i64) -> &[K] {
        self.cells.get(&(ix, iy)).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of distinct registered keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Grid cell of a plan position
    #[inline]
    pub fn cell_coords(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }
}

fn insert_sorted<K: Ord>(list: &mut Vec<K>, key: K) {
    if let Err(pos) = list.binary_search(&key) {
        list.insert(pos, key);
    }
}
