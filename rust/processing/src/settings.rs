// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine tunables loaded from environment variables.

use std::str::FromStr;
use zonemap_geometry::DEFAULT_CELL_SIZE;

/// Engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Spatial hash cell edge length.
    pub cell_size: f64,
    /// Length of the vertical probe segment used by the solid test.
    pub probe_epsilon: f64,
    /// Area extrusion height when no level exists above the area's level.
    pub default_height: f64,
    /// Perpendicular offset of the extra samples beside a curve midpoint.
    pub curve_offset: f64,
    /// Largest gap accepted between consecutive boundary segments.
    pub boundary_tolerance: f64,
    /// Number of progress updates per configuration (20 = every 5%).
    pub progress_steps: usize,
    /// Number of worker threads for containment resolution.
    pub worker_threads: usize,
}

impl EngineSettings {
    /// Load settings from environment variables, falling back to the
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cell_size: env_or("ZONEMAP_CELL_SIZE", defaults.cell_size),
            probe_epsilon: env_or("ZONEMAP_PROBE_EPSILON", defaults.probe_epsilon),
            default_height: env_or("ZONEMAP_DEFAULT_HEIGHT", defaults.default_height),
            curve_offset: env_or("ZONEMAP_CURVE_OFFSET", defaults.curve_offset),
            boundary_tolerance: env_or("ZONEMAP_BOUNDARY_TOLERANCE", defaults.boundary_tolerance),
            progress_steps: env_or("ZONEMAP_PROGRESS_STEPS", defaults.progress_steps).max(1),
            worker_threads: env_or("ZONEMAP_WORKER_THREADS", defaults.worker_threads).max(1),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            probe_epsilon: 0.01,
            default_height: 10.0,
            curve_offset: 0.1,
            boundary_tolerance: 0.001,
            progress_steps: 20,
            worker_threads: num_cpus::get(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
