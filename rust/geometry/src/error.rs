// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while materializing or testing geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("No geometry: {0}")]
    NoGeometry(String),

    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("No volume: {0}")]
    NoVolume(String),

    #[error("No location: {0}")]
    NoLocation(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid extrusion parameters: {0}")]
    InvalidExtrusion(String),
}
