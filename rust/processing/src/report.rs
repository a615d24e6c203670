// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run reports
//!
//! Skips and failures are collected here instead of being raised, so a
//! caller can present one end-of-run summary.

use crate::error::Error;
use crate::model::{ElementId, ZoneKind};
use serde::Serialize;
use std::fmt;
use zonemap_geometry::Error as GeometryError;

/// Why an element was skipped or failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    NoGeometry(String),
    InvalidBoundary(String),
    NoVolume(String),
    NoLocation(String),
    NotWritable(String),
    WriteFailed(String),
}

impl From<&GeometryError> for FailureReason {
    fn from(error: &GeometryError) -> Self {
        match error {
            GeometryError::NoGeometry(m) => FailureReason::NoGeometry(m.clone()),
            GeometryError::InvalidBoundary(m)
            | GeometryError::TriangulationError(m)
            | GeometryError::InvalidExtrusion(m) => FailureReason::InvalidBoundary(m.clone()),
            GeometryError::NoVolume(m) => FailureReason::NoVolume(m.clone()),
            GeometryError::NoLocation(m) => FailureReason::NoLocation(m.clone()),
        }
    }
}

impl From<&Error> for FailureReason {
    fn from(error: &Error) -> Self {
        match error {
            Error::Geometry(e) => FailureReason::from(e),
            Error::NotWritable(m) => FailureReason::NotWritable(m.clone()),
            other => FailureReason::WriteFailed(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoGeometry(m) => write!(f, "no geometry: {}", m),
            FailureReason::InvalidBoundary(m) => write!(f, "invalid boundary: {}", m),
            FailureReason::NoVolume(m) => write!(f, "no volume: {}", m),
            FailureReason::NoLocation(m) => write!(f, "no location: {}", m),
            FailureReason::NotWritable(m) => write!(f, "not writable: {}", m),
            FailureReason::WriteFailed(m) => write!(f, "write failed: {}", m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub element: ElementId,
    pub reason: FailureReason,
}

impl Failure {
    pub fn new(element: ElementId, reason: FailureReason) -> Self {
        Self { element, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ConfigurationStatus {
    Completed,
    /// Rejected before any work started
    Rejected(String),
    /// Abandoned without writing anything
    Cancelled,
    /// Every write was rolled back
    CommitFailed(String),
}

/// Counts for one configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationReport {
    pub id: String,
    pub name: String,
    pub strategy: Option<ZoneKind>,
    pub status: ConfigurationStatus,
    pub zones: usize,
    pub targets_total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub skipped_unwritable: usize,
    pub skipped_no_location: usize,
    pub failed_geometry: usize,
    pub write_failed: usize,
    pub targets_updated: usize,
    pub attributes_written: usize,
    pub attributes_unchanged: usize,
    pub failures: Vec<Failure>,
}

impl ConfigurationReport {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            strategy: None,
            status: ConfigurationStatus::Completed,
            zones: 0,
            targets_total: 0,
            matched: 0,
            unmatched: 0,
            skipped_unwritable: 0,
            skipped_no_location: 0,
            failed_geometry: 0,
            write_failed: 0,
            targets_updated: 0,
            attributes_written: 0,
            attributes_unchanged: 0,
            failures: Vec::new(),
        }
    }

    pub fn rejected(id: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut report = Self::new(id, name);
        report.status = ConfigurationStatus::Rejected(reason.into());
        report
    }

    pub fn is_completed(&self) -> bool {
        self.status == ConfigurationStatus::Completed
    }

    pub fn record(&mut self, element: ElementId, reason: FailureReason) {
        self.failures.push(Failure::new(element, reason));
    }

    /// Failures with a given element
    pub fn failures_for(&self, element: ElementId) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.element == element)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub configurations: Vec<ConfigurationReport>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn targets_updated(&self) -> usize {
        self.configurations.iter().map(|c| c.targets_updated).sum()
    }

    pub fn attributes_written(&self) -> usize {
        self.configurations.iter().map(|c| c.attributes_written).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.configurations.iter().map(|c| c.failures.len()).sum()
    }

    pub fn configuration(&self, name: &str) -> Option<&ConfigurationReport> {
        self.configurations.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.configurations {
            let status = match &c.status {
                ConfigurationStatus::Completed => "completed".to_string(),
                ConfigurationStatus::Rejected(r) => format!("rejected ({})", r),
                ConfigurationStatus::Cancelled => "cancelled".to_string(),
                ConfigurationStatus::CommitFailed(r) => format!("commit failed ({})", r),
            };
            writeln!(f, "{}: {}", c.name, status)?;
            if c.is_completed() {
                writeln!(
                    f,
                    "  zones {}  targets {}  matched {}  unmatched {}  unwritable {}  no location {}",
                    c.zones, c.targets_total, c.matched, c.unmatched, c.skipped_unwritable, c.skipped_no_location
                )?;
                writeln!(
                    f,
                    "  geometry failures {}  write failures {}  attributes written {}  unchanged {}",
                    c.failed_geometry, c.write_failed, c.attributes_written, c.attributes_unchanged
                )?;
            }
        }
        write!(
            f,
            "{} targets updated, {} attributes written, {} failures{}",
            self.targets_updated(),
            self.attributes_written(),
            self.failure_count(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}
