// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host document interfaces
//!
//! The engine never holds live handles into a host model. It pulls a
//! snapshot of zones and targets through [`DocumentSource`], computes every
//! match against that snapshot, and hands back one batch of attribute writes
//! through the transactional half of [`HostDocument`].

use crate::error::Result;
use crate::model::{AttributeValue, Category, ElementId, Level, Phase, TargetEntity, ZoneEntity};
use zonemap_geometry::RigidTransform;

/// Read access to a document (the primary model or a linked one)
pub trait DocumentSource {
    /// Elements of the given categories, as zones
    fn zones(&self, categories: &[Category]) -> Vec<ZoneEntity>;

    /// Elements of the given categories, as targets; an empty filter
    /// means every category
    fn targets(&self, categories: &[Category]) -> Vec<TargetEntity>;

    /// Phases in declaration order
    fn phases(&self) -> Vec<Phase>;

    fn levels(&self) -> Vec<Level>;
}

/// A linked document and its placement in the primary document
pub struct DocumentLink<'a> {
    pub document: &'a dyn DocumentSource,
    /// Maps link coordinates into primary coordinates
    pub transform: RigidTransform,
}

/// The primary document: readable, linkable and writable in transactions
pub trait HostDocument: DocumentSource {
    /// Resolve a linked document by name
    fn link(&self, name: &str) -> Option<DocumentLink<'_>>;

    fn begin_transaction(&mut self, name: &str) -> Result<()>;

    /// Stage one attribute write
    ///
    /// Fails with `NotWritable` when the slot is read-only or the element is
    /// owned by another session, `WriteFailed` for anything else.
    fn set_attribute(&mut self, element: ElementId, key: &str, value: AttributeValue) -> Result<()>;

    /// Apply every staged write atomically
    fn commit_transaction(&mut self) -> Result<()>;

    /// Drop every staged write
    fn rollback_transaction(&mut self);
}
