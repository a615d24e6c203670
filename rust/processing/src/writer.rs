// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute write planning and application
//!
//! Planning runs against the snapshot and decides, per matched target,
//! which attributes actually change. Everything that survives planning is
//! applied in one host transaction.

use crate::error::{Error, Result};
use crate::host::HostDocument;
use crate::model::{AttributeValue, ElementId, TargetEntity, ZoneEntity};
use crate::report::{Failure, FailureReason};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeWrite {
    pub element: ElementId,
    pub key: String,
    pub value: AttributeValue,
}

/// What copying one zone's attributes onto one target would do
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPlan {
    pub writes: Vec<AttributeWrite>,
    /// Target already holds the zone's value
    pub unchanged: usize,
    /// Configured target slots present on the element
    pub present: usize,
    pub read_only: usize,
    /// Slots whose storage type differs from the source value
    pub mismatches: Vec<String>,
    /// Owned by another collaborative session
    pub locked: bool,
}

impl TargetPlan {
    /// Nothing could be written because the target is protected
    pub fn is_unwritable(&self) -> bool {
        self.locked || (self.present > 0 && self.read_only == self.present)
    }
}

/// Plan the writes for one `(zone, target)` match
pub fn plan_target<'p, I>(zone: &ZoneEntity, target: &TargetEntity, pairs: I) -> TargetPlan
where
    I: IntoIterator<Item = (&'p str, &'p str)>,
{
    let mut plan = TargetPlan::default();
    if target.is_locked() {
        plan.locked = true;
        return plan;
    }

    for (source, dest) in pairs {
        let Some(value) = zone.attribute(source) else {
            continue;
        };
        let Some(slot) = target.slot(dest) else {
            tracing::debug!(element = %target.id, attribute = dest, "target has no such attribute");
            continue;
        };

        plan.present += 1;
        if slot.read_only {
            plan.read_only += 1;
            continue;
        }
        if slot.storage != value.storage_type() {
            plan.mismatches.push(format!(
                "storage type mismatch: '{}' is {}, '{}' stores {}",
                source,
                value.storage_type(),
                dest,
                slot.storage
            ));
            continue;
        }
        if slot.value.as_ref() == Some(value) {
            plan.unchanged += 1;
            continue;
        }

        plan.writes.push(AttributeWrite {
            element: target.id,
            key: dest.to_string(),
            value: value.clone(),
        });
    }
    plan
}

/// Writes applied by one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedBatch {
    pub written: usize,
    pub updated: FxHashSet<ElementId>,
    pub unwritable: FxHashSet<ElementId>,
    pub failed: FxHashSet<ElementId>,
    pub failures: Vec<Failure>,
}

/// Attribute writes for one configuration
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<AttributeWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, writes: impl IntoIterator<Item = AttributeWrite>) {
        self.writes.extend(writes);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply every write inside one transaction
    ///
    /// Individual write failures are collected and the rest continue. A
    /// failed commit rolls the whole batch back and is returned as the error.
    pub fn apply<H: HostDocument + ?Sized>(self, host: &mut H, transaction: &str) -> Result<AppliedBatch> {
        let mut applied = AppliedBatch::default();
        if self.writes.is_empty() {
            return Ok(applied);
        }

        host.begin_transaction(transaction)?;
        for write in self.writes {
            let element = write.element;
            match host.set_attribute(element, &write.key, write.value) {
                Ok(()) => {
                    applied.written += 1;
                    applied.updated.insert(element);
                }
                Err(e) => {
                    if matches!(e, Error::NotWritable(_)) {
                        applied.unwritable.insert(element);
                    } else {
                        tracing::warn!(element = %element, attribute = %write.key, error = %e, "attribute write failed");
                        applied.failed.insert(element);
                    }
                    applied.failures.push(Failure::new(element, FailureReason::from(&e)));
                }
            }
        }

        if let Err(e) = host.commit_transaction() {
            host.rollback_transaction();
            return Err(e);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{DocumentSnapshot, InMemoryDocument};
    use crate::model::{AttributeSlot, Category, Element, StorageType};

    fn zone() -> ZoneEntity {
        let mut e = Element::new(10, Category::Rooms);
        e.attributes
            .insert("Zone".into(), AttributeSlot::new(AttributeValue::Text("A".into())));
        e.attributes
            .insert("Rating".into(), AttributeSlot::new(AttributeValue::Integer(90)));
        e.attributes
            .insert("Blank".into(), AttributeSlot::new(AttributeValue::Text("".into())));
        ZoneEntity::from(&e)
    }

    fn wall() -> Element {
        let mut e = Element::new(1, Category::Other("Walls".into()));
        e.attributes
            .insert("Zone".into(), AttributeSlot::empty(StorageType::Text));
        e.attributes
            .insert("Rating".into(), AttributeSlot::empty(StorageType::Text));
        e.attributes.insert(
            "Note".into(),
            AttributeSlot::new(AttributeValue::Text("keep".into())),
        );
        e
    }

    #[test]
    fn test_plan_copies_and_detects_mismatch() {
        let target = TargetEntity::from(&wall());
        let plan = plan_target(
            &zone(),
            &target,
            [("Zone", "Zone"), ("Rating", "Rating"), ("Blank", "Note"), ("Zone", "Missing")],
        );

        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.writes[0].key, "Zone");
        assert_eq!(plan.mismatches.len(), 1);
        assert!(plan.mismatches[0].starts_with("storage type mismatch"));
        assert_eq!(plan.present, 2);
        assert!(!plan.is_unwritable());
    }

    #[test]
    fn test_plan_skips_equal_values() {
        let mut e = wall();
        e.attributes
            .insert("Zone".into(), AttributeSlot::new(AttributeValue::Text("A".into())));
        let plan = plan_target(&zone(), &TargetEntity::from(&e), [("Zone", "Zone")]);
        assert!(plan.writes.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_plan_read_only_and_locked() {
        let mut e = wall();
        e.attributes
            .insert("Zone".into(), AttributeSlot::empty(StorageType::Text).read_only());
        let plan = plan_target(&zone(), &TargetEntity::from(&e), [("Zone", "Zone")]);
        assert!(plan.is_unwritable());

        let mut e = wall();
        e.owned_by = Some("bob".into());
        let plan = plan_target(&zone(), &TargetEntity::from(&e), [("Zone", "Zone")]);
        assert!(plan.locked);
        assert!(plan.writes.is_empty());
    }

    #[test]
    fn test_apply_in_one_transaction() {
        let mut doc = InMemoryDocument::new(DocumentSnapshot {
            elements: vec![wall()],
            ..Default::default()
        });
        let mut batch = WriteBatch::new();
        batch.extend(plan_target(&zone(), &TargetEntity::from(&wall()), [("Zone", "Zone")]).writes);
        batch.extend([AttributeWrite {
            element: ElementId(77),
            key: "Zone".into(),
            value: AttributeValue::Text("A".into()),
        }]);

        let applied = batch.apply(&mut doc, "map").unwrap();
        assert_eq!(applied.written, 1);
        assert!(applied.failed.contains(&ElementId(77)));
        assert_eq!(applied.failures.len(), 1);
        assert_eq!(
            doc.attribute(ElementId(1), "Zone"),
            Some(&AttributeValue::Text("A".into()))
        );
    }

    #[test]
    fn test_empty_batch_opens_no_transaction() {
        let mut doc = InMemoryDocument::new(DocumentSnapshot::default());
        let applied = WriteBatch::new().apply(&mut doc, "noop").unwrap();
        assert_eq!(applied.written, 0);
        assert_eq!(doc.committed_writes(), 0);
    }
}
