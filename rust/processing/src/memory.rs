// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host document backed by a JSON snapshot

use crate::error::{Error, Result};
use crate::host::{DocumentLink, DocumentSource, HostDocument};
use crate::model::{AttributeValue, Category, Element, ElementId, Level, Phase, TargetEntity, ZoneEntity};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use zonemap_geometry::{RigidTransform, Vector3};

/// Serialized form of a document and its links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkSnapshot>,
}

/// A linked document placed by a translation and a rotation about Z
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub name: String,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Radians, counter-clockwise
    #[serde(default)]
    pub rotation: f64,
    pub document: DocumentSnapshot,
}

impl LinkSnapshot {
    pub fn transform(&self) -> RigidTransform {
        let [x, y, z] = self.translation;
        RigidTransform::from_parts(Vector3::new(x, y, z), self.rotation)
    }
}

#[derive(Debug)]
struct Transaction {
    name: String,
    staged: Vec<(usize, String, AttributeValue)>,
}

/// Host document held entirely in memory
#[derive(Debug)]
pub struct InMemoryDocument {
    name: String,
    phases: Vec<Phase>,
    levels: Vec<Level>,
    elements: Vec<Element>,
    index: FxHashMap<ElementId, usize>,
    links: Vec<(String, RigidTransform, InMemoryDocument)>,
    transaction: Option<Transaction>,
    committed_writes: usize,
}

impl InMemoryDocument {
    pub fn new(snapshot: DocumentSnapshot) -> Self {
        let index = snapshot
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        let links = snapshot
            .links
            .into_iter()
            .map(|link| {
                let transform = link.transform();
                (link.name, transform, InMemoryDocument::new(link.document))
            })
            .collect();

        Self {
            name: snapshot.name,
            phases: snapshot.phases,
            levels: snapshot.levels,
            elements: snapshot.elements,
            index,
            links,
            transaction: None,
            committed_writes: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: DocumentSnapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Current state as a snapshot (links keep their placement)
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            name: self.name.clone(),
            phases: self.phases.clone(),
            levels: self.levels.clone(),
            elements: self.elements.clone(),
            links: self
                .links
                .iter()
                .map(|(name, transform, doc)| LinkSnapshot {
                    name: name.clone(),
                    translation: transform.translation().into(),
                    rotation: transform.rotation_z(),
                    document: doc.snapshot(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.index.get(&id).map(|&i| &self.elements[i])
    }

    /// Current value of an attribute, instance first, then type
    pub fn attribute(&self, id: ElementId, key: &str) -> Option<&AttributeValue> {
        self.element(id)?.attribute_slot(key)?.value.as_ref()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Add or replace an element
    pub fn insert(&mut self, element: Element) {
        match self.index.get(&element.id) {
            Some(&i) => self.elements[i] = element,
            None => {
                self.index.insert(element.id, self.elements.len());
                self.elements.push(element);
            }
        }
    }

    /// Attribute writes applied by committed transactions so far
    pub fn committed_writes(&self) -> usize {
        self.committed_writes
    }

    fn check_write(&self, element: ElementId, key: &str, value: &AttributeValue) -> Result<usize> {
        let i = *self
            .index
            .get(&element)
            .ok_or_else(|| Error::WriteFailed(format!("element {} does not exist", element)))?;
        let e = &self.elements[i];

        if let Some(owner) = &e.owned_by {
            return Err(Error::NotWritable(format!("element {} is owned by {}", element, owner)));
        }
        let slot = e
            .attribute_slot(key)
            .ok_or_else(|| Error::WriteFailed(format!("element {} has no attribute '{}'", element, key)))?;
        if slot.read_only {
            return Err(Error::NotWritable(format!("attribute '{}' on {} is read-only", key, element)));
        }
        if slot.storage != value.storage_type() {
            return Err(Error::WriteFailed(format!(
                "attribute '{}' on {} stores {}, got {}",
                key,
                element,
                slot.storage,
                value.storage_type()
            )));
        }
        Ok(i)
    }
}

impl DocumentSource for InMemoryDocument {
    fn zones(&self, categories: &[Category]) -> Vec<ZoneEntity> {
        self.elements
            .iter()
            .filter(|e| categories.contains(&e.category))
            .map(ZoneEntity::from)
            .collect()
    }

    fn targets(&self, categories: &[Category]) -> Vec<TargetEntity> {
        self.elements
            .iter()
            .filter(|e| categories.is_empty() || categories.contains(&e.category))
            .map(TargetEntity::from)
            .collect()
    }

    fn phases(&self) -> Vec<Phase> {
        self.phases.clone()
    }

    fn levels(&self) -> Vec<Level> {
        self.levels.clone()
    }
}

impl HostDocument for InMemoryDocument {
    fn link(&self, name: &str) -> Option<DocumentLink<'_>> {
        self.links
            .iter()
            .find(|(link_name, _, _)| link_name == name)
            .map(|(_, transform, doc)| DocumentLink {
                document: doc as &dyn DocumentSource,
                transform: *transform,
            })
    }

    fn begin_transaction(&mut self, name: &str) -> Result<()> {
        if let Some(open) = &self.transaction {
            return Err(Error::Host(format!(
                "transaction '{}' is already open",
                open.name
            )));
        }
        self.transaction = Some(Transaction {
            name: name.to_string(),
            staged: Vec::new(),
        });
        Ok(())
    }

    fn set_attribute(&mut self, element: ElementId, key: &str, value: AttributeValue) -> Result<()> {
        if self.transaction.is_none() {
            return Err(Error::Host("no open transaction".to_string()));
        }
        let i = self.check_write(element, key, &value)?;
        if let Some(tx) = self.transaction.as_mut() {
            tx.staged.push((i, key.to_string(), value));
        }
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| Error::Host("no open transaction".to_string()))?;

        let count = tx.staged.len();
        for (i, key, value) in tx.staged {
            if let Some(slot) = self.elements[i].attribute_slot_mut(&key) {
                slot.value = Some(value);
            }
        }
        self.committed_writes += count;
        Ok(())
    }

    fn rollback_transaction(&mut self) {
        self.transaction = None;
    }
}
