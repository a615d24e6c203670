// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entities, categories and attribute values
//!
//! [`Element`] is the snapshot record a host hands over. The engine works on
//! two projections of it: [`ZoneEntity`] for elements whose attributes are
//! propagated and [`TargetEntity`] for elements that receive them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zonemap_geometry::{Aabb, BoundarySegment, Location, TriangleMesh};

/// Stable, totally ordered element identifier (also the overlap tie-break)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ElementId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Host element category
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Rooms,
    MepSpaces,
    Areas,
    Mass,
    GenericModel,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Rooms => "Rooms",
            Category::MepSpaces => "MEP Spaces",
            Category::Areas => "Areas",
            Category::Mass => "Mass",
            Category::GenericModel => "Generic Models",
            Category::Other(name) => name,
        }
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        match name.trim() {
            "Rooms" => Category::Rooms,
            "MEP Spaces" | "Spaces" => Category::MepSpaces,
            "Areas" => Category::Areas,
            "Mass" => Category::Mass,
            "Generic Models" | "Generic Model" => Category::GenericModel,
            other => Category::Other(other.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Category::from(name.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zone family, which also selects the containment strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Room,
    Space,
    Area,
    Solid,
}

impl ZoneKind {
    /// Strategy for a set of source categories
    ///
    /// Priority is Rooms, then Spaces, then Areas, then Mass / Generic
    /// Models. `None` when no zone category is present.
    pub fn detect(categories: &[Category]) -> Option<Self> {
        let has = |c: Category| categories.contains(&c);
        if has(Category::Rooms) {
            Some(ZoneKind::Room)
        } else if has(Category::MepSpaces) {
            Some(ZoneKind::Space)
        } else if has(Category::Areas) {
            Some(ZoneKind::Area)
        } else if has(Category::Mass) || has(Category::GenericModel) {
            Some(ZoneKind::Solid)
        } else {
            None
        }
    }

    /// Categories collected as zones for this kind
    pub fn categories(self, requested: &[Category]) -> Vec<Category> {
        match self {
            ZoneKind::Room => vec![Category::Rooms],
            ZoneKind::Space => vec![Category::MepSpaces],
            ZoneKind::Area => vec![Category::Areas],
            ZoneKind::Solid => requested
                .iter()
                .filter(|c| matches!(c, Category::Mass | Category::GenericModel))
                .cloned()
                .collect(),
        }
    }

    /// Target categories that would always contain themselves
    pub fn self_referential(self) -> &'static [Category] {
        match self {
            ZoneKind::Room | ZoneKind::Space => &[Category::Rooms, Category::MepSpaces],
            ZoneKind::Area => &[Category::Areas],
            ZoneKind::Solid => &[],
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoneKind::Room => "room",
            ZoneKind::Space => "space",
            ZoneKind::Area => "area",
            ZoneKind::Solid => "solid",
        };
        f.write_str(name)
    }
}

/// How an attribute value is stored by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Text,
    Integer,
    Double,
    ElementRef,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageType::Text => "text",
            StorageType::Integer => "integer",
            StorageType::Double => "double",
            StorageType::ElementRef => "element reference",
        };
        f.write_str(name)
    }
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Double(f64),
    ElementRef(ElementId),
}

impl AttributeValue {
    pub fn storage_type(&self) -> StorageType {
        match self {
            AttributeValue::Text(_) => StorageType::Text,
            AttributeValue::Integer(_) => StorageType::Integer,
            AttributeValue::Double(_) => StorageType::Double,
            AttributeValue::ElementRef(_) => StorageType::ElementRef,
        }
    }

    /// Whitespace-only text counts as no value
    pub fn is_blank(&self) -> bool {
        matches!(self, AttributeValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Double(d) => write!(f, "{}", d),
            AttributeValue::ElementRef(id) => write!(f, "#{}", id),
        }
    }
}

/// One named attribute on an element or its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSlot {
    pub storage: StorageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl AttributeSlot {
    pub fn new(value: AttributeValue) -> Self {
        Self {
            storage: value.storage_type(),
            value: Some(value),
            read_only: false,
        }
    }

    pub fn empty(storage: StorageType) -> Self {
        Self {
            storage,
            value: None,
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

pub type AttributeMap = BTreeMap<String, AttributeSlot>;

/// Instance attribute first, then the type attribute
fn lookup<'a>(instance: &'a AttributeMap, type_level: &'a AttributeMap, key: &str) -> Option<&'a AttributeSlot> {
    instance.get(key).or_else(|| type_level.get(key))
}

/// Zone geometry as supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneShape {
    /// Room or space boundary loops (first is the outer loop) with the
    /// absolute elevations of the floor and the upper limit
    Native {
        loops: Vec<Vec<BoundarySegment>>,
        base: f64,
        top: f64,
    },
    /// Area boundary loops; only the first is extruded
    Boundary { loops: Vec<Vec<BoundarySegment>> },
    /// Triangulated sub-solids in host order
    Solids { parts: Vec<TriangleMesh> },
    #[default]
    None,
}

/// Host element snapshot record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub category: Category,
    /// Family and type name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_phase: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demolished_phase: Option<ElementId>,
    #[serde(default, skip_serializing_if = "is_no_location")]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Aabb>,
    #[serde(default, skip_serializing_if = "is_no_shape")]
    pub shape: ZoneShape,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_attributes: AttributeMap,
    /// Collaborative session currently owning the element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

fn is_no_location(location: &Location) -> bool {
    matches!(location, Location::None)
}

fn is_no_shape(shape: &ZoneShape) -> bool {
    matches!(shape, ZoneShape::None)
}

impl Element {
    pub fn new(id: impl Into<ElementId>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            name: String::new(),
            level: None,
            created_phase: None,
            demolished_phase: None,
            location: Location::None,
            bounds: None,
            shape: ZoneShape::None,
            attributes: AttributeMap::new(),
            type_attributes: AttributeMap::new(),
            owned_by: None,
        }
    }

    pub fn attribute_slot(&self, key: &str) -> Option<&AttributeSlot> {
        lookup(&self.attributes, &self.type_attributes, key)
    }

    /// Mutable slot, instance first, then type
    pub fn attribute_slot_mut(&mut self, key: &str) -> Option<&mut AttributeSlot> {
        if self.attributes.contains_key(key) {
            self.attributes.get_mut(key)
        } else {
            self.type_attributes.get_mut(key)
        }
    }
}

/// Read-only view of an element acting as a zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneEntity {
    pub id: ElementId,
    pub category: Category,
    pub name: String,
    pub level: Option<ElementId>,
    pub created_phase: Option<ElementId>,
    pub demolished_phase: Option<ElementId>,
    pub shape: ZoneShape,
    pub attributes: AttributeMap,
    pub type_attributes: AttributeMap,
}

impl ZoneEntity {
    /// Non-empty attribute value, instance first, then type
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        lookup(&self.attributes, &self.type_attributes, key)
            .and_then(|slot| slot.value.as_ref())
            .filter(|v| !v.is_blank())
    }

    /// True when at least one of `keys` carries a value
    pub fn has_any_value<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|k| self.attribute(k.as_ref()).is_some())
    }
}

impl From<&Element> for ZoneEntity {
    fn from(e: &Element) -> Self {
        Self {
            id: e.id,
            category: e.category.clone(),
            name: e.name.clone(),
            level: e.level,
            created_phase: e.created_phase,
            demolished_phase: e.demolished_phase,
            shape: e.shape.clone(),
            attributes: e.attributes.clone(),
            type_attributes: e.type_attributes.clone(),
        }
    }
}

/// Read-only view of an element that may receive attributes
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntity {
    pub id: ElementId,
    pub category: Category,
    pub level: Option<ElementId>,
    pub created_phase: Option<ElementId>,
    pub demolished_phase: Option<ElementId>,
    pub location: Location,
    pub bounds: Option<Aabb>,
    pub attributes: AttributeMap,
    pub type_attributes: AttributeMap,
    pub owned_by: Option<String>,
}

impl TargetEntity {
    pub fn slot(&self, key: &str) -> Option<&AttributeSlot> {
        lookup(&self.attributes, &self.type_attributes, key)
    }

    /// Owned by another collaborative session
    pub fn is_locked(&self) -> bool {
        self.owned_by.is_some()
    }

    /// Area-like elements are located by their bounding box
    pub fn is_planar(&self) -> bool {
        matches!(self.category, Category::Areas)
    }
}

impl From<&Element> for TargetEntity {
    fn from(e: &Element) -> Self {
        Self {
            id: e.id,
            category: e.category.clone(),
            level: e.level,
            created_phase: e.created_phase,
            demolished_phase: e.demolished_phase,
            location: e.location.clone(),
            bounds: e.bounds,
            attributes: e.attributes.clone(),
            type_attributes: e.type_attributes.clone(),
            owned_by: e.owned_by.clone(),
        }
    }
}

/// Project phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: ElementId,
    pub name: String,
    /// Explicit position in the project timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
}

/// Building level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    pub elevation: f64,
}
