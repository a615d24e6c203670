// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping configurations and their persistent store
//!
//! A configuration pairs source attributes on zones with target attributes
//! on contained elements, position by position. Configurations run in
//! ascending `order`; ties keep insertion order, so a later configuration
//! can consume what an earlier one wrote in the same run.

use crate::error::{Error, Result};
use crate::model::{Category, ZoneKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// One attribute mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source_categories: Vec<Category>,
    pub source_attributes: Vec<String>,
    pub target_attributes: Vec<String>,
    /// Empty means every category
    #[serde(default)]
    pub target_categories: Vec<Category>,
    /// Read zones from this linked document instead of the primary one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_document: Option<String>,
    /// Only solid zones whose family/type name starts with this are eligible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_family_prefix: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Fresh configuration identifier
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl MappingConfiguration {
    pub fn new(
        name: impl Into<String>,
        source_categories: Vec<Category>,
        source_attributes: Vec<String>,
        target_attributes: Vec<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            order: 0,
            enabled: true,
            source_categories,
            source_attributes,
            target_attributes,
            target_categories: Vec::new(),
            linked_document: None,
            zone_family_prefix: None,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_target_categories(mut self, categories: Vec<Category>) -> Self {
        self.target_categories = categories;
        self
    }

    pub fn with_linked_document(mut self, name: impl Into<String>) -> Self {
        self.linked_document = Some(name.into());
        self
    }

    pub fn with_zone_family_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.zone_family_prefix = Some(prefix.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn zone_kind(&self) -> Option<ZoneKind> {
        ZoneKind::detect(&self.source_categories)
    }

    /// `(source, target)` attribute key pairs
    pub fn attribute_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.source_attributes
            .iter()
            .zip(&self.target_attributes)
            .map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_attributes.len() != self.target_attributes.len() {
            return Err(Error::InvalidConfiguration(format!(
                "'{}' maps {} source attributes to {} target attributes",
                self.name,
                self.source_attributes.len(),
                self.target_attributes.len()
            )));
        }
        if self.source_attributes.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "'{}' has no attributes to map",
                self.name
            )));
        }
        if let Some(blank) = self
            .source_attributes
            .iter()
            .chain(&self.target_attributes)
            .find(|k| k.trim().is_empty())
        {
            return Err(Error::InvalidConfiguration(format!(
                "'{}' has a blank attribute name {:?}",
                self.name, blank
            )));
        }
        if self.zone_kind().is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "'{}' has no zone category among {:?}",
                self.name,
                self.source_categories
                    .iter()
                    .map(Category::as_str)
                    .collect::<Vec<_>>()
            )));
        }
        Ok(())
    }
}

/// Enabled configurations sorted by `order`, ties in slice order
pub fn enabled_in_order(configurations: &[MappingConfiguration]) -> Vec<&MappingConfiguration> {
    let mut enabled: Vec<&MappingConfiguration> = configurations.iter().filter(|c| c.enabled).collect();
    enabled.sort_by_key(|c| c.order);
    enabled
}

/// Persistent list of configurations (JSON on disk)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigStore {
    #[serde(default)]
    configurations: Vec<MappingConfiguration>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a store; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        for configuration in &self.configurations {
            configuration.validate()?;
        }
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every configuration, then write the store
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn configurations(&self) -> &[MappingConfiguration] {
        &self.configurations
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Order for a newly appended configuration: one past the highest
    pub fn next_order(&self) -> i64 {
        self.configurations
            .iter()
            .map(|c| c.order)
            .max()
            .map_or(1, |max| max + 1)
    }

    pub fn get(&self, id: &str) -> Option<&MappingConfiguration> {
        self.configurations.iter().find(|c| c.id == id)
    }

    /// Replace the configuration with the same id, or append it
    pub fn upsert(&mut self, configuration: MappingConfiguration) {
        match self.configurations.iter_mut().find(|c| c.id == configuration.id) {
            Some(existing) => *existing = configuration,
            None => self.configurations.push(configuration),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<MappingConfiguration> {
        let pos = self.configurations.iter().position(|c| c.id == id)?;
        Some(self.configurations.remove(pos))
    }

    pub fn enabled_in_order(&self) -> Vec<&MappingConfiguration> {
        enabled_in_order(&self.configurations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms(name: &str) -> MappingConfiguration {
        MappingConfiguration::new(
            name,
            vec![Category::Rooms],
            vec!["Name".into(), "Number".into()],
            vec!["Room Name".into(), "Room Number".into()],
        )
    }

    #[test]
    fn test_length_mismatch_is_invalid() {
        let mut config = rooms("mismatch");
        config.target_attributes.pop();
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_no_zone_category_is_invalid() {
        let config = MappingConfiguration::new(
            "walls",
            vec![Category::Other("Walls".into())],
            vec!["A".into()],
            vec!["B".into()],
        );
        assert!(config.validate().is_err());
        assert!(rooms("ok").validate().is_ok());
    }

    #[test]
    fn test_next_order() {
        let mut store = ConfigStore::new();
        assert_eq!(store.next_order(), 1);
        store.upsert(rooms("a").with_order(4));
        store.upsert(rooms("b").with_order(2));
        assert_eq!(store.next_order(), 5);
    }

    #[test]
    fn test_enabled_in_order_is_stable() {
        let mut store = ConfigStore::new();
        store.upsert(rooms("late").with_order(3));
        store.upsert(rooms("first-tie").with_order(1));
        store.upsert(rooms("off").with_order(0).disabled());
        store.upsert(rooms("second-tie").with_order(1));

        let names: Vec<&str> = store.enabled_in_order().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first-tie", "second-tie", "late"]);
    }

    #[test]
    fn test_upsert_get_remove() {
        let mut store = ConfigStore::new();
        let config = rooms("a");
        let id = config.id.clone();
        store.upsert(config.clone());
        store.upsert(config.with_order(9));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).map(|c| c.order), Some(9));
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn test_save_refuses_invalid() {
        let mut store = ConfigStore::new();
        let mut bad = rooms("bad");
        bad.source_attributes.push("Extra".into());
        store.upsert(bad);
        assert!(store.to_json().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"configurations": [{
            "id": "c1",
            "name": "Fire rating",
            "source_categories": ["Rooms"],
            "source_attributes": ["Rating"],
            "target_attributes": ["Fire Rating"]
        }]}"#;
        let store = ConfigStore::from_json(json).unwrap();
        let config = store.get("c1").unwrap();
        assert!(config.enabled);
        assert!(config.target_categories.is_empty());
        assert_eq!(config.zone_kind(), Some(ZoneKind::Room));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
        assert_eq!(generate_id().len(), 36);
    }
}
