// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ZoneMap Processing
//!
//! Propagates attributes from zones (rooms, MEP spaces, areas, mass volumes)
//! to every element located inside them. Configurations pick a zone
//! category and attribute pairs; the orchestrator resolves containment for
//! each target against a snapshot of the host document and writes the
//! results back in one transaction per configuration.
//!
//! ```no_run
//! use zonemap_processing::{ConfigStore, EngineSettings, InMemoryDocument, Orchestrator};
//!
//! let mut document = InMemoryDocument::load("model.json")?;
//! let store = ConfigStore::load("configs.json")?;
//! let report = Orchestrator::new(EngineSettings::from_env())
//!     .run(store.configurations(), &mut document);
//! println!("{}", report);
//! # Ok::<(), zonemap_processing::Error>(())
//! ```

pub mod adapter;
pub mod config;
pub mod containment;
pub mod error;
pub mod host;
pub mod levels;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod phase;
pub mod progress;
pub mod report;
pub mod settings;
pub mod writer;

pub use adapter::{GeometricForm, GeometryAdapter};
pub use config::{generate_id, ConfigStore, MappingConfiguration};
pub use containment::{Containment, TargetQuery};
pub use error::{Error, Result};
pub use host::{DocumentLink, DocumentSource, HostDocument};
pub use levels::LevelTable;
pub use memory::{DocumentSnapshot, InMemoryDocument, LinkSnapshot};
pub use model::{
    AttributeSlot, AttributeValue, Category, Element, ElementId, Level, Phase, StorageType, TargetEntity,
    ZoneEntity, ZoneKind, ZoneShape,
};
pub use orchestrator::Orchestrator;
pub use phase::{PhaseSet, PhaseTimeline};
pub use progress::{CancellationToken, NoProgress, ProgressSink, ProgressUpdate};
pub use report::{ConfigurationReport, ConfigurationStatus, Failure, FailureReason, RunReport};
pub use settings::EngineSettings;
