// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping orchestrator
//!
//! Runs enabled configurations in order. Each configuration is read-only up
//! to the point where its write batch is applied: zone materialization and
//! target resolution run on the orchestrator's own rayon pool (sized by
//! `worker_threads`) against owned snapshots, then a
//! single writer applies the batch in one host transaction. Cancellation is
//! honored between configurations and between target batches; a cancelled
//! configuration writes nothing, earlier committed ones stay committed.

use crate::adapter::GeometryAdapter;
use crate::config::{enabled_in_order, MappingConfiguration};
use crate::containment::{Containment, PreparedZone, TargetQuery};
use crate::host::{DocumentSource, HostDocument};
use crate::levels::LevelTable;
use crate::model::{ElementId, TargetEntity, ZoneEntity, ZoneKind};
use crate::phase::{PhaseSet, PhaseTimeline};
use crate::progress::{CancellationToken, NoProgress, ProgressSink, ProgressUpdate};
use crate::report::{ConfigurationReport, ConfigurationStatus, FailureReason, RunReport};
use crate::settings::EngineSettings;
use crate::writer::{plan_target, WriteBatch};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Range;
use zonemap_geometry::{Error as GeometryError, PointSampler, RigidTransform};

/// Matched and unmatched targets logged at debug level per configuration
const DEBUG_SAMPLE: usize = 5;

/// Containment result for one target
#[derive(Debug, Clone)]
enum Outcome {
    Matched(ElementId),
    Unmatched,
    NoLocation(GeometryError),
}

/// Everything the write phase needs, detached from the host borrow
struct Resolved {
    zones: FxHashMap<ElementId, ZoneEntity>,
    targets: Vec<TargetEntity>,
    outcomes: Vec<Outcome>,
}

pub struct Orchestrator {
    settings: EngineSettings,
    progress: Box<dyn ProgressSink>,
    cancel: CancellationToken,
    /// `None` when the pool could not be built; work then runs on the global pool
    pool: Option<rayon::ThreadPool>,
}

impl Orchestrator {
    pub fn new(settings: EngineSettings) -> Self {
        let pool = worker_pool(settings.worker_threads);
        Self {
            settings,
            progress: Box::new(NoProgress),
            cancel: CancellationToken::new(),
            pool,
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Number of threads parallel resolution actually runs on
    pub fn worker_threads(&self) -> usize {
        self.install(rayon::current_num_threads)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Run every enabled configuration in ascending order
    pub fn run<H: HostDocument>(&self, configurations: &[MappingConfiguration], host: &mut H) -> RunReport {
        self.run_inner(configurations, host, None)
    }

    /// Like [`run`](Self::run), restricted to the given target elements
    /// (e.g. elements that moved since the last run)
    pub fn run_scoped<H: HostDocument>(
        &self,
        configurations: &[MappingConfiguration],
        host: &mut H,
        only: &[ElementId],
    ) -> RunReport {
        let scope: FxHashSet<ElementId> = only.iter().copied().collect();
        self.run_inner(configurations, host, Some(&scope))
    }

    fn run_inner<H: HostDocument>(
        &self,
        configurations: &[MappingConfiguration],
        host: &mut H,
        scope: Option<&FxHashSet<ElementId>>,
    ) -> RunReport {
        let ordered = enabled_in_order(configurations);
        let count = ordered.len();
        let mut run = RunReport::default();

        tracing::info!(configurations = count, scoped = scope.is_some(), "Starting mapping run");

        for (index, config) in ordered.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(remaining = count - index, "Run cancelled between configurations");
                run.cancelled = true;
                break;
            }

            let report = self.run_configuration(config, index, count, host, scope);
            let cancelled = report.status == ConfigurationStatus::Cancelled;
            run.configurations.push(report);
            if cancelled {
                run.cancelled = true;
                break;
            }
        }

        tracing::info!(
            targets_updated = run.targets_updated(),
            attributes_written = run.attributes_written(),
            failures = run.failure_count(),
            cancelled = run.cancelled,
            "Mapping run complete"
        );
        run
    }

    fn run_configuration<H: HostDocument>(
        &self,
        config: &MappingConfiguration,
        index: usize,
        count: usize,
        host: &mut H,
        scope: Option<&FxHashSet<ElementId>>,
    ) -> ConfigurationReport {
        if let Err(e) = config.validate() {
            tracing::warn!(config = %config.name, error = %e, "Configuration rejected");
            return ConfigurationReport::rejected(&config.id, &config.name, e.to_string());
        }
        let Some(kind) = config.zone_kind() else {
            return ConfigurationReport::rejected(&config.id, &config.name, "no zone category");
        };
        let mut report = ConfigurationReport::new(&config.id, &config.name);
        report.strategy = Some(kind);

        let Some(resolved) = self.resolve(config, kind, index, count, &*host, scope, &mut report) else {
            return report;
        };

        let (batch, mut failed) = self.plan_writes(config, &resolved, &mut report);

        // Last point at which the configuration can be abandoned cleanly
        if self.cancel.is_cancelled() {
            tracing::info!(config = %config.name, "Configuration cancelled before writing");
            report.status = ConfigurationStatus::Cancelled;
            return report;
        }

        let planned = batch.len();
        match batch.apply(host, &format!("Map attributes: {}", config.name)) {
            Ok(applied) => {
                report.attributes_written = applied.written;
                report.targets_updated = applied.updated.len();
                report.skipped_unwritable += applied.unwritable.len();
                failed.extend(applied.failed);
                report.failures.extend(applied.failures);
            }
            Err(e) => {
                tracing::warn!(config = %config.name, writes = planned, error = %e, "Commit failed, configuration rolled back");
                report.status = ConfigurationStatus::CommitFailed(e.to_string());
            }
        }
        report.write_failed = failed.len();

        tracing::info!(
            config = %config.name,
            matched = report.matched,
            unmatched = report.unmatched,
            skipped_unwritable = report.skipped_unwritable,
            failed_geometry = report.failed_geometry,
            attributes_written = report.attributes_written,
            "Configuration complete"
        );
        report
    }

    /// Read phase: collect zones and targets, build the strategy and resolve
    /// every target. `None` when the configuration was rejected or cancelled
    /// (the report status says which).
    #[allow(clippy::too_many_arguments)]
    fn resolve<H: HostDocument>(
        &self,
        config: &MappingConfiguration,
        kind: ZoneKind,
        index: usize,
        count: usize,
        host: &H,
        scope: Option<&FxHashSet<ElementId>>,
        report: &mut ConfigurationReport,
    ) -> Option<Resolved> {
        let (source, link): (&dyn DocumentSource, RigidTransform) = match &config.linked_document {
            Some(name) => match host.link(name) {
                Some(link) => (link.document, link.transform),
                None => {
                    tracing::warn!(config = %config.name, link = %name, "Linked document not found");
                    report.status =
                        ConfigurationStatus::Rejected(format!("linked document '{}' not found", name));
                    return None;
                }
            },
            None => (host as &dyn DocumentSource, RigidTransform::identity()),
        };
        let linked = config.linked_document.is_some();

        // Zones
        let mut zones = source.zones(&kind.categories(&config.source_categories));
        let zone_ids: FxHashSet<ElementId> = if linked {
            FxHashSet::default()
        } else {
            zones.iter().map(|z| z.id).collect()
        };
        if let (ZoneKind::Solid, Some(prefix)) = (kind, &config.zone_family_prefix) {
            zones.retain(|z| z.name.starts_with(prefix.as_str()));
        }
        zones.retain(|z| z.has_any_value(&config.source_attributes));
        zones.sort_by_key(|z| z.id);

        // Phases
        let timeline = PhaseTimeline::ordered(&host.phases());
        let zone_phases = ZonePhases::new(kind, linked, &timeline, source);

        // Geometry
        let levels = LevelTable::new(&source.levels());
        let adapter = GeometryAdapter::new(&levels, &self.settings);
        let materialized: Vec<_> =
            self.install(|| zones.par_iter().map(|z| adapter.materialize(z, kind)).collect());

        let mut prepared = Vec::with_capacity(zones.len());
        for (zone, form) in zones.iter().zip(materialized) {
            match form {
                Ok(form) => prepared.push(PreparedZone {
                    id: zone.id,
                    form,
                    phases: zone_phases.of(zone),
                }),
                Err(e) => {
                    tracing::warn!(config = %config.name, zone = %zone.id, error = %e, "Zone geometry unavailable, skipped");
                    report.failed_geometry += 1;
                    report.record(zone.id, FailureReason::from(&e));
                }
            }
        }
        let containment = Containment::build(kind, prepared, link, zone_phases.aware, &self.settings);
        report.zones = containment.zone_count();

        // Targets
        let excluded = kind.self_referential();
        let mut targets = host.targets(&config.target_categories);
        targets.retain(|t| {
            !excluded.contains(&t.category)
                && !zone_ids.contains(&t.id)
                && scope.map_or(true, |s| s.contains(&t.id))
        });
        report.targets_total = targets.len();

        tracing::info!(
            config = %config.name,
            strategy = containment.name(),
            zones = containment.zone_count(),
            targets = targets.len(),
            phase_aware = zone_phases.aware,
            "Resolving containment"
        );

        let outcomes = self.resolve_targets(config, index, count, &targets, &containment, &timeline, zone_phases.aware);
        let Some(outcomes) = outcomes else {
            report.status = ConfigurationStatus::Cancelled;
            return None;
        };

        Some(Resolved {
            zones: zones.into_iter().map(|z| (z.id, z)).collect(),
            targets,
            outcomes,
        })
    }

    /// Resolve targets in batches of roughly `1 / progress_steps` of the
    /// total, reporting progress and checking cancellation between batches
    #[allow(clippy::too_many_arguments)]
    fn resolve_targets(
        &self,
        config: &MappingConfiguration,
        index: usize,
        count: usize,
        targets: &[TargetEntity],
        containment: &Containment,
        timeline: &PhaseTimeline,
        phase_aware: bool,
    ) -> Option<Vec<Outcome>> {
        let sampler = PointSampler::new(self.settings.curve_offset);
        let total = targets.len();
        let batch_size = total.div_ceil(self.settings.progress_steps.max(1)).max(1);
        let mut outcomes = Vec::with_capacity(total);

        self.report_progress(config, index, count, 0, total);
        for batch in targets.chunks(batch_size) {
            if self.cancel.is_cancelled() {
                tracing::info!(config = %config.name, resolved = outcomes.len(), "Configuration cancelled during resolution");
                return None;
            }

            let resolved: Vec<Outcome> = self.install(|| {
                batch
                    .par_iter()
                    .map(|target| {
                        let points = match sampler.points(&target.location, target.bounds.as_ref(), target.is_planar()) {
                            Ok(points) => points,
                            Err(e) => return Outcome::NoLocation(e),
                        };
                        let phases: Range<usize> = if phase_aware {
                            timeline.valid_phase_range(target.created_phase, target.demolished_phase)
                        } else {
                            0..0
                        };
                        match containment.resolve(&TargetQuery { points: &points, phases }) {
                            Some(zone) => Outcome::Matched(zone),
                            None => Outcome::Unmatched,
                        }
                    })
                    .collect()
            });
            outcomes.extend(resolved);

            self.report_progress(config, index, count, outcomes.len(), total);
        }
        Some(outcomes)
    }

    /// Turn matches into a write batch and fill the skip counters; also
    /// returns the targets that already failed during planning
    fn plan_writes(
        &self,
        config: &MappingConfiguration,
        resolved: &Resolved,
        report: &mut ConfigurationReport,
    ) -> (WriteBatch, FxHashSet<ElementId>) {
        let mut batch = WriteBatch::new();
        let mut failed = FxHashSet::default();
        let mut logged_matches = 0;
        let mut logged_misses = 0;

        for (target, outcome) in resolved.targets.iter().zip(&resolved.outcomes) {
            match outcome {
                Outcome::NoLocation(e) => {
                    report.skipped_no_location += 1;
                    report.record(target.id, FailureReason::from(e));
                }
                Outcome::Unmatched => {
                    report.unmatched += 1;
                    if logged_misses < DEBUG_SAMPLE {
                        logged_misses += 1;
                        tracing::debug!(config = %config.name, element = %target.id, "No containing zone");
                    }
                }
                Outcome::Matched(zone_id) => {
                    report.matched += 1;
                    let Some(zone) = resolved.zones.get(zone_id) else {
                        continue;
                    };
                    if logged_matches < DEBUG_SAMPLE {
                        logged_matches += 1;
                        tracing::debug!(config = %config.name, element = %target.id, zone = %zone.id, "Matched");
                    }

                    let plan = plan_target(zone, target, config.attribute_pairs());
                    if plan.is_unwritable() {
                        report.skipped_unwritable += 1;
                        let reason = match &target.owned_by {
                            Some(owner) => format!("owned by {}", owner),
                            None => "every mapped attribute is read-only".to_string(),
                        };
                        report.record(target.id, FailureReason::NotWritable(reason));
                        continue;
                    }

                    report.attributes_unchanged += plan.unchanged;
                    if !plan.mismatches.is_empty() {
                        failed.insert(target.id);
                    }
                    for mismatch in plan.mismatches {
                        report.record(target.id, FailureReason::WriteFailed(mismatch));
                    }
                    batch.extend(plan.writes);
                }
            }
        }
        (batch, failed)
    }

    fn report_progress(&self, config: &MappingConfiguration, index: usize, count: usize, completed: usize, total: usize) {
        self.progress.on_progress(&ProgressUpdate {
            configuration: &config.name,
            index,
            count,
            completed,
            total,
        });
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

fn worker_pool(threads: usize) -> Option<rayon::ThreadPool> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("zonemap-worker-{}", i))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(threads, error = %e, "Worker pool unavailable, using the global rayon pool");
            None
        }
    }
}

/// Maps zone phases onto the primary timeline
struct ZonePhases<'t> {
    aware: bool,
    timeline: &'t PhaseTimeline,
    /// Link timeline and its index mapping onto the primary one
    link: Option<(PhaseTimeline, Vec<usize>)>,
}

impl<'t> ZonePhases<'t> {
    fn new(kind: ZoneKind, linked: bool, timeline: &'t PhaseTimeline, source: &dyn DocumentSource) -> Self {
        let mut phases = Self {
            aware: false,
            timeline,
            link: None,
        };
        if kind != ZoneKind::Room || timeline.is_empty() {
            return phases;
        }
        if !linked {
            phases.aware = true;
            return phases;
        }

        let link_timeline = PhaseTimeline::ordered(&source.phases());
        match link_timeline.map_by_name(timeline) {
            Some(mapping) => {
                phases.aware = true;
                phases.link = Some((link_timeline, mapping));
            }
            None => {
                tracing::info!("Linked phases do not match the host timeline, testing all phases");
            }
        }
        phases
    }

    fn of(&self, zone: &ZoneEntity) -> PhaseSet {
        if !self.aware {
            return PhaseSet::default();
        }
        match &self.link {
            None => self.timeline.valid_phase_range(zone.created_phase, zone.demolished_phase).into(),
            Some((link_timeline, mapping)) => {
                let local = link_timeline.valid_phase_range(zone.created_phase, zone.demolished_phase);
                PhaseSet::from_indices(local.filter_map(|i| mapping.get(i).copied()))
            }
        }
    }
}
