//! The reconciliation state machine.

use crate::client::{CatalogClient, CreateOptions};
use crate::config::{ReconcileConfig, RetryConfig};
use crate::error::{ReconcileError, ReconcileResult};
use crate::events::{EventSink, ReconcileEvent, TracingSink};
use crate::report::{KindPlan, KindReport, ReconcilePlan, RunReport};
use catsync_model::{
    dependency_waves, diff, remap_price_options, remap_references, CatalogEntity, CatalogIndex,
    DataQualityWarning, Diff, DiffMode, EntityId, EntityKind, Remapped, Side,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Phase of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReconcileState {
    /// Not started, or snapshots fetched and no phase run yet.
    Init,
    /// Copying currencies.
    CopyCurrencies,
    /// Copying items.
    CopyItems,
    /// Retrying items postponed during `CopyItems`.
    RetryDeferredItems,
    /// Re-reading the target.
    RefreshTargetSnapshot,
    /// Copying bundles.
    CopyBundles,
    /// Copying stores.
    CopyStores,
    /// Run finished.
    Done,
    /// Run aborted on a fatal error.
    Failed,
}

impl ReconcileState {
    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconcileState::Done | ReconcileState::Failed)
    }

    /// Returns true if a new run can be started from this state.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ReconcileState::Init | ReconcileState::Done | ReconcileState::Failed
        )
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileState::Init => "init",
            ReconcileState::CopyCurrencies => "copy-currencies",
            ReconcileState::CopyItems => "copy-items",
            ReconcileState::RetryDeferredItems => "retry-deferred-items",
            ReconcileState::RefreshTargetSnapshot => "refresh-target-snapshot",
            ReconcileState::CopyBundles => "copy-bundles",
            ReconcileState::CopyStores => "copy-stores",
            ReconcileState::Done => "done",
            ReconcileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshots owned by one run.
struct Session {
    source: CatalogIndex,
    /// Current target view: the snapshot fetched at start, kept up to date
    /// with every deletion and creation, replaced on refresh.
    view: CatalogIndex,
    /// Every id sent for deletion this run. Kept out of the view across
    /// refreshes, failed deletions included.
    deleted: HashSet<EntityId>,
    deferred: Vec<CatalogEntity>,
    pending_items: HashSet<String>,
    started: Instant,
}

impl Session {
    fn forget(&mut self, deleted: HashSet<EntityId>) {
        self.view.remove_ids(&deleted);
        self.deleted.extend(deleted);
    }

    fn replace_view(&mut self, snapshot: Vec<CatalogEntity>) {
        self.view = CatalogIndex::new(snapshot);
        self.view.remove_ids(&self.deleted);
    }
}

/// Reconciles a target catalog instance with a source one.
///
/// [`run`](Reconciler::run) executes every phase in order. The phases can
/// also be driven one at a time after [`start`](Reconciler::start), which
/// is how callers pause between phases.
pub struct Reconciler<S: CatalogClient, T: CatalogClient> {
    config: ReconcileConfig,
    source: S,
    target: T,
    sink: Arc<dyn EventSink>,
    state: ReconcileState,
    session: Option<Session>,
    report: RunReport,
}

impl<S: CatalogClient, T: CatalogClient> Reconciler<S, T> {
    /// Creates a reconciler logging through `tracing`.
    pub fn new(source: S, target: T, config: ReconcileConfig) -> Self {
        let report = RunReport::new(config.mode);
        Self {
            config,
            source,
            target,
            sink: Arc::new(TracingSink),
            state: ReconcileState::Init,
            session: None,
            report,
        }
    }

    /// Replaces the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Returns the report accumulated so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Returns the source client.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the target client.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Consumes the reconciler, returning the source and target clients.
    pub fn into_clients(self) -> (S, T) {
        (self.source, self.target)
    }

    /// Returns true if items are waiting for the retry pass.
    pub fn has_deferred(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.deferred.is_empty())
    }

    /// Runs every phase in order and returns the final report.
    ///
    /// Snapshot fetch failures and authentication failures abort the run;
    /// everything else ends up in the report.
    pub fn run(&mut self) -> ReconcileResult<RunReport> {
        self.start()?;
        self.copy_currencies()?;
        self.copy_items()?;
        if self.has_deferred() {
            self.retry_deferred_items()?;
        }
        self.refresh_target_snapshot()?;
        self.copy_bundles()?;
        self.copy_stores()?;
        self.finish()
    }

    /// Fetches both snapshots and opens a session.
    pub fn start(&mut self) -> ReconcileResult<()> {
        if !self.state.can_start() || self.session.is_some() {
            return Err(self.transition_error(ReconcileState::Init));
        }

        self.state = ReconcileState::Init;
        self.report = RunReport::new(self.config.mode);
        let started = Instant::now();

        let fetched = fetch_snapshot(&self.source, Side::Source, &self.config.retry, &*self.sink)
            .and_then(|source| {
                let target =
                    fetch_snapshot(&self.target, Side::Target, &self.config.retry, &*self.sink)?;
                Ok((source, target))
            });

        match fetched {
            Ok((source, target)) => {
                self.session = Some(Session {
                    source: CatalogIndex::new(source),
                    view: CatalogIndex::new(target),
                    deleted: HashSet::new(),
                    deferred: Vec::new(),
                    pending_items: HashSet::new(),
                    started,
                });
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Copies currencies: diff, delete, then create without prices.
    pub fn copy_currencies(&mut self) -> ReconcileResult<KindReport> {
        self.enter(ReconcileState::CopyCurrencies)?;
        let result = self.copy_currencies_phase();
        self.complete(ReconcileState::CopyCurrencies, result)
    }

    /// Copies items, deferring those priced in items not created yet.
    pub fn copy_items(&mut self) -> ReconcileResult<KindReport> {
        self.enter(ReconcileState::CopyItems)?;
        let result = self.copy_items_phase();
        self.complete(ReconcileState::CopyItems, result)
    }

    /// Refreshes the target view and creates the deferred items.
    ///
    /// Runs once. Items still waiting on a missing item are reported as
    /// failed.
    pub fn retry_deferred_items(&mut self) -> ReconcileResult<KindReport> {
        self.enter(ReconcileState::RetryDeferredItems)?;
        let result = self.retry_deferred_phase();
        self.complete(ReconcileState::RetryDeferredItems, result)
    }

    /// Replaces the target view with a fresh snapshot.
    ///
    /// Returns the number of entities on the target.
    pub fn refresh_target_snapshot(&mut self) -> ReconcileResult<usize> {
        self.enter(ReconcileState::RefreshTargetSnapshot)?;
        let result = self.refresh_phase();
        self.complete(ReconcileState::RefreshTargetSnapshot, result)
    }

    /// Replaces every target bundle with the remapped source bundles.
    pub fn copy_bundles(&mut self) -> ReconcileResult<KindReport> {
        self.enter(ReconcileState::CopyBundles)?;
        let result = self.copy_composite_phase(EntityKind::Bundle);
        self.complete(ReconcileState::CopyBundles, result)
    }

    /// Replaces every target store with the remapped source stores.
    pub fn copy_stores(&mut self) -> ReconcileResult<KindReport> {
        self.enter(ReconcileState::CopyStores)?;
        let result = self.copy_composite_phase(EntityKind::Store);
        self.complete(ReconcileState::CopyStores, result)
    }

    /// Closes the session and returns the final report.
    pub fn finish(&mut self) -> ReconcileResult<RunReport> {
        let session = match self.session.take() {
            Some(session) if self.state != ReconcileState::Failed => session,
            _ => return Err(self.transition_error(ReconcileState::Done)),
        };

        self.state = ReconcileState::Done;
        self.report.completed = true;
        self.report.duration_ms = session.started.elapsed().as_millis() as u64;
        self.sink.on_event(&ReconcileEvent::RunCompleted {
            created: self.report.created(),
            deleted: self.report.deleted(),
            failed: self.report.failed(),
        });
        Ok(self.report.clone())
    }

    /// Computes what a run would do without modifying the target.
    pub fn plan(&self) -> ReconcileResult<ReconcilePlan> {
        let source = CatalogIndex::new(fetch_snapshot(
            &self.source,
            Side::Source,
            &self.config.retry,
            &*self.sink,
        )?);
        let target = CatalogIndex::new(fetch_snapshot(
            &self.target,
            Side::Target,
            &self.config.retry,
            &*self.sink,
        )?);

        let kinds = EntityKind::RECONCILED
            .iter()
            .map(|kind| {
                let mode = if kind.carries_references() {
                    DiffMode::FullRecreate
                } else {
                    self.config.mode
                };
                let d = diff(source.of_kind(kind), target.of_kind(kind), mode);
                let (to_create, skipped): (Vec<_>, Vec<_>) = d
                    .to_create
                    .iter()
                    .partition(|e| !kind.carries_references() || e.has_references());

                KindPlan {
                    kind: kind.clone(),
                    to_create: to_create.iter().map(|e| e.friendly_id.clone()).collect(),
                    to_delete: d.to_delete.iter().map(display_name).collect(),
                    skipped: skipped.iter().map(|e| e.friendly_id.clone()).collect(),
                    unchanged: d.unchanged,
                    warnings: d.warnings.iter().map(ToString::to_string).collect(),
                }
            })
            .collect();

        Ok(ReconcilePlan {
            mode: self.config.mode,
            kinds,
        })
    }

    fn copy_currencies_phase(&mut self) -> ReconcileResult<KindReport> {
        let kind = EntityKind::Currency;
        let ops = Ops::new(&self.target, &*self.sink, &self.config);
        let session = session_mut(&mut self.session, ReconcileState::CopyCurrencies)?;

        let mut report = KindReport::new(kind.clone());
        let d = diff(
            session.source.of_kind(&kind),
            session.view.of_kind(&kind),
            self.config.mode,
        );
        ops.planned(&kind, &d, &mut report);

        let deleted = ops.delete(&d.to_delete, &mut report)?;
        session.forget(deleted);

        for currency in d.to_create.iter().filter(|e| e.has_prices() || e.has_references()) {
            ops.stripped(currency, &mut report);
        }
        for created in ops.create(d.to_create, CreateOptions::PLAIN, &mut report)? {
            session.view.insert(created);
        }

        self.report.record(&report);
        Ok(report)
    }

    fn copy_items_phase(&mut self) -> ReconcileResult<KindReport> {
        let kind = EntityKind::Item;
        let ops = Ops::new(&self.target, &*self.sink, &self.config);
        let session = session_mut(&mut self.session, ReconcileState::CopyItems)?;

        let mut report = KindReport::new(kind.clone());
        let d = diff(
            session.source.of_kind(&kind),
            session.view.of_kind(&kind),
            self.config.mode,
        );
        ops.planned(&kind, &d, &mut report);

        let deleted = ops.delete(&d.to_delete, &mut report)?;
        session.forget(deleted);

        session.pending_items = d
            .to_create
            .iter()
            .map(|e| e.friendly_id.clone())
            .collect();

        let mut ready = Vec::with_capacity(d.to_create.len());
        for item in d.to_create {
            let remapped = remap_price_options(&item, &session.source, &session.view);
            let waiting_on = waiting_on(&remapped, &session.pending_items);
            if !waiting_on.is_empty() {
                report.deferred += 1;
                ops.sink.on_event(&ReconcileEvent::Deferred {
                    friendly_id: item.friendly_id.clone(),
                    waiting_on,
                });
                session.deferred.push(item);
                continue;
            }
            ops.dropped(&remapped, &mut report);
            ready.push(remapped.entity);
        }

        for created in ops.create(ready, CreateOptions::PRICED, &mut report)? {
            session.view.insert(created);
        }

        self.report.record(&report);
        Ok(report)
    }

    fn retry_deferred_phase(&mut self) -> ReconcileResult<KindReport> {
        let ops = Ops::new(&self.target, &*self.sink, &self.config);
        let session = session_mut(&mut self.session, ReconcileState::RetryDeferredItems)?;

        let mut report = KindReport::new(EntityKind::Item);
        if session.deferred.is_empty() {
            return Ok(report);
        }

        let snapshot = fetch_snapshot(ops.target, Side::Target, ops.retry, ops.sink)?;
        session.replace_view(snapshot);

        let mut ready = Vec::new();
        for item in std::mem::take(&mut session.deferred) {
            let remapped = remap_price_options(&item, &session.source, &session.view);
            let waiting_on = waiting_on(&remapped, &session.pending_items);
            if !waiting_on.is_empty() {
                report.record_failure(
                    &item.kind,
                    &item.friendly_id,
                    None,
                    format!("still waiting on {}", waiting_on.join(", ")),
                );
                ops.sink.on_event(&ReconcileEvent::DeferralExhausted {
                    friendly_id: item.friendly_id.clone(),
                    waiting_on,
                });
                continue;
            }
            ops.dropped(&remapped, &mut report);
            ready.push(remapped.entity);
        }

        for created in ops.create(ready, CreateOptions::PRICED, &mut report)? {
            session.view.insert(created);
        }

        self.report.record(&report);
        Ok(report)
    }

    fn refresh_phase(&mut self) -> ReconcileResult<usize> {
        let ops = Ops::new(&self.target, &*self.sink, &self.config);
        let session = session_mut(&mut self.session, ReconcileState::RefreshTargetSnapshot)?;

        let snapshot = fetch_snapshot(ops.target, Side::Target, ops.retry, ops.sink)?;
        session.replace_view(snapshot);
        Ok(session.view.len())
    }

    /// Shared by bundles and stores: delete everything of the kind, then
    /// create the remapped source entities, referenced ones first.
    fn copy_composite_phase(&mut self, kind: EntityKind) -> ReconcileResult<KindReport> {
        let ops = Ops::new(&self.target, &*self.sink, &self.config);
        let phase = match kind {
            EntityKind::Store => ReconcileState::CopyStores,
            _ => ReconcileState::CopyBundles,
        };
        let session = session_mut(&mut self.session, phase)?;

        let mut report = KindReport::new(kind.clone());
        let d = diff(
            session.source.of_kind(&kind),
            session.view.of_kind(&kind),
            DiffMode::FullRecreate,
        );
        ops.planned(&kind, &d, &mut report);

        let deleted = ops.delete(&d.to_delete, &mut report)?;
        session.forget(deleted);

        let (candidates, empty): (Vec<CatalogEntity>, Vec<CatalogEntity>) =
            d.to_create.into_iter().partition(|e| e.has_references());
        for entity in empty {
            ops.skip(&entity, "declares no references".into(), &mut report);
        }

        for wave in dependency_waves(&candidates, &session.source) {
            let mut batch = Vec::with_capacity(wave.len());
            for pos in wave {
                let entity = &candidates[pos];
                match remap_references(entity, &session.source, &session.view) {
                    Ok(remapped) => {
                        ops.dropped(&remapped, &mut report);
                        batch.push(remapped.entity);
                    }
                    Err(err) => ops.skip(entity, err.to_string(), &mut report),
                }
            }
            for created in ops.create(batch, CreateOptions::FULL, &mut report)? {
                session.view.insert(created);
            }
        }

        self.report.record(&report);
        Ok(report)
    }

    fn enter(&mut self, phase: ReconcileState) -> ReconcileResult<()> {
        if self.session.is_none() || self.state.is_terminal() {
            return Err(self.transition_error(phase));
        }
        self.state = phase;
        self.sink.on_event(&ReconcileEvent::PhaseStarted { phase });
        Ok(())
    }

    fn complete<R>(
        &mut self,
        phase: ReconcileState,
        result: ReconcileResult<R>,
    ) -> ReconcileResult<R> {
        match &result {
            Ok(_) => self
                .sink
                .on_event(&ReconcileEvent::PhaseCompleted { phase }),
            Err(err) if err.is_fatal() => self.fail(err),
            Err(_) => {}
        }
        result
    }

    fn fail(&mut self, err: &ReconcileError) {
        self.state = ReconcileState::Failed;
        if let Some(session) = self.session.take() {
            self.report.duration_ms = session.started.elapsed().as_millis() as u64;
        }
        self.report.completed = false;
        self.sink.on_event(&ReconcileEvent::RunFailed {
            error: err.to_string(),
        });
    }

    fn transition_error(&self, to: ReconcileState) -> ReconcileError {
        ReconcileError::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}

fn session_mut(
    session: &mut Option<Session>,
    phase: ReconcileState,
) -> ReconcileResult<&mut Session> {
    session
        .as_mut()
        .ok_or_else(|| ReconcileError::InvalidStateTransition {
            from: "no session".into(),
            to: phase.to_string(),
        })
}

/// Friendly ids of items in the create set this item is priced in.
fn waiting_on(remapped: &Remapped, pending: &HashSet<String>) -> Vec<String> {
    let own = remapped.entity.friendly_id.as_str();
    let mut waiting: Vec<String> = remapped
        .pending_friendly_ids()
        .filter(|id| *id != own && pending.contains(*id))
        .map(str::to_string)
        .collect();
    waiting.sort();
    waiting.dedup();
    waiting
}

fn display_name(entity: &CatalogEntity) -> String {
    if entity.has_friendly_id() {
        entity.friendly_id.clone()
    } else {
        format!("<{}>", entity.id)
    }
}

/// Reads a full snapshot, retrying retryable failures.
fn fetch_snapshot<C: CatalogClient + ?Sized>(
    client: &C,
    side: Side,
    retry: &RetryConfig,
    sink: &dyn EventSink,
) -> ReconcileResult<Vec<CatalogEntity>> {
    let mut attempt = 0;
    loop {
        match client.search_all_entities() {
            Ok(entities) => {
                sink.on_event(&ReconcileEvent::SnapshotFetched {
                    side,
                    count: entities.len(),
                });
                return Ok(entities);
            }
            Err(err) => {
                let err = err.into_fetch(client.instance(), 0);
                attempt += 1;
                if !err.is_retryable() || attempt >= retry.max_attempts {
                    return Err(err);
                }
                sink.on_event(&ReconcileEvent::FetchRetry {
                    side,
                    attempt,
                    error: err.to_string(),
                });
                std::thread::sleep(retry.delay_for_attempt(attempt));
            }
        }
    }
}

/// Target-side operations of one phase.
struct Ops<'a, T> {
    target: &'a T,
    sink: &'a dyn EventSink,
    retry: &'a RetryConfig,
    chunk: usize,
}

impl<'a, T: CatalogClient> Ops<'a, T> {
    fn new(target: &'a T, sink: &'a dyn EventSink, config: &'a ReconcileConfig) -> Self {
        Self {
            target,
            sink,
            retry: &config.retry,
            chunk: config.batch_size.min(target.max_batch_size()).max(1),
        }
    }

    fn planned(&self, kind: &EntityKind, d: &Diff, report: &mut KindReport) {
        report.unchanged += d.unchanged;
        for warning in &d.warnings {
            if let DataQualityWarning::MissingFriendlyId {
                side: Side::Source,
                ..
            } = warning
            {
                report.skipped += 1;
            }
            report.warnings.push(warning.to_string());
            self.sink.on_event(&ReconcileEvent::DataQuality(warning.clone()));
        }
        self.sink.on_event(&ReconcileEvent::DiffPlanned {
            kind: kind.clone(),
            to_create: d.to_create.len(),
            to_delete: d.to_delete.len(),
            unchanged: d.unchanged,
        });
    }

    /// Deletes `entities` in chunks. Returns every id attempted, failed
    /// ones included: they no longer count as valid reference targets.
    ///
    /// A fatal outcome stops the phase.
    fn delete(
        &self,
        entities: &[CatalogEntity],
        report: &mut KindReport,
    ) -> ReconcileResult<HashSet<EntityId>> {
        for chunk in entities.chunks(self.chunk) {
            let ids: Vec<EntityId> = chunk.iter().map(|e| e.id.clone()).collect();
            debug!(instance = self.target.instance(), count = ids.len(), "deleting");
            let mut outcomes = self.target.delete_entities(&ids).into_iter();

            for entity in chunk {
                let outcome = outcomes.next().unwrap_or_else(|| {
                    Err(ReconcileError::Protocol("no outcome for deletion".into()))
                });
                match outcome {
                    Ok(()) => {
                        report.deleted += 1;
                        self.sink.on_event(&ReconcileEvent::Deleted {
                            kind: entity.kind.clone(),
                            id: entity.id.clone(),
                            friendly_id: entity.friendly_id.clone(),
                        });
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        let reason = err.to_string();
                        report.record_failure(
                            &entity.kind,
                            &entity.friendly_id,
                            Some(entity.id.clone()),
                            reason.clone(),
                        );
                        self.sink.on_event(&ReconcileEvent::DeleteFailed {
                            kind: entity.kind.clone(),
                            id: entity.id.clone(),
                            friendly_id: entity.friendly_id.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(entities.iter().map(|e| e.id.clone()).collect())
    }

    /// Creates `entities` in chunks. Returns the created entities carrying
    /// their new target ids. A fatal outcome stops the phase.
    fn create(
        &self,
        entities: Vec<CatalogEntity>,
        options: CreateOptions,
        report: &mut KindReport,
    ) -> ReconcileResult<Vec<CatalogEntity>> {
        let entities: Vec<CatalogEntity> =
            entities.into_iter().map(|e| options.apply(e)).collect();
        let mut created = Vec::with_capacity(entities.len());

        for chunk in entities.chunks(self.chunk) {
            debug!(instance = self.target.instance(), count = chunk.len(), "creating");
            let mut outcomes = self.target.create_entities(chunk, options).into_iter();

            for entity in chunk {
                let outcome = outcomes.next().unwrap_or_else(|| {
                    Err(ReconcileError::Protocol("no outcome for creation".into()))
                });
                match outcome {
                    Ok(id) => {
                        report.created += 1;
                        self.sink.on_event(&ReconcileEvent::Created {
                            kind: entity.kind.clone(),
                            friendly_id: entity.friendly_id.clone(),
                            id: id.clone(),
                        });
                        created.push(entity.with_id(id));
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        let reason = err.to_string();
                        report.record_failure(
                            &entity.kind,
                            &entity.friendly_id,
                            None,
                            reason.clone(),
                        );
                        self.sink.on_event(&ReconcileEvent::CreateFailed {
                            kind: entity.kind.clone(),
                            friendly_id: entity.friendly_id.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(created)
    }

    /// Records the prices and references a plain creation leaves behind.
    fn stripped(&self, entity: &CatalogEntity, report: &mut KindReport) {
        report.warnings.push(format!(
            "{}: {} prices and {} references not copied",
            entity.friendly_id,
            entity.price_options.len(),
            entity.references.len()
        ));
        self.sink.on_event(&ReconcileEvent::ReferencesDropped {
            kind: entity.kind.clone(),
            friendly_id: entity.friendly_id.clone(),
            unresolved: Vec::new(),
            dropped_prices: entity.price_options.len(),
            dropped_references: entity.references.len(),
        });
    }

    fn dropped(&self, remapped: &Remapped, report: &mut KindReport) {
        if remapped.is_complete() && remapped.dropped_references == 0 {
            return;
        }
        let entity = &remapped.entity;
        report.unresolved_references += remapped.unresolved_count();
        for unresolved in &remapped.unresolved {
            report
                .warnings
                .push(format!("{}: {}", entity.friendly_id, unresolved.error));
        }
        self.sink.on_event(&ReconcileEvent::ReferencesDropped {
            kind: entity.kind.clone(),
            friendly_id: entity.friendly_id.clone(),
            unresolved: remapped.unresolved.clone(),
            dropped_prices: remapped.dropped_prices,
            dropped_references: remapped.dropped_references,
        });
    }

    fn skip(&self, entity: &CatalogEntity, reason: String, report: &mut KindReport) {
        report.skipped += 1;
        self.sink.on_event(&ReconcileEvent::Skipped {
            kind: entity.kind.clone(),
            friendly_id: entity.friendly_id.clone(),
            reason,
        });
    }
}
