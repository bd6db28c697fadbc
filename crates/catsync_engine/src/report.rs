//! Run reports, dry-run plans and human-readable renderings.

use catsync_model::{CatalogEntity, DiffMode, EntityId, EntityKind};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// A single entity that could not be created or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    /// Kind.
    pub kind: EntityKind,
    /// Friendly id.
    pub friendly_id: String,
    /// Target id, for failed deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Why.
    pub reason: String,
}

/// Outcome counts for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindReport {
    /// Kind.
    pub kind: EntityKind,
    /// Entities created.
    pub created: usize,
    /// Entities deleted.
    pub deleted: usize,
    /// Entities left untouched because they already matched.
    pub unchanged: usize,
    /// Entities never attempted (no friendly id, nothing to migrate).
    pub skipped: usize,
    /// Items postponed to the retry pass.
    pub deferred: usize,
    /// Creations and deletions that failed.
    pub failed: usize,
    /// References and price amounts dropped during remapping.
    pub unresolved_references: usize,
    /// Failure details.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EntityFailure>,
    /// Data quality and remapping notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl KindReport {
    /// Creates an empty report for `kind`.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            created: 0,
            deleted: 0,
            unchanged: 0,
            skipped: 0,
            deferred: 0,
            failed: 0,
            unresolved_references: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds `other` into this report.
    pub fn merge(&mut self, other: &KindReport) {
        self.created += other.created;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.deferred += other.deferred;
        self.failed += other.failed;
        self.unresolved_references += other.unresolved_references;
        self.failures.extend(other.failures.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Returns true if nothing was created or deleted.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.deleted == 0
    }

    pub(crate) fn record_failure(
        &mut self,
        kind: &EntityKind,
        friendly_id: &str,
        id: Option<EntityId>,
        reason: String,
    ) {
        self.failed += 1;
        self.failures.push(EntityFailure {
            kind: kind.clone(),
            friendly_id: friendly_id.to_string(),
            id,
            reason,
        });
    }
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Diff policy used for currencies and items.
    pub mode: DiffMode,
    /// One entry per reconciled kind, in phase order.
    pub kinds: Vec<KindReport>,
    /// Wall time of the run.
    pub duration_ms: u64,
    /// False when the run aborted on a fatal error.
    pub completed: bool,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new(mode: DiffMode) -> Self {
        Self {
            mode,
            kinds: EntityKind::RECONCILED
                .iter()
                .cloned()
                .map(KindReport::new)
                .collect(),
            duration_ms: 0,
            completed: false,
        }
    }

    /// Merges a phase's outcome into the entry for its kind.
    pub fn record(&mut self, phase: &KindReport) {
        match self.kinds.iter_mut().find(|k| k.kind == phase.kind) {
            Some(existing) => existing.merge(phase),
            None => self.kinds.push(phase.clone()),
        }
    }

    /// Returns the entry for `kind`.
    pub fn kind(&self, kind: &EntityKind) -> Option<&KindReport> {
        self.kinds.iter().find(|k| &k.kind == kind)
    }

    /// Total entities created.
    pub fn created(&self) -> usize {
        self.kinds.iter().map(|k| k.created).sum()
    }

    /// Total entities deleted.
    pub fn deleted(&self) -> usize {
        self.kinds.iter().map(|k| k.deleted).sum()
    }

    /// Total per-entity failures.
    pub fn failed(&self) -> usize {
        self.kinds.iter().map(|k| k.failed).sum()
    }

    /// Returns true if the run completed without failures or dropped ids.
    pub fn is_clean(&self) -> bool {
        self.completed
            && self
                .kinds
                .iter()
                .all(|k| k.failed == 0 && k.unresolved_references == 0)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.completed { "completed" } else { "aborted" };
        writeln!(
            f,
            "Catalog reconciliation ({}) {} in {} ms",
            mode_name(self.mode),
            status,
            self.duration_ms
        )?;
        for k in &self.kinds {
            writeln!(
                f,
                "  {:<9} created {:>4}  deleted {:>4}  unchanged {:>4}  skipped {:>4}  deferred {:>4}  failed {:>4}",
                k.kind.to_string(),
                k.created,
                k.deleted,
                k.unchanged,
                k.skipped,
                k.deferred,
                k.failed
            )?;
        }
        for failure in self.kinds.iter().flat_map(|k| &k.failures) {
            writeln!(
                f,
                "  FAILED {} {}: {}",
                failure.kind, failure.friendly_id, failure.reason
            )?;
        }
        Ok(())
    }
}

/// Planned changes for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindPlan {
    /// Kind.
    pub kind: EntityKind,
    /// Friendly ids that would be created.
    pub to_create: Vec<String>,
    /// Friendly ids that would be deleted (target ids when unnamed).
    pub to_delete: Vec<String>,
    /// Friendly ids that would be skipped.
    pub skipped: Vec<String>,
    /// Entities that would be left alone.
    pub unchanged: usize,
    /// Data quality warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What a run would do, computed without touching the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Diff policy for currencies and items.
    pub mode: DiffMode,
    /// One entry per reconciled kind, in phase order.
    pub kinds: Vec<KindPlan>,
}

impl ReconcilePlan {
    /// Returns the entry for `kind`.
    pub fn kind(&self, kind: &EntityKind) -> Option<&KindPlan> {
        self.kinds.iter().find(|k| &k.kind == kind)
    }

    /// Returns true if the run would change nothing.
    pub fn is_empty(&self) -> bool {
        self.kinds
            .iter()
            .all(|k| k.to_create.is_empty() && k.to_delete.is_empty())
    }
}

/// Renders a dry-run plan.
pub fn render_plan(plan: &ReconcilePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reconciliation plan ({})", mode_name(plan.mode));
    for k in &plan.kinds {
        let _ = writeln!(
            out,
            "{}: {} to create, {} to delete, {} unchanged",
            k.kind,
            k.to_create.len(),
            k.to_delete.len(),
            k.unchanged
        );
        for id in &k.to_delete {
            let _ = writeln!(out, "  - {id}");
        }
        for id in &k.to_create {
            let _ = writeln!(out, "  + {id}");
        }
        for id in &k.skipped {
            let _ = writeln!(out, "  ! {id} (skipped)");
        }
        for warning in &k.warnings {
            let _ = writeln!(out, "  warning: {warning}");
        }
    }
    out
}

/// Renders a catalog listing, reconciled kinds first in phase order.
pub fn render_catalog(entities: &[CatalogEntity]) -> String {
    let mut ordered: Vec<&CatalogEntity> = entities.iter().collect();
    ordered.sort_by_key(|e| {
        EntityKind::RECONCILED
            .iter()
            .position(|k| k == &e.kind)
            .unwrap_or(EntityKind::RECONCILED.len())
    });

    let mut out = String::new();
    for entity in ordered {
        let stack_id = entity
            .payload
            .get("DefaultStackId")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "Type: {} - FriendlyId: {} (StackId: {})",
            entity.kind.wire_name(),
            entity.friendly_id,
            stack_id
        );
    }
    out
}

fn mode_name(mode: DiffMode) -> &'static str {
    match mode {
        DiffMode::Incremental => "incremental",
        DiffMode::FullRecreate => "full recreate",
    }
}
