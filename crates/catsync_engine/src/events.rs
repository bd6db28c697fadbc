//! Reconciliation events and sinks.

use crate::reconciler::ReconcileState;
use catsync_model::{DataQualityWarning, EntityId, EntityKind, Side, UnresolvedReference};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// A phase started.
    PhaseStarted {
        /// Phase.
        phase: ReconcileState,
    },
    /// A phase finished.
    PhaseCompleted {
        /// Phase.
        phase: ReconcileState,
    },
    /// A full snapshot was read.
    SnapshotFetched {
        /// Instance side.
        side: Side,
        /// Entities read.
        count: usize,
    },
    /// A snapshot read failed and will be retried.
    FetchRetry {
        /// Instance side.
        side: Side,
        /// Attempt that failed, starting at 1.
        attempt: u32,
        /// Failure.
        error: String,
    },
    /// Create and delete sets of one kind were computed.
    DiffPlanned {
        /// Kind.
        kind: EntityKind,
        /// Entities to create.
        to_create: usize,
        /// Entities to delete.
        to_delete: usize,
        /// Entities left alone.
        unchanged: usize,
    },
    /// A snapshot contains unmatchable data.
    DataQuality(DataQualityWarning),
    /// An entity was deleted from the target.
    Deleted {
        /// Kind.
        kind: EntityKind,
        /// Target id.
        id: EntityId,
        /// Friendly id.
        friendly_id: String,
    },
    /// The target refused a deletion.
    DeleteFailed {
        /// Kind.
        kind: EntityKind,
        /// Target id.
        id: EntityId,
        /// Friendly id.
        friendly_id: String,
        /// Failure.
        reason: String,
    },
    /// An entity was created on the target.
    Created {
        /// Kind.
        kind: EntityKind,
        /// Friendly id.
        friendly_id: String,
        /// Id assigned by the target.
        id: EntityId,
    },
    /// The target refused a creation.
    CreateFailed {
        /// Kind.
        kind: EntityKind,
        /// Friendly id.
        friendly_id: String,
        /// Failure.
        reason: String,
    },
    /// An entity was not created at all.
    Skipped {
        /// Kind.
        kind: EntityKind,
        /// Friendly id.
        friendly_id: String,
        /// Why.
        reason: String,
    },
    /// Some references or prices of an entity could not be remapped.
    ReferencesDropped {
        /// Kind.
        kind: EntityKind,
        /// Friendly id.
        friendly_id: String,
        /// Ids that did not resolve.
        unresolved: Vec<UnresolvedReference>,
        /// Prices left without any amount.
        dropped_prices: usize,
        /// References whose price list emptied out.
        dropped_references: usize,
    },
    /// An item was postponed until the items it is priced in exist.
    Deferred {
        /// Friendly id.
        friendly_id: String,
        /// Friendly ids of the items it waits on.
        waiting_on: Vec<String>,
    },
    /// A deferred item still could not be resolved on retry.
    DeferralExhausted {
        /// Friendly id.
        friendly_id: String,
        /// Friendly ids still missing.
        waiting_on: Vec<String>,
    },
    /// The run finished.
    RunCompleted {
        /// Entities created.
        created: usize,
        /// Entities deleted.
        deleted: usize,
        /// Per-entity failures.
        failed: usize,
    },
    /// The run aborted.
    RunFailed {
        /// Fatal error.
        error: String,
    },
}

/// Receives reconciliation events.
pub trait EventSink: Send + Sync {
    /// Called for every event, in order.
    fn on_event(&self, event: &ReconcileEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::PhaseStarted { phase } => info!(%phase, "phase started"),
            ReconcileEvent::PhaseCompleted { phase } => debug!(%phase, "phase completed"),
            ReconcileEvent::SnapshotFetched { side, count } => {
                info!(%side, count, "snapshot fetched")
            }
            ReconcileEvent::FetchRetry {
                side,
                attempt,
                error,
            } => warn!(%side, attempt, %error, "snapshot fetch failed, retrying"),
            ReconcileEvent::DiffPlanned {
                kind,
                to_create,
                to_delete,
                unchanged,
            } => info!(%kind, to_create, to_delete, unchanged, "diff planned"),
            ReconcileEvent::DataQuality(warning) => warn!(%warning, "data quality"),
            ReconcileEvent::Deleted {
                kind,
                id,
                friendly_id,
            } => debug!(%kind, %id, %friendly_id, "deleted"),
            ReconcileEvent::DeleteFailed {
                kind,
                id,
                friendly_id,
                reason,
            } => error!(%kind, %id, %friendly_id, %reason, "delete failed"),
            ReconcileEvent::Created {
                kind,
                friendly_id,
                id,
            } => debug!(%kind, %friendly_id, %id, "created"),
            ReconcileEvent::CreateFailed {
                kind,
                friendly_id,
                reason,
            } => error!(%kind, %friendly_id, %reason, "create failed"),
            ReconcileEvent::Skipped {
                kind,
                friendly_id,
                reason,
            } => warn!(%kind, %friendly_id, %reason, "skipped"),
            ReconcileEvent::ReferencesDropped {
                kind,
                friendly_id,
                unresolved,
                dropped_prices,
                dropped_references,
            } => {
                for reference in unresolved {
                    warn!(%kind, %friendly_id, error = %reference.error, "reference dropped");
                }
                if *dropped_prices > 0 || *dropped_references > 0 {
                    warn!(
                        %kind,
                        %friendly_id,
                        dropped_prices,
                        dropped_references,
                        "prices dropped"
                    );
                }
            }
            ReconcileEvent::Deferred {
                friendly_id,
                waiting_on,
            } => info!(%friendly_id, waiting_on = ?waiting_on, "item deferred"),
            ReconcileEvent::DeferralExhausted {
                friendly_id,
                waiting_on,
            } => error!(%friendly_id, waiting_on = ?waiting_on, "deferred item still unresolved"),
            ReconcileEvent::RunCompleted {
                created,
                deleted,
                failed,
            } => info!(created, deleted, failed, "reconciliation completed"),
            ReconcileEvent::RunFailed { error } => error!(%error, "reconciliation failed"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().clone()
    }

    /// Counts events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ReconcileEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Drops recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &ReconcileEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.on_event(&ReconcileEvent::PhaseStarted {
            phase: ReconcileState::CopyCurrencies,
        });
        sink.on_event(&ReconcileEvent::Created {
            kind: EntityKind::Currency,
            friendly_id: "gold".into(),
            id: "t-1".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ReconcileEvent::PhaseStarted { .. }));
        assert_eq!(
            sink.count(|e| matches!(e, ReconcileEvent::Created { .. })),
            1
        );

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.on_event(&ReconcileEvent::DataQuality(
            DataQualityWarning::MissingFriendlyId {
                side: Side::Source,
                kind: EntityKind::Item,
                id: "x".into(),
            },
        ));
        sink.on_event(&ReconcileEvent::RunFailed {
            error: "boom".into(),
        });
    }
}
