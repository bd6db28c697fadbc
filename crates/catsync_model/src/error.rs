//! Error and warning types for the catalog model.

use crate::entity::{EntityId, EntityKind};
use std::fmt;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while converting catalog data.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The catalog item is structurally invalid.
    #[error("invalid catalog item: {0}")]
    InvalidItem(String),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons an identity lookup can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The id does not exist in the source snapshot.
    #[error("reference {id} not found in source snapshot")]
    ReferenceNotFound {
        /// Dangling source id.
        id: EntityId,
    },

    /// The source entity has no counterpart on the target yet.
    #[error("no target counterpart for {friendly_id} (source id {id})")]
    Unresolved {
        /// Source id.
        id: EntityId,
        /// Friendly id looked up on the target.
        friendly_id: String,
    },
}

impl ResolveError {
    /// Returns the source id that failed to resolve.
    pub fn source_id(&self) -> &EntityId {
        match self {
            ResolveError::ReferenceNotFound { id } | ResolveError::Unresolved { id, .. } => id,
        }
    }

    /// Returns the friendly id, when the source entity was found.
    pub fn friendly_id(&self) -> Option<&str> {
        match self {
            ResolveError::ReferenceNotFound { .. } => None,
            ResolveError::Unresolved { friendly_id, .. } => Some(friendly_id),
        }
    }
}

/// Reasons an entity is excluded from remapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    /// A bundle or store without references has nothing to migrate.
    #[error("{kind} {friendly_id} declares no references")]
    NoReferences {
        /// Entity kind.
        kind: EntityKind,
        /// Entity friendly id.
        friendly_id: String,
    },
}

/// Which snapshot a warning was raised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The source instance.
    Source,
    /// The target instance.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Non-fatal data problems found in a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// The same friendly id appears more than once.
    #[error("{side} has {count} {kind} entities with friendly id {friendly_id}")]
    DuplicateFriendlyId {
        /// Snapshot side.
        side: Side,
        /// Entity kind.
        kind: EntityKind,
        /// Duplicated friendly id.
        friendly_id: String,
        /// Number of occurrences.
        count: usize,
    },

    /// An entity has no friendly id and cannot be matched.
    #[error("{side} {kind} {id} has no friendly id")]
    MissingFriendlyId {
        /// Snapshot side.
        side: Side,
        /// Entity kind.
        kind: EntityKind,
        /// Instance id of the entity.
        id: EntityId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_accessors() {
        let missing = ResolveError::ReferenceNotFound { id: "7".into() };
        assert_eq!(missing.source_id().as_str(), "7");
        assert_eq!(missing.friendly_id(), None);

        let pending = ResolveError::Unresolved {
            id: "8".into(),
            friendly_id: "shield".into(),
        };
        assert_eq!(pending.friendly_id(), Some("shield"));
    }

    #[test]
    fn error_display() {
        let err = RemapError::NoReferences {
            kind: EntityKind::Bundle,
            friendly_id: "empty-pack".into(),
        };
        assert_eq!(err.to_string(), "bundle empty-pack declares no references");

        let warning = DataQualityWarning::DuplicateFriendlyId {
            side: Side::Target,
            kind: EntityKind::Item,
            friendly_id: "sword".into(),
            count: 2,
        };
        assert_eq!(
            warning.to_string(),
            "target has 2 item entities with friendly id sword"
        );
    }
}
