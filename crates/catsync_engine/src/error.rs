//! Error types for the reconciliation engine.

use catsync_model::{EntityId, EntityKind, ModelError};
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur during reconciliation.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A catalog snapshot could not be retrieved. Fatal to the run.
    #[error("failed to fetch catalog of {instance} after {fetched} entities: {message}")]
    Fetch {
        /// Instance being read.
        instance: String,
        /// Error message.
        message: String,
        /// Entities fetched before the failing page.
        fetched: usize,
        /// Whether fetching again may succeed.
        retryable: bool,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The catalog service answered with an error code.
    #[error("catalog service rejected the request ({code}): {message}")]
    Rejected {
        /// Service status code.
        code: u16,
        /// Service error message.
        message: String,
    },

    /// The catalog service answered with something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The target refused to create an entity.
    #[error("failed to create {kind} {friendly_id}: {reason}")]
    CreateFailed {
        /// Entity kind.
        kind: EntityKind,
        /// Entity friendly id.
        friendly_id: String,
        /// Why.
        reason: String,
    },

    /// The target refused to delete an entity.
    #[error("failed to delete {id}: {reason}")]
    DeleteFailed {
        /// Instance id on the target.
        id: EntityId,
        /// Why.
        reason: String,
    },

    /// A phase was invoked out of order.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Catalog data could not be converted.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ReconcileError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Fetch { retryable, .. } => *retryable,
            ReconcileError::Transport { retryable, .. } => *retryable,
            ReconcileError::Rejected { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Returns true if this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::Fetch { .. }
                | ReconcileError::Authentication(_)
                | ReconcileError::InvalidStateTransition { .. }
        )
    }

    /// Wraps any error raised while reading a snapshot.
    pub(crate) fn into_fetch(self, instance: &str, fetched: usize) -> Self {
        match self {
            ReconcileError::Fetch { .. } | ReconcileError::Authentication(_) => self,
            other => ReconcileError::Fetch {
                instance: instance.to_string(),
                retryable: other.is_retryable(),
                message: other.to_string(),
                fetched,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ReconcileError::transport_retryable("connection reset").is_retryable());
        assert!(!ReconcileError::transport_fatal("bad certificate").is_retryable());
        assert!(ReconcileError::Rejected {
            code: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!ReconcileError::Rejected {
            code: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!ReconcileError::Authentication("expired".into()).is_retryable());
    }

    #[test]
    fn fatal_errors() {
        let fetch = ReconcileError::transport_retryable("timeout").into_fetch("SRC", 50);
        assert!(fetch.is_fatal());
        assert!(fetch.is_retryable());
        assert!(!ReconcileError::DeleteFailed {
            id: "a".into(),
            reason: "gone".into()
        }
        .is_fatal());
    }

    #[test]
    fn into_fetch_keeps_auth_errors() {
        let err = ReconcileError::Authentication("bad secret".into()).into_fetch("SRC", 0);
        assert!(matches!(err, ReconcileError::Authentication(_)));
    }

    #[test]
    fn error_display() {
        let err = ReconcileError::CreateFailed {
            kind: EntityKind::Item,
            friendly_id: "sword".into(),
            reason: "duplicate alternate id".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create item sword: duplicate alternate id"
        );

        let err = ReconcileError::transport_fatal("refused").into_fetch("TGT", 100);
        assert_eq!(
            err.to_string(),
            "failed to fetch catalog of TGT after 100 entities: transport error: refused"
        );
    }
}
