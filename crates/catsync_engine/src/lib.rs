//! # catsync engine
//!
//! Phased reconciliation of a product catalog from a source instance onto a
//! target instance.
//!
//! This crate provides:
//! - The reconciliation state machine (currencies → items → deferred items →
//!   refresh → bundles → stores)
//! - The `CatalogClient` abstraction and an in-memory implementation
//! - An Economy catalog HTTP client and title authentication
//! - Typed reconciliation events and run reports
//!
//! ## Architecture
//!
//! Both instances assign their own ids, so the engine matches entities by
//! friendly id only:
//! 1. Fetch full snapshots of source and target
//! 2. Diff each kind by friendly id
//! 3. Remap outgoing references into target space
//! 4. Delete, then create, one phase at a time
//!
//! ## Key Invariants
//!
//! - Phases run strictly in order; each one sees the previous one's creations
//! - Only snapshot fetches and authentication are fatal; per-entity failures
//!   are reported
//! - Re-running against an unchanged source is safe

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod client;
mod config;
mod error;
mod events;
mod http;
mod reconciler;
mod report;

pub use auth::{AuthProvider, SecretKeyAuth, StaticToken};
pub use client::{CatalogClient, CreateOptions, MemoryCatalog};
pub use config::{EconomyConfig, ReconcileConfig, RetryConfig};
pub use error::{ReconcileError, ReconcileResult};
pub use events::{EventSink, ReconcileEvent, RecordingSink, TracingSink};
pub use http::{ApiEnvelope, EconomyCatalogClient, HttpClient};
pub use reconciler::{ReconcileState, Reconciler};
pub use report::{
    render_catalog, render_plan, EntityFailure, KindPlan, KindReport, ReconcilePlan, RunReport,
};

/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
