//! # catsync model
//!
//! Catalog entity model and the pure reconciliation primitives.
//!
//! This crate provides:
//! - `CatalogEntity` and its references, prices and payload
//! - `CatalogIndex` for O(1) lookup by instance id and friendly id
//! - The identity resolver (`resolve`)
//! - The diff engine (`diff`)
//! - The reference remapper (`remap_references`, `remap_price_options`)
//! - Wire conversion for the Economy catalog item JSON shape
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - Instance ids are only meaningful inside the instance that assigned them
//! - The friendly id is the only cross-instance identity key
//! - Remapped entities never carry source-space ids

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod entity;
mod error;
mod index;
mod remap;
pub mod wire;

pub use diff::{diff, Diff, DiffMode};
pub use entity::{CatalogEntity, EntityId, EntityKind, EntityReference, Payload, Price, PriceAmount};
pub use error::{DataQualityWarning, ModelError, ModelResult, RemapError, ResolveError, Side};
pub use index::{resolve, resolve_strict, CatalogIndex};
pub use remap::{
    dependency_waves, remap_price_options, remap_references, ReferenceSite, Remapped,
    UnresolvedReference,
};
