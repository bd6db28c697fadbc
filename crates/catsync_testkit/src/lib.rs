//! # catsync Testkit
//!
//! Test utilities for catsync.
//!
//! This crate provides:
//! - Catalog fixtures and a builder that wires references by friendly id
//! - Property-based catalog generators using proptest
//! - Structural equivalence checks and reconciliation harnesses
//! - A fake Economy API server for exercising the HTTP client offline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catsync_testkit::prelude::*;
//!
//! #[test]
//! fn copies_everything() {
//!     let source = gold_sword_catalog();
//!     let mut harness = ReconcileHarness::new(source.clone(), Vec::new());
//!     harness.run();
//!     assert_catalogs_equivalent(&source, &harness.target_entities());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_api;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake_api::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fake_api::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
