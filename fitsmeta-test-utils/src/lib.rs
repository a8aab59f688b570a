//! Test utilities for the FITS metadata pipeline
//!
//! This crate provides FITS and resource-file fixtures plus mock database
//! cursors and object stores for testing pipelines without a database or a
//! remote archive.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{Fixture, jwst_image, sample_catalog};
pub use fitsmeta_core::test_utils::{FitsBuilder, blank_blocks, format_card};
pub use mocks::{FailingObjectStore, Journal, RecordingCursor, RecordingFactory};
