//! Test infrastructure for the Algolia backend.
//!
//! Provides an in-memory [`MockAlgoliaClient`] and fixtures for records,
//! registries and backends.

#![allow(dead_code)]

pub mod fixtures;
pub mod mock;

// Re-export commonly used items
pub use fixtures::*;
pub use mock::*;
