//! Algolia Search Backend
//!
//! This crate plugs the hosted Algolia search service into a haystack-style
//! full-text search layer. It translates the framework's backend contract
//! (setup, update, remove, clear, search, more-like-this) into Algolia REST
//! calls, and converts values between the application's records and
//! Algolia's JSON documents.
//!
//! # Features
//!
//! - **Lazy setup**: index settings are pushed once, on first use
//! - **Batched indexing**: documents are submitted in chunks of 50
//! - **Value codec**: dates, date/times, byte strings and sets are normalized
//!   on the way out, and date/times and JSON literals are recovered on the way back
//! - **Per-model or shared indexes**: `INDEX_NAME_PREFIX` or `INDEX_NAME`
//!
//! Enable the `cli` feature to build the `algolia-admin` binary.
//!
//! # Architecture
//!
//! - [`codec`] - Native value to JSON conversion, and back
//! - [`document`] - Wire document building
//! - [`model`] - Model identity and the record-side traits
//! - [`registry`] - The model registry collaborator and field converters
//! - [`client`] - The remote service client trait and its HTTP implementation
//! - [`index`] - Model to remote index mapping and configuration
//! - [`backend`] - The search backend itself
//! - [`query`] - Filter trees and query objects
//! - [`config`] - Connection configuration
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use haystack_algolia::{AlgoliaConfig, AlgoliaSearchBackend, ModelId, SearchOptions};
//! use haystack_algolia::registry::StaticRegistry;
//!
//! # async fn run() -> haystack_algolia::BackendResult<()> {
//! let config = AlgoliaConfig {
//!     app_id: "APPID".to_string(),
//!     api_key: "secret".to_string(),
//!     index_name_prefix: Some("prod_".to_string()),
//!     ..Default::default()
//! };
//! let registry = StaticRegistry::new()
//!     .with_model(ModelId::new("blog", "post"), [("title", 2.0), ("text", 1.0)]);
//!
//! let backend = AlgoliaSearchBackend::new("default", config, Arc::new(registry))?;
//! let response = backend
//!     .search("rust", &SearchOptions::for_model(ModelId::new("blog", "post")))
//!     .await?;
//! println!("{} hits", response.hits);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod client;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod model;
pub mod query;
pub mod registry;

// Re-export commonly used types at crate root
pub use backend::{
    AlgoliaSearchBackend, BackendState, SearchOptions, SearchResponse, SearchResult,
    UPDATE_CHUNK_SIZE,
};
pub use codec::{NativeValue, to_native, to_wire};
pub use config::{AlgoliaConfig, IndexNaming};
pub use document::{WireDocument, build_document};
pub use error::{BackendError, BackendResult, ConfigurationError, DocumentError, RemoteServiceError};
pub use model::{Indexable, ModelId, PreparedDocument, SearchIndex};
pub use query::{AlgoliaSearchQuery, FilterNode, build_query};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
