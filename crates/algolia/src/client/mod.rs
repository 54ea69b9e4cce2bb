//! Remote index client abstraction.
//!
//! [`AlgoliaApi`] is the seam between the backend and the hosted service.
//! [`HttpAlgoliaClient`] talks to the real REST API; tests substitute an
//! in-memory implementation.

mod http;

pub use http::HttpAlgoliaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::WireDocument;
use crate::error::RemoteServiceError;

/// Handle to a named remote index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexHandle {
    name: String,
}

impl IndexHandle {
    /// Creates a handle for the index called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the remote index name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Settings pushed to an index during setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    /// Searchable attributes, most important first.
    pub attributes_to_index: Vec<String>,

    /// Attributes available for faceting and filtering.
    ///
    /// Empty unless several models share the index, in which case the
    /// record type field is declared filter-only.
    pub attributes_for_faceting: Vec<String>,

    /// Words that are optional in every query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_words: Option<Vec<String>>,
}

/// Query parameters sent with a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// Page size.
    pub hits_per_page: usize,
    /// Zero-based page number.
    pub page: usize,
    /// Facets to compute; `"*"` for all.
    pub facets: String,
    /// Ask for per-hit ranking information.
    pub get_ranking_info: bool,
    /// Filter expression restricting the hits, e.g. `django_ct:"blog.post"`.
    pub filters: Option<String>,
}

impl QueryParams {
    /// Creates parameters for one page requesting every facet.
    pub fn new(hits_per_page: usize, page: usize) -> Self {
        Self {
            hits_per_page,
            page,
            facets: "*".to_string(),
            get_ranking_info: false,
            filters: None,
        }
    }

    /// Encodes `query` and these parameters as a URL-encoded params string.
    pub fn to_params_string(&self, query: &str) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("query", query)
            .append_pair("hitsPerPage", &self.hits_per_page.to_string())
            .append_pair("page", &self.page.to_string())
            .append_pair("facets", &self.facets);
        if self.get_ranking_info {
            serializer.append_pair("getRankingInfo", "1");
        }
        if let Some(filters) = &self.filters {
            serializer.append_pair("filters", filters);
        }
        serializer.finish()
    }
}

/// Encodes a filter expression as the params string of a delete-by-query request.
pub fn filter_params_string(filters: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("filters", filters)
        .finish()
}

/// The subset of a search response the backend consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResponse {
    /// Matching documents for the requested page.
    #[serde(default)]
    pub hits: Vec<Map<String, Value>>,

    /// Total number of matches.
    #[serde(default)]
    pub nb_hits: u64,

    /// Page number served.
    #[serde(default)]
    pub page: usize,

    /// Number of pages available.
    #[serde(default)]
    pub nb_pages: usize,
}

/// Operations the backend needs from the hosted search service.
#[async_trait]
pub trait AlgoliaApi: Send + Sync {
    /// Returns a handle for the index named `name`. Does not contact the service.
    fn init_index(&self, name: &str) -> IndexHandle {
        IndexHandle::new(name)
    }

    /// Replaces the settings of an index.
    async fn set_settings(
        &self,
        index: &IndexHandle,
        settings: &IndexSettings,
    ) -> Result<(), RemoteServiceError>;

    /// Adds or replaces documents, keyed by `objectID`.
    async fn add_objects(
        &self,
        index: &IndexHandle,
        objects: &[WireDocument],
    ) -> Result<(), RemoteServiceError>;

    /// Deletes one document by `objectID`.
    async fn delete_object(
        &self,
        index: &IndexHandle,
        object_id: &str,
    ) -> Result<(), RemoteServiceError>;

    /// Deletes every document matching the filter expression `filters`.
    async fn delete_by(&self, index: &IndexHandle, filters: &str) -> Result<(), RemoteServiceError>;

    /// Removes every document from an index, keeping its settings.
    async fn clear_index(&self, index: &IndexHandle) -> Result<(), RemoteServiceError>;

    /// Runs a full-text query.
    async fn search(
        &self,
        index: &IndexHandle,
        query: &str,
        params: &QueryParams,
    ) -> Result<RawSearchResponse, RemoteServiceError>;
}
