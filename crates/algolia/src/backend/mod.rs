//! Algolia search backend.
//!
//! [`AlgoliaSearchBackend`] implements the search framework's backend
//! contract (`setup`, `update`, `remove`, `clear`, `search`,
//! `more_like_this`) on top of an [`AlgoliaApi`] client.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --setup()--> Configured --first operation--> Ready
//!       ^                                                      |
//!       +--------------------- reset_setup() ------------------+
//! ```
//!
//! Every mutating or query operation runs setup first when the backend is
//! still `Uninitialized`. Setup pushes settings for every registered model
//! and runs under an async mutex, so concurrent first callers configure the
//! indexes exactly once. A failed setup leaves the backend `Uninitialized`.

mod results;

pub use results::{
    DefaultResultFactory, PLACEHOLDER_SCORE, RANKING_INFO_FIELD, ResultFactory, SearchResponse,
    SearchResult, process_results,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::client::{AlgoliaApi, HttpAlgoliaClient, QueryParams, RawSearchResponse};
use crate::config::AlgoliaConfig;
use crate::document::{RECORD_TYPE_FIELD, WireDocument, build_document};
use crate::error::{BackendError, BackendResult, DocumentError};
use crate::index::IndexManager;
use crate::model::{Indexable, ModelId, SearchIndex};
use crate::registry::{IndexRegistry, fields_to_index};

/// Maximum number of documents sent in one batch request.
pub const UPDATE_CHUNK_SIZE: usize = 50;

/// Setup state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Index settings have not been pushed.
    Uninitialized,
    /// Index settings are pushed; no operation has completed yet.
    Configured,
    /// At least one operation has completed against configured indexes.
    Ready,
}

/// Options of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Offset of the first result (default: 0).
    pub start_offset: usize,
    /// Offset one past the last result (default: 20).
    pub end_offset: usize,
    /// Models to search. Exactly one is supported.
    pub models: Vec<ModelId>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            start_offset: 0,
            end_offset: 20,
            models: Vec::new(),
        }
    }
}

impl SearchOptions {
    /// Options searching `model` with the default window.
    pub fn for_model(model: ModelId) -> Self {
        Self {
            models: vec![model],
            ..Default::default()
        }
    }

    /// Sets the result window.
    pub fn with_window(mut self, start_offset: usize, end_offset: usize) -> Self {
        self.start_offset = start_offset;
        self.end_offset = end_offset;
        self
    }

    /// Returns `(hits_per_page, page)` for the window, or `None` if it is empty.
    pub fn page_window(&self) -> Option<(usize, usize)> {
        let per_page = self.end_offset.checked_sub(self.start_offset)?;
        if per_page == 0 {
            return None;
        }
        Some((per_page, self.start_offset / per_page))
    }
}

/// Search backend backed by hosted Algolia indexes.
pub struct AlgoliaSearchBackend {
    alias: String,
    config: AlgoliaConfig,
    registry: Arc<dyn IndexRegistry>,
    indexes: IndexManager,
    state: Mutex<BackendState>,
}

impl AlgoliaSearchBackend {
    /// Creates a backend talking to the Algolia REST API.
    ///
    /// Fails with [`BackendError::Configuration`] when a required connection
    /// parameter is missing.
    pub fn new(
        alias: impl Into<String>,
        config: AlgoliaConfig,
        registry: Arc<dyn IndexRegistry>,
    ) -> BackendResult<Self> {
        let alias = alias.into();
        config.validate(&alias)?;
        let client = HttpAlgoliaClient::from_config(&alias, &config)?;
        Self::with_client(alias, config, registry, Arc::new(client))
    }

    /// Creates a backend using the given client.
    pub fn with_client(
        alias: impl Into<String>,
        config: AlgoliaConfig,
        registry: Arc<dyn IndexRegistry>,
        client: Arc<dyn AlgoliaApi>,
    ) -> BackendResult<Self> {
        let alias = alias.into();
        config.validate(&alias)?;
        let indexes = IndexManager::new(client, config.index_naming());

        Ok(Self {
            alias,
            config,
            registry,
            indexes,
            state: Mutex::new(BackendState::Uninitialized),
        })
    }

    /// The connection alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The connection configuration.
    pub fn config(&self) -> &AlgoliaConfig {
        &self.config
    }

    /// The model registry.
    pub fn registry(&self) -> &Arc<dyn IndexRegistry> {
        &self.registry
    }

    /// The index manager.
    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    /// Returns the current setup state.
    pub async fn state(&self) -> BackendState {
        *self.state.lock().await
    }

    /// Pushes settings for every registered model.
    ///
    /// Indexes configured earlier are skipped, so calling this again is cheap.
    pub async fn setup(&self) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        self.configure_indexes().await?;
        if *state == BackendState::Uninitialized {
            *state = BackendState::Configured;
        }
        Ok(())
    }

    /// Returns the backend to `Uninitialized` so the next operation reconfigures.
    pub async fn reset_setup(&self) {
        let mut state = self.state.lock().await;
        self.indexes.invalidate_all();
        *state = BackendState::Uninitialized;
    }

    async fn ensure_setup(&self) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        if *state == BackendState::Uninitialized {
            self.configure_indexes().await?;
            *state = BackendState::Configured;
        }
        Ok(())
    }

    async fn mark_ready(&self) {
        let mut state = self.state.lock().await;
        if *state == BackendState::Configured {
            *state = BackendState::Ready;
        }
    }

    async fn configure_indexes(&self) -> BackendResult<()> {
        // Models sharing an index get one settings push with the union of their fields.
        let mut plan: Vec<(ModelId, String, Vec<String>)> = Vec::new();
        let mut by_index: HashMap<String, usize> = HashMap::new();
        for model in self.registry.indexed_models() {
            let fields = fields_to_index(self.registry.as_ref(), &model);
            let name = self.indexes.index_name(&model);
            match by_index.get(&name) {
                Some(&i) => {
                    let merged = &mut plan[i].2;
                    for field in fields {
                        if !merged.contains(&field) {
                            merged.push(field);
                        }
                    }
                }
                None => {
                    by_index.insert(name.clone(), plan.len());
                    plan.push((model, name, fields));
                }
            }
        }

        for (model, name, fields) in plan {
            self.indexes
                .configure(&model, fields, self.config.optional_words.clone())
                .await
                .map_err(|source| BackendError::SetupFailed {
                    alias: self.alias.clone(),
                    index: name,
                    source,
                })?;
        }

        tracing::info!(
            alias = %self.alias,
            models = by_index.len(),
            "Algolia backend setup complete"
        );
        Ok(())
    }

    /// Adds or replaces `records`, each in the index of its own model.
    ///
    /// Every record is prepared and built before anything is sent. Documents
    /// are grouped by record model, then submitted in chunks of
    /// [`UPDATE_CHUNK_SIZE`], one request at a time; the first failed chunk
    /// ends the update. `commit` has no effect, the service applies writes on
    /// its own.
    pub async fn update<I: SearchIndex>(
        &self,
        index: &I,
        records: &[I::Record],
        commit: bool,
    ) -> BackendResult<()> {
        self.ensure_setup().await?;

        let mut groups: BTreeMap<ModelId, Vec<WireDocument>> = BTreeMap::new();
        for record in records {
            let document = build_document(&index.full_prepare(record))?;
            groups.entry(record.model()).or_default().push(document);
        }

        for (model, documents) in &groups {
            let handle = self.indexes.index_for(model);
            for (n, chunk) in documents.chunks(UPDATE_CHUNK_SIZE).enumerate() {
                tracing::debug!(
                    index = %handle.name(),
                    chunk = n,
                    count = chunk.len(),
                    "Submitting documents"
                );
                self.indexes.client().add_objects(&handle, chunk).await?;
            }

            tracing::debug!(
                model = %model,
                count = documents.len(),
                commit,
                "Updated index"
            );
        }

        self.mark_ready().await;
        Ok(())
    }

    /// Removes `record` from its model's index.
    ///
    /// Removing a record that is not indexed succeeds.
    pub async fn remove<R: Indexable>(&self, record: &R, commit: bool) -> BackendResult<()> {
        self.remove_object(&record.model(), &record.identifier(), commit)
            .await
    }

    /// Removes a record by canonical identifier (`app_label.model_name.pk`).
    pub async fn remove_identifier(&self, identifier: &str, commit: bool) -> BackendResult<()> {
        let mut parts = identifier.splitn(3, '.');
        let model = match (parts.next(), parts.next(), parts.next()) {
            (Some(app), Some(name), Some(pk)) if !app.is_empty() && !name.is_empty() && !pk.is_empty() => {
                ModelId::new(app, name)
            }
            _ => {
                return Err(DocumentError::InvalidRecordType {
                    value: identifier.to_string(),
                }
                .into());
            }
        };
        self.remove_object(&model, identifier, commit).await
    }

    async fn remove_object(
        &self,
        model: &ModelId,
        object_id: &str,
        commit: bool,
    ) -> BackendResult<()> {
        self.ensure_setup().await?;

        let handle = self.indexes.index_for(model);
        match self.indexes.client().delete_object(&handle, object_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(index = %handle.name(), object_id, "Object already absent");
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(index = %handle.name(), object_id, commit, "Removed object");
        self.mark_ready().await;
        Ok(())
    }

    /// Deletes every document of `models`, or of every registered model when empty.
    ///
    /// Models with their own index clear it, once per index. When models share
    /// one index, only an unrestricted clear wipes it; a clear naming models
    /// deletes just their records by record type.
    pub async fn clear(&self, models: &[ModelId], commit: bool) -> BackendResult<()> {
        self.ensure_setup().await?;

        let targets = if models.is_empty() {
            self.registry.indexed_models()
        } else {
            models.to_vec()
        };

        let mut cleared: Vec<String> = Vec::new();
        for model in &targets {
            let handle = self.indexes.index_for(model);
            let filter = if models.is_empty() {
                None
            } else {
                self.indexes.model_filter(model)
            };
            if let Some(filter) = filter {
                self.indexes.client().delete_by(&handle, &filter).await?;
                tracing::info!(
                    index = %handle.name(),
                    model = %model,
                    commit,
                    "Deleted model records"
                );
                continue;
            }
            if cleared.iter().any(|name| name == handle.name()) {
                continue;
            }
            self.indexes.client().clear_index(&handle).await?;
            tracing::info!(index = %handle.name(), model = %model, commit, "Cleared index");
            cleared.push(handle.name().to_string());
        }

        self.mark_ready().await;
        Ok(())
    }

    /// Runs `query` against exactly one model, returning [`SearchResult`]s.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> BackendResult<SearchResponse<SearchResult>> {
        self.search_with(query, options, &DefaultResultFactory)
            .await
    }

    /// Runs `query` against exactly one model, building results with `factory`.
    ///
    /// Searching zero or several models is unsupported: a warning is logged
    /// and an empty response returned without contacting the service. An
    /// empty result window is handled the same way.
    pub async fn search_with<F: ResultFactory>(
        &self,
        query: &str,
        options: &SearchOptions,
        factory: &F,
    ) -> BackendResult<SearchResponse<F::Output>> {
        let model = match options.models.as_slice() {
            [model] => model,
            models => {
                tracing::warn!(
                    models = models.len(),
                    "Algolia can only search one model at a time"
                );
                return Ok(SearchResponse::empty());
            }
        };
        let Some((hits_per_page, page)) = options.page_window() else {
            tracing::warn!(
                start_offset = options.start_offset,
                end_offset = options.end_offset,
                "Empty search window"
            );
            return Ok(SearchResponse::empty());
        };

        self.ensure_setup().await?;

        let handle = self.indexes.index_for(model);
        let params = QueryParams {
            get_ranking_info: self.config.get_ranking_info,
            filters: self.indexes.model_filter(model),
            ..QueryParams::new(hits_per_page, page)
        };
        tracing::debug!(index = %handle.name(), query, hits_per_page, page, "Searching");

        let mut raw = self.indexes.client().search(&handle, query, &params).await?;
        if self.indexes.is_shared() {
            retain_model(&mut raw, model);
        }
        let response = process_results(raw, self.registry.as_ref(), factory);

        self.mark_ready().await;
        Ok(response)
    }

    /// Always returns an empty response; the service has no similarity query.
    pub fn more_like_this<R: Indexable>(
        &self,
        record: &R,
        _options: &SearchOptions,
    ) -> SearchResponse<SearchResult> {
        tracing::warn!(
            record = %record.identifier(),
            "more_like_this is not supported by the Algolia backend"
        );
        SearchResponse::empty()
    }
}

/// Drops hits of other models from a shared-index response.
fn retain_model(raw: &mut RawSearchResponse, model: &ModelId) {
    let expected = model.to_string();
    let before = raw.hits.len();
    raw.hits.retain(|hit| {
        hit.get(RECORD_TYPE_FIELD)
            .and_then(serde_json::Value::as_str)
            .is_some_and(|record_type| record_type == expected)
    });
    let dropped = (before - raw.hits.len()) as u64;
    if dropped > 0 {
        tracing::warn!(model = %model, dropped, "Dropping hits of other models");
        raw.nb_hits = raw.nb_hits.saturating_sub(dropped);
    }
}

impl std::fmt::Debug for AlgoliaSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgoliaSearchBackend")
            .field("alias", &self.alias)
            .field("config", &self.config)
            .field("indexes", &self.indexes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        let options = SearchOptions::default().with_window(20, 40);
        assert_eq!(options.page_window(), Some((20, 1)));

        let options = SearchOptions::default().with_window(0, 10);
        assert_eq!(options.page_window(), Some((10, 0)));

        let options = SearchOptions::default().with_window(25, 35);
        assert_eq!(options.page_window(), Some((10, 2)));
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(SearchOptions::default().with_window(5, 5).page_window(), None);
        assert_eq!(SearchOptions::default().with_window(9, 3).page_window(), None);
    }

    #[test]
    fn test_search_options_defaults() {
        let options = SearchOptions::for_model(ModelId::new("blog", "post"));
        assert_eq!(options.start_offset, 0);
        assert_eq!(options.end_offset, 20);
        assert_eq!(options.models.len(), 1);
    }

    #[test]
    fn test_retain_model_drops_other_models() {
        let hits = serde_json::json!([
            {"django_ct": "blog.post", "django_id": "1"},
            {"django_ct": "shop.product", "django_id": "2"},
            {"django_id": "3"}
        ]);
        let mut raw = RawSearchResponse {
            hits: serde_json::from_value(hits).unwrap(),
            nb_hits: 10,
            ..Default::default()
        };

        retain_model(&mut raw, &ModelId::new("blog", "post"));
        assert_eq!(raw.hits.len(), 1);
        assert_eq!(raw.nb_hits, 8);
    }

    #[test]
    fn test_new_rejects_missing_configuration() {
        let registry: Arc<dyn IndexRegistry> = Arc::new(crate::registry::StaticRegistry::new());
        let err = AlgoliaSearchBackend::new("default", AlgoliaConfig::default(), registry)
            .unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
        assert!(err.to_string().contains("'APP_ID'"));
    }
}
