//! In-memory Algolia client.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use haystack_algolia::RemoteServiceError;
use haystack_algolia::client::{
    AlgoliaApi, IndexHandle, IndexSettings, QueryParams, RawSearchResponse,
};
use haystack_algolia::document::{OBJECT_ID_FIELD, WireDocument};

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetSettings {
        index: String,
        settings: IndexSettings,
    },
    AddObjects {
        index: String,
        object_ids: Vec<String>,
    },
    DeleteObject {
        index: String,
        object_id: String,
    },
    DeleteBy {
        index: String,
        filters: String,
    },
    ClearIndex {
        index: String,
    },
    Search {
        index: String,
        query: String,
        params: QueryParams,
    },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    opened: Vec<String>,
    indexes: HashMap<String, BTreeMap<String, WireDocument>>,
    search_response: Option<RawSearchResponse>,
    fail_settings: bool,
    fail_add_after: Option<usize>,
    add_count: usize,
    settings_delay: Option<Duration>,
}

/// Records every call and keeps documents per index in memory.
#[derive(Debug, Clone, Default)]
pub struct MockAlgoliaClient {
    state: Arc<Mutex<MockState>>,
}

impl MockAlgoliaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every remote call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Names passed to `init_index`, in order.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Settings pushes so far.
    pub fn settings_calls(&self) -> Vec<(String, IndexSettings)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetSettings { index, settings } => Some((index, settings)),
                _ => None,
            })
            .collect()
    }

    /// Object ids of each submitted batch.
    pub fn batches(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AddObjects { index, object_ids } => Some((index, object_ids)),
                _ => None,
            })
            .collect()
    }

    /// Indexes cleared so far.
    pub fn cleared(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ClearIndex { index } => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Filter expressions of delete-by-query calls so far.
    pub fn deleted_by(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteBy { index, filters } => Some((index, filters)),
                _ => None,
            })
            .collect()
    }

    /// Stored document of `index` with `object_id`.
    pub fn document(&self, index: &str, object_id: &str) -> Option<WireDocument> {
        let state = self.state.lock().unwrap();
        state.indexes.get(index)?.get(object_id).cloned()
    }

    /// Number of documents stored in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.indexes.get(index).map_or(0, BTreeMap::len)
    }

    /// Answers every search with `response` instead of the stored documents.
    pub fn set_search_response(&self, response: RawSearchResponse) {
        self.state.lock().unwrap().search_response = Some(response);
    }

    /// Makes every settings push fail.
    pub fn set_fail_settings(&self, fail: bool) {
        self.state.lock().unwrap().fail_settings = fail;
    }

    /// Makes every batch after the first `count` fail.
    pub fn set_fail_add_after(&self, count: usize) {
        self.state.lock().unwrap().fail_add_after = Some(count);
    }

    /// Delays each settings push, to widen concurrency windows.
    pub fn set_settings_delay(&self, delay: Duration) {
        self.state.lock().unwrap().settings_delay = Some(delay);
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AlgoliaApi for MockAlgoliaClient {
    fn init_index(&self, name: &str) -> IndexHandle {
        self.state.lock().unwrap().opened.push(name.to_string());
        IndexHandle::new(name)
    }

    async fn set_settings(
        &self,
        index: &IndexHandle,
        settings: &IndexSettings,
    ) -> Result<(), RemoteServiceError> {
        let delay = self.state.lock().unwrap().settings_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.record(Call::SetSettings {
            index: index.name().to_string(),
            settings: settings.clone(),
        });
        if self.state.lock().unwrap().fail_settings {
            return Err(RemoteServiceError::InvalidRequest {
                message: "invalid settings".to_string(),
            });
        }
        Ok(())
    }

    async fn add_objects(
        &self,
        index: &IndexHandle,
        objects: &[WireDocument],
    ) -> Result<(), RemoteServiceError> {
        let object_ids: Vec<String> = objects
            .iter()
            .map(|doc| {
                doc.get(OBJECT_ID_FIELD)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        self.record(Call::AddObjects {
            index: index.name().to_string(),
            object_ids: object_ids.clone(),
        });

        let mut state = self.state.lock().unwrap();
        state.add_count += 1;
        if let Some(limit) = state.fail_add_after {
            if state.add_count > limit {
                return Err(RemoteServiceError::Unavailable {
                    status: 503,
                    message: "service unavailable".to_string(),
                });
            }
        }

        let stored = state.indexes.entry(index.name().to_string()).or_default();
        for (id, doc) in object_ids.into_iter().zip(objects) {
            stored.insert(id, doc.clone());
        }
        Ok(())
    }

    async fn delete_object(
        &self,
        index: &IndexHandle,
        object_id: &str,
    ) -> Result<(), RemoteServiceError> {
        self.record(Call::DeleteObject {
            index: index.name().to_string(),
            object_id: object_id.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        let removed = state
            .indexes
            .get_mut(index.name())
            .and_then(|docs| docs.remove(object_id));
        match removed {
            Some(_) => Ok(()),
            None => Err(RemoteServiceError::NotFound {
                message: format!("ObjectID {} does not exist", object_id),
            }),
        }
    }

    async fn delete_by(&self, index: &IndexHandle, filters: &str) -> Result<(), RemoteServiceError> {
        self.record(Call::DeleteBy {
            index: index.name().to_string(),
            filters: filters.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        if let Some(docs) = state.indexes.get_mut(index.name()) {
            docs.retain(|_, doc| !matches_filter(doc, filters));
        }
        Ok(())
    }

    async fn clear_index(&self, index: &IndexHandle) -> Result<(), RemoteServiceError> {
        self.record(Call::ClearIndex {
            index: index.name().to_string(),
        });
        self.state.lock().unwrap().indexes.remove(index.name());
        Ok(())
    }

    async fn search(
        &self,
        index: &IndexHandle,
        query: &str,
        params: &QueryParams,
    ) -> Result<RawSearchResponse, RemoteServiceError> {
        self.record(Call::Search {
            index: index.name().to_string(),
            query: query.to_string(),
            params: params.clone(),
        });

        let state = self.state.lock().unwrap();
        if let Some(response) = &state.search_response {
            return Ok(response.clone());
        }

        let hits: Vec<WireDocument> = state
            .indexes
            .get(index.name())
            .map(|docs| {
                docs.values()
                    .filter(|doc| {
                        params
                            .filters
                            .as_deref()
                            .is_none_or(|filters| matches_filter(doc, filters))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let nb_hits = hits.len() as u64;
        let page_hits = hits
            .into_iter()
            .skip(params.page * params.hits_per_page)
            .take(params.hits_per_page)
            .collect();
        Ok(RawSearchResponse {
            hits: page_hits,
            nb_hits,
            page: params.page,
            nb_pages: (nb_hits as usize).div_ceil(params.hits_per_page.max(1)),
        })
    }
}

/// Evaluates a single `field:"value"` filter expression against `doc`.
fn matches_filter(doc: &WireDocument, filters: &str) -> bool {
    let Some((field, value)) = filters.split_once(':') else {
        return false;
    };
    doc.get(field).and_then(Value::as_str) == Some(value.trim_matches('"'))
}
