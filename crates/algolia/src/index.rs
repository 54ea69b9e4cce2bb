//! Model to remote index mapping.
//!
//! [`IndexManager`] derives index names, caches one [`IndexHandle`] per
//! model, and remembers which indexes have had their settings pushed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::client::{AlgoliaApi, IndexHandle, IndexSettings};
use crate::config::IndexNaming;
use crate::document::RECORD_TYPE_FIELD;
use crate::error::RemoteServiceError;
use crate::model::ModelId;

/// Resolves and configures the remote index of each model.
pub struct IndexManager {
    client: Arc<dyn AlgoliaApi>,
    naming: IndexNaming,
    handles: RwLock<HashMap<ModelId, IndexHandle>>,
    configured: Mutex<HashSet<String>>,
}

impl IndexManager {
    /// Creates a manager issuing requests through `client`.
    pub fn new(client: Arc<dyn AlgoliaApi>, naming: IndexNaming) -> Self {
        Self {
            client,
            naming,
            handles: RwLock::new(HashMap::new()),
            configured: Mutex::new(HashSet::new()),
        }
    }

    /// The client used for every remote call.
    pub fn client(&self) -> &Arc<dyn AlgoliaApi> {
        &self.client
    }

    /// Returns the remote index name for `model`.
    pub fn index_name(&self, model: &ModelId) -> String {
        match &self.naming {
            IndexNaming::Single(name) => name.clone(),
            IndexNaming::Prefixed(prefix) => format!("{}{}", prefix, model),
        }
    }

    /// Returns true if every model shares one index.
    pub fn is_shared(&self) -> bool {
        matches!(self.naming, IndexNaming::Single(_))
    }

    /// Returns the filter restricting a shared index to `model`'s records.
    ///
    /// `None` when each model has its own index.
    pub fn model_filter(&self, model: &ModelId) -> Option<String> {
        self.is_shared()
            .then(|| format!("{}:\"{}\"", RECORD_TYPE_FIELD, model))
    }

    /// Returns the cached handle for `model`, creating it on first use.
    pub fn index_for(&self, model: &ModelId) -> IndexHandle {
        if let Some(handle) = self.handles.read().get(model) {
            return handle.clone();
        }

        let mut handles = self.handles.write();
        handles
            .entry(model.clone())
            .or_insert_with(|| {
                let name = self.index_name(model);
                tracing::debug!(model = %model, index = %name, "Opening index handle");
                self.client.init_index(&name)
            })
            .clone()
    }

    /// Returns true if settings were already pushed to `index`.
    pub fn is_configured(&self, index: &IndexHandle) -> bool {
        self.configured.lock().contains(index.name())
    }

    /// Pushes settings to `model`'s index unless that index is already configured.
    ///
    /// Returns `Ok(true)` if settings were sent. The configured check is not
    /// held across the push; callers serialize through the backend's setup lock.
    pub(crate) async fn configure(
        &self,
        model: &ModelId,
        fields: Vec<String>,
        optional_words: Option<Vec<String>>,
    ) -> Result<bool, RemoteServiceError> {
        let index = self.index_for(model);
        if self.is_configured(&index) {
            return Ok(false);
        }

        // A shared index must be filterable by record type.
        let attributes_for_faceting = if self.is_shared() {
            vec![format!("filterOnly({})", RECORD_TYPE_FIELD)]
        } else {
            Vec::new()
        };
        let settings = IndexSettings {
            attributes_to_index: fields,
            attributes_for_faceting,
            optional_words,
        };
        self.client.set_settings(&index, &settings).await?;
        self.configured.lock().insert(index.name().to_string());

        tracing::info!(
            index = %index.name(),
            attributes = settings.attributes_to_index.len(),
            "Configured index"
        );
        Ok(true)
    }

    /// Forgets the handle and configuration of `model`'s index.
    pub fn invalidate(&self, model: &ModelId) {
        let name = self.index_name(model);
        self.handles.write().remove(model);
        self.configured.lock().remove(&name);
    }

    /// Forgets every handle and configuration.
    pub fn invalidate_all(&self) {
        self.handles.write().clear();
        self.configured.lock().clear();
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("naming", &self.naming)
            .field("handles", &self.handles.read().len())
            .field("configured", &self.configured.lock().len())
            .finish()
    }
}
