//! Mapping of raw search hits to result objects.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::client::RawSearchResponse;
use crate::codec::{NativeValue, to_native};
use crate::document::{RECORD_ID_FIELD, RECORD_TYPE_FIELD};
use crate::model::ModelId;
use crate::registry::IndexRegistry;

/// Relevance score given to every result.
///
/// The service ranks hits itself and does not expose a comparable score;
/// its per-hit ranking signal is available through [`SearchResult::ranking_info`].
pub const PLACEHOLDER_SCORE: f64 = 1.0;

/// Field carrying the service's per-hit ranking details.
pub const RANKING_INFO_FIELD: &str = "_rankingInfo";

/// One search hit mapped back to its record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Application label of the hit's model.
    pub app_label: String,
    /// Model name of the hit.
    pub model_name: String,
    /// Primary key of the matching record.
    pub pk: String,
    /// Relevance score, always [`PLACEHOLDER_SCORE`].
    pub score: f64,
    /// Stored fields converted back to native values.
    pub fields: BTreeMap<String, NativeValue>,
    /// Ranking details, when requested from the service.
    pub ranking_info: Option<Value>,
}

impl SearchResult {
    /// Returns the model of this hit.
    pub fn model(&self) -> ModelId {
        ModelId::new(&self.app_label, &self.model_name)
    }

    /// Returns a converted field by name.
    pub fn get(&self, field: &str) -> Option<&NativeValue> {
        self.fields.get(field)
    }
}

/// Builds the caller's result objects from mapped hits.
pub trait ResultFactory: Send + Sync {
    /// The result object type.
    type Output: Send;

    /// Builds one result object.
    fn build(&self, result: SearchResult) -> Self::Output;
}

/// Returns [`SearchResult`]s unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResultFactory;

impl ResultFactory for DefaultResultFactory {
    type Output = SearchResult;

    fn build(&self, result: SearchResult) -> SearchResult {
        result
    }
}

/// Results of one search, with the total hit count.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse<T> {
    /// Result objects for the requested page.
    pub results: Vec<T>,
    /// Total matches, excluding hits that could not be mapped.
    pub hits: u64,
}

impl<T> SearchResponse<T> {
    /// A response with no results.
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            hits: 0,
        }
    }
}

impl<T> Default for SearchResponse<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Maps a raw response to result objects.
///
/// Hits whose record type is missing, malformed or not a registered model,
/// and hits without a primary key, are dropped and subtracted from `hits`.
pub fn process_results<F: ResultFactory>(
    raw: RawSearchResponse,
    registry: &dyn IndexRegistry,
    factory: &F,
) -> SearchResponse<F::Output> {
    let known: HashSet<ModelId> = registry.indexed_models().into_iter().collect();
    let mut hits = raw.nb_hits;
    let mut results = Vec::with_capacity(raw.hits.len());

    for mut hit in raw.hits {
        let model = match hit.get(RECORD_TYPE_FIELD).and_then(Value::as_str) {
            Some(record_type) => match record_type.parse::<ModelId>() {
                Ok(model) if known.contains(&model) => model,
                _ => {
                    tracing::warn!(record_type, "Dropping hit for unknown model");
                    hits = hits.saturating_sub(1);
                    continue;
                }
            },
            None => {
                tracing::warn!("Dropping hit without a record type");
                hits = hits.saturating_sub(1);
                continue;
            }
        };

        let pk = match hit.get(RECORD_ID_FIELD) {
            Some(Value::String(pk)) => pk.clone(),
            Some(Value::Number(pk)) => pk.to_string(),
            _ => {
                tracing::warn!(model = %model, "Dropping hit without a primary key");
                hits = hits.saturating_sub(1);
                continue;
            }
        };

        hit.remove(RECORD_TYPE_FIELD);
        hit.remove(RECORD_ID_FIELD);
        let ranking_info = hit.remove(RANKING_INFO_FIELD);

        let fields = hit
            .iter()
            .map(|(name, value)| {
                let native = match registry.field_converter(&model, name) {
                    Some(converter) => converter.convert(value),
                    None => to_native(value),
                };
                (name.clone(), native)
            })
            .collect();

        results.push(factory.build(SearchResult {
            app_label: model.app_label().to_string(),
            model_name: model.model_name().to_string(),
            pk,
            score: PLACEHOLDER_SCORE,
            fields,
            ranking_info,
        }));
    }

    SearchResponse { results, hits }
}
