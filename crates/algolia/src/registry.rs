//! Model registry collaborator.
//!
//! The registry is the host application's view of which models are indexed,
//! how their fields are weighted, and how stored values convert back to
//! native values. The backend receives it as a trait object so it can be
//! replaced by a [`StaticRegistry`] in tests and tools.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{NativeValue, to_native};
use crate::model::ModelId;

/// Converts a stored field value back into a native value.
pub trait FieldConverter: Debug + Send + Sync {
    /// Converts one value returned by the remote index.
    fn convert(&self, value: &Value) -> NativeValue;
}

/// Registry of indexed models and their field metadata.
pub trait IndexRegistry: Send + Sync {
    /// Every model that has a search index.
    fn indexed_models(&self) -> Vec<ModelId>;

    /// Field name and weight pairs for `model`, in no particular order.
    fn field_weights(&self, model: &ModelId) -> Vec<(String, f64)>;

    /// The converter registered for `field` of `model`, if any.
    fn field_converter(&self, model: &ModelId, field: &str) -> Option<Arc<dyn FieldConverter>>;

    /// Name of the main full-text document field.
    fn document_field(&self) -> &str;

    /// Returns true if `model` is one of the indexed models.
    fn is_indexed(&self, model: &ModelId) -> bool {
        self.indexed_models().contains(model)
    }
}

/// Returns the fields of `model` to index, highest weight first.
///
/// Ties keep the registry's order. A model without weighted fields falls
/// back to the document field.
pub fn fields_to_index(registry: &dyn IndexRegistry, model: &ModelId) -> Vec<String> {
    let mut weights = registry.field_weights(model);
    if weights.is_empty() {
        return vec![registry.document_field().to_string()];
    }
    weights.sort_by(|a, b| b.1.total_cmp(&a.1));
    weights.into_iter().map(|(field, _)| field).collect()
}

/// Text field: strings as-is, anything else rendered as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConverter;

impl FieldConverter for TextConverter {
    fn convert(&self, value: &Value) -> NativeValue {
        match value {
            Value::Null => NativeValue::Null,
            Value::String(s) => NativeValue::text(s.as_str()),
            other => NativeValue::Text(other.to_string()),
        }
    }
}

/// Integer field.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl FieldConverter for IntegerConverter {
    fn convert(&self, value: &Value) -> NativeValue {
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(exact_i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        };
        parsed.map_or(NativeValue::Null, NativeValue::Int)
    }
}

/// Converts `f` only when it is a whole number within `i64` range.
fn exact_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && f >= -LIMIT && f < LIMIT).then_some(f as i64)
}

/// Floating point field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl FieldConverter for FloatConverter {
    fn convert(&self, value: &Value) -> NativeValue {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.map_or(NativeValue::Null, NativeValue::Float)
    }
}

/// Boolean field. Accepts JSON booleans and `"true"`/`"false"` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl FieldConverter for BooleanConverter {
    fn convert(&self, value: &Value) -> NativeValue {
        match value {
            Value::Bool(b) => NativeValue::Bool(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => NativeValue::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => NativeValue::Bool(false),
            Value::Number(n) => NativeValue::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            _ => NativeValue::Null,
        }
    }
}

/// Date/time field. Text that is not a date/time is kept as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConverter;

impl FieldConverter for DateTimeConverter {
    fn convert(&self, value: &Value) -> NativeValue {
        match value {
            Value::String(_) => match to_native(value) {
                dt @ NativeValue::DateTime(_) => dt,
                _ => NativeValue::from_json(value),
            },
            Value::Null => NativeValue::Null,
            other => NativeValue::from_json(other),
        }
    }
}

/// Field types a [`StaticRegistry`] can declare in its JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// [`TextConverter`]
    Text,
    /// [`IntegerConverter`]
    Integer,
    /// [`FloatConverter`]
    Float,
    /// [`BooleanConverter`]
    Boolean,
    /// [`DateTimeConverter`]
    DateTime,
}

impl FieldKind {
    /// Returns the converter for this field type.
    pub fn converter(self) -> Arc<dyn FieldConverter> {
        match self {
            FieldKind::Text => Arc::new(TextConverter),
            FieldKind::Integer => Arc::new(IntegerConverter),
            FieldKind::Float => Arc::new(FloatConverter),
            FieldKind::Boolean => Arc::new(BooleanConverter),
            FieldKind::DateTime => Arc::new(DateTimeConverter),
        }
    }
}

/// One model entry of a [`StaticRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// The model, as `app_label.model_name`.
    pub model: ModelId,

    /// Field weights used to order the indexed attributes.
    #[serde(default)]
    pub field_weights: BTreeMap<String, f64>,

    /// Typed fields whose stored values get a dedicated converter.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldKind>,
}

fn default_document_field() -> String {
    "text".to_string()
}

/// An in-memory registry, loadable from JSON.
///
/// ```
/// use haystack_algolia::registry::{IndexRegistry, StaticRegistry};
///
/// let registry = StaticRegistry::from_json(r#"{
///     "models": [
///         {"model": "blog.post", "field_weights": {"title": 2.0, "text": 1.0}}
///     ]
/// }"#).unwrap();
/// assert_eq!(registry.indexed_models().len(), 1);
/// assert_eq!(registry.document_field(), "text");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRegistry {
    /// Main full-text document field (default: `"text"`).
    #[serde(default = "default_document_field")]
    pub document_field: String,

    /// Registered models.
    #[serde(default)]
    pub models: Vec<ModelDefinition>,

    #[serde(skip)]
    converters: HashMap<(ModelId, String), Arc<dyn FieldConverter>>,
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self {
            document_field: default_document_field(),
            models: Vec::new(),
            converters: HashMap::new(),
        }
    }
}

impl StaticRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a registry from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Registers a model with its field weights.
    pub fn with_model<'a>(
        mut self,
        model: ModelId,
        weights: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        self.models.push(ModelDefinition {
            model,
            field_weights: weights
                .into_iter()
                .map(|(field, weight)| (field.to_string(), weight))
                .collect(),
            fields: BTreeMap::new(),
        });
        self
    }

    /// Registers a custom converter for one field of a model.
    pub fn with_converter(
        mut self,
        model: ModelId,
        field: impl Into<String>,
        converter: Arc<dyn FieldConverter>,
    ) -> Self {
        self.converters.insert((model, field.into()), converter);
        self
    }

    fn definition(&self, model: &ModelId) -> Option<&ModelDefinition> {
        self.models.iter().find(|def| &def.model == model)
    }
}

impl IndexRegistry for StaticRegistry {
    fn indexed_models(&self) -> Vec<ModelId> {
        self.models.iter().map(|def| def.model.clone()).collect()
    }

    fn field_weights(&self, model: &ModelId) -> Vec<(String, f64)> {
        self.definition(model)
            .map(|def| {
                def.field_weights
                    .iter()
                    .map(|(field, weight)| (field.clone(), *weight))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn field_converter(&self, model: &ModelId, field: &str) -> Option<Arc<dyn FieldConverter>> {
        if let Some(converter) = self.converters.get(&(model.clone(), field.to_string())) {
            return Some(converter.clone());
        }
        self.definition(model)?
            .fields
            .get(field)
            .map(|kind| kind.converter())
    }

    fn document_field(&self) -> &str {
        &self.document_field
    }
}
