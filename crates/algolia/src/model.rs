//! Model identity and the record-side collaborator traits.
//!
//! A model is a logical collection of records sharing a schema and maps to
//! one remote index. It is identified by an `app_label.model_name` pair, the
//! same string stored in every document's record-type field.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::NativeValue;
use crate::error::DocumentError;

/// A prepared record: field name to native value.
///
/// Always carries the identifier (`id`), record type (`django_ct`) and
/// primary key (`django_id`) fields alongside the indexed fields.
pub type PreparedDocument = BTreeMap<String, NativeValue>;

/// Identity of a model: `app_label.model_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    app_label: String,
    model_name: String,
}

impl ModelId {
    /// Creates a model identity. The model name is lowercased.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into().to_lowercase(),
        }
    }

    /// Returns the application label.
    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the canonical identifier of a record of this model.
    pub fn identifier(&self, pk: &str) -> String {
        format!("{}.{}.{}", self.app_label, self.model_name, pk)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

impl FromStr for ModelId {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentError::InvalidRecordType {
            value: s.to_string(),
        };
        let (app_label, model_name) = s.split_once('.').ok_or_else(invalid)?;
        if app_label.is_empty() || model_name.is_empty() || model_name.contains('.') {
            return Err(invalid());
        }
        Ok(ModelId::new(app_label, model_name))
    }
}

impl TryFrom<String> for ModelId {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.to_string()
    }
}

/// A record that can be stored in a search index.
pub trait Indexable: Send + Sync {
    /// The model this record belongs to.
    fn model(&self) -> ModelId;

    /// The record's primary key, as text.
    fn pk(&self) -> String;

    /// The record's canonical identifier, `app_label.model_name.pk`.
    fn identifier(&self) -> String {
        self.model().identifier(&self.pk())
    }
}

/// Per-model index definition that prepares records for indexing.
///
/// This is the host framework's field extraction layer; the backend only
/// consumes its output.
pub trait SearchIndex: Send + Sync {
    /// The record type this index prepares.
    type Record: Indexable;

    /// The model this index covers.
    fn model(&self) -> ModelId;

    /// Extracts every indexed field of `record`, including the identifier,
    /// record type and primary key fields.
    fn full_prepare(&self, record: &Self::Record) -> PreparedDocument;
}
