//! Wire document building.
//!
//! Turns a [`PreparedDocument`] into the JSON object sent to Algolia: every
//! value goes through [`to_wire`], the canonical identifier becomes the
//! `objectID`, and the raw `id` field is dropped.

use serde_json::{Map, Value};

use crate::codec::to_wire;
use crate::error::DocumentError;
use crate::model::PreparedDocument;

/// Field holding the canonical identifier in prepared documents.
pub const ID_FIELD: &str = "id";

/// Field holding the `app_label.model_name` record type.
pub const RECORD_TYPE_FIELD: &str = "django_ct";

/// Field holding the record's primary key.
pub const RECORD_ID_FIELD: &str = "django_id";

/// Algolia's object identity field.
pub const OBJECT_ID_FIELD: &str = "objectID";

/// A JSON document ready to be submitted to a remote index.
pub type WireDocument = Map<String, Value>;

/// Builds the wire document for one prepared record.
pub fn build_document(prepared: &PreparedDocument) -> Result<WireDocument, DocumentError> {
    let mut document: WireDocument = prepared
        .iter()
        .map(|(key, value)| (key.clone(), to_wire(value)))
        .collect();

    let object_id = document
        .remove(ID_FIELD)
        .ok_or_else(|| DocumentError::MissingIdentifier {
            field: ID_FIELD.to_string(),
        })?;
    document.insert(OBJECT_ID_FIELD.to_string(), object_id);

    Ok(document)
}
