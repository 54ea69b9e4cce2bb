//! Value codec between native record values and Algolia's JSON model.
//!
//! [`to_wire`] is total over [`NativeValue`]. [`to_native`] is a best-effort
//! reverse mapping: JSON numbers, booleans, arrays and objects map back
//! structurally, strings shaped like `YYYY-MM-DDTHH:MM:SS[.f]` become
//! date/times, and strings holding a JSON number, array or object literal
//! are decoded. Anything else is returned as text.
//!
//! The round trip is lossy at these points:
//! - sub-second precision is dropped when reading date/times back
//! - dates come back as date/times at midnight
//! - byte strings come back as text
//! - unordered collections come back as sequences

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

static DATETIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})T(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})(\.\d+)?$",
    )
    .expect("datetime pattern is valid")
});

/// A field value as produced by the application's field extraction layer.
///
/// The variant is decided once, when a record is prepared, so the codec never
/// has to inspect values at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Calendar date without a time of day.
    Date(NaiveDate),
    /// Date with a time of day, no timezone.
    DateTime(NaiveDateTime),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Sequence(Vec<NativeValue>),
    /// Unordered collection of unique items. Use [`NativeValue::set`] to build one.
    Set(Vec<NativeValue>),
    /// String-keyed mapping.
    Mapping(BTreeMap<String, NativeValue>),
}

impl NativeValue {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        NativeValue::Text(s.into())
    }

    /// Creates a byte string value.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        NativeValue::Bytes(bytes.into())
    }

    /// Creates an unordered collection, dropping duplicate items.
    pub fn set(items: impl IntoIterator<Item = NativeValue>) -> Self {
        let mut unique: Vec<NativeValue> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        NativeValue::Set(unique)
    }

    /// Returns the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a JSON value structurally, without interpreting strings.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => NativeValue::Null,
            Value::Bool(b) => NativeValue::Bool(*b),
            Value::Number(n) => number_to_native(n),
            Value::String(s) => NativeValue::Text(s.clone()),
            Value::Array(items) => {
                NativeValue::Sequence(items.iter().map(NativeValue::from_json).collect())
            }
            Value::Object(map) => NativeValue::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), NativeValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::Text(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::Text(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Int(value)
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        NativeValue::Int(i64::from(value))
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Float(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Bool(value)
    }
}

impl From<NaiveDate> for NativeValue {
    fn from(value: NaiveDate) -> Self {
        NativeValue::Date(value)
    }
}

impl From<NaiveDateTime> for NativeValue {
    fn from(value: NaiveDateTime) -> Self {
        NativeValue::DateTime(value)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(NativeValue::Null, Into::into)
    }
}

/// Serializes as the wire form.
impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_wire(self).serialize(serializer)
    }
}

fn number_to_native(n: &Number) -> NativeValue {
    if let Some(i) = n.as_i64() {
        NativeValue::Int(i)
    } else {
        // u64 beyond i64::MAX and all non-integers
        NativeValue::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Formats a date/time the way the remote index stores it.
///
/// Microseconds are appended only when the value has a fractional part.
pub fn format_datetime(value: &NaiveDateTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Converts a native value into its JSON wire form.
pub fn to_wire(value: &NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Int(i) => Value::Number((*i).into()),
        // JSON has no NaN or infinity
        NativeValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        NativeValue::Text(s) => Value::String(s.clone()),
        NativeValue::Date(d) => Value::String(format!("{}T00:00:00", d.format("%Y-%m-%d"))),
        NativeValue::DateTime(dt) => Value::String(format_datetime(dt)),
        NativeValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        NativeValue::Sequence(items) | NativeValue::Set(items) => {
            Value::Array(items.iter().map(to_wire).collect())
        }
        NativeValue::Mapping(map) => {
            let object: Map<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), to_wire(v))).collect();
            Value::Object(object)
        }
    }
}

/// Converts a JSON value returned by the remote service back to a native value.
///
/// Never fails: text that cannot be interpreted comes back unchanged.
pub fn to_native(value: &Value) -> NativeValue {
    match value {
        Value::String(s) => text_to_native(s),
        other => NativeValue::from_json(other),
    }
}

fn text_to_native(text: &str) -> NativeValue {
    if let Some(captures) = DATETIME_REGEX.captures(text) {
        return parse_datetime(&captures).map_or_else(|| NativeValue::text(text), Into::into);
    }

    // Only JSON literals are considered, never general expressions.
    match serde_json::from_str::<Value>(text) {
        Ok(parsed @ (Value::Number(_) | Value::Array(_) | Value::Object(_))) => {
            NativeValue::from_json(&parsed)
        }
        _ => NativeValue::text(text),
    }
}

fn parse_datetime(captures: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let field = |name: &str| captures.name(name)?.as_str().parse::<u32>().ok();

    let year = captures.name("year")?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, field("month")?, field("day")?)?.and_hms_opt(
        field("hour")?,
        field("minute")?,
        field("second")?,
    )
}
