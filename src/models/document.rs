// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Typed representation of a single indexed record and its wire mapping.

use crate::error::{Result, SolrError};
use crate::models::response::RawResponse;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Date format Solr expects on the wire (always UTC)
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Date format used for date attributes on the model side
pub const NATIVE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix of a date value Solr is known to return corrupted
const BROKEN_WIRE_DATE_PREFIX: &str = "2-11-30";

/// Prefix of the "zero date" some databases use for unset timestamps
const ZERO_DATE_PREFIX: &str = "0000";

/// Per-attribute highlight fragments
pub type Highlights = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Date,
}

impl AttributeType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "date" => Some(AttributeType::Date),
            _ => None,
        }
    }
}

/// Attribute name → type coercion applied at the wire boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMapping {
    types: HashMap<String, AttributeType>,
}

impl AttributeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.types.insert(attribute.into(), attribute_type);
        self
    }

    pub fn type_of(&self, attribute: &str) -> Option<AttributeType> {
        self.types.get(attribute).copied()
    }
}

/// A document as sent to the update handler. Field names may repeat for
/// multi-valued fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDocument {
    fields: Vec<(String, Value)>,
}

impl InputDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn field_values(&self, name: &str) -> Vec<&Value> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .collect()
    }

    /// JSON update format: repeated fields collapse into an array.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in &self.fields {
            match object.get_mut(name) {
                Some(Value::Array(values)) => values.push(value.clone()),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value.clone()]);
                }
                None => {
                    object.insert(name.clone(), value.clone());
                }
            }
        }
        Value::Object(object)
    }

    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut document = Self::new();
        for (name, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(values) => {
                    for v in values {
                        document.add_field(name.clone(), v.clone());
                    }
                }
                other => document.add_field(name.clone(), other.clone()),
            }
        }
        document
    }
}

/// A Solr document with its search metadata.
#[derive(Debug, Clone)]
pub struct Document {
    fields: Map<String, Value>,
    primary_key: String,
    old_primary_key: Option<Value>,
    is_new: bool,
    position: Option<usize>,
    score: Option<f64>,
    highlights: Option<Highlights>,
    /// Milliseconds within which Solr should commit this document
    commit_within: Option<u64>,
    mapping: AttributeMapping,
    response: Option<Arc<RawResponse>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            fields: Map::new(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            old_primary_key: None,
            is_new: true,
            position: None,
            score: None,
            highlights: None,
            commit_within: None,
            mapping: AttributeMapping::default(),
            response: None,
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn with_mapping(mut self, mapping: AttributeMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Like [`get`](Self::get) but reports a missing field as a property error.
    pub fn try_get(&self, name: &str) -> Result<&Value> {
        self.fields
            .get(name)
            .ok_or_else(|| SolrError::not_defined("Document", name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    pub fn primary_key_field(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.fields.get(&self.primary_key)
    }

    /// Change the primary key, remembering the previous value.
    pub fn set_primary_key(&mut self, value: impl Into<Value>) {
        self.old_primary_key = self.primary_key().cloned();
        let field = self.primary_key.clone();
        self.set(field, value);
    }

    pub fn old_primary_key(&self) -> Option<&Value> {
        self.old_primary_key.as_ref()
    }

    pub fn set_old_primary_key(&mut self, value: Option<Value>) {
        self.old_primary_key = value;
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_is_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    // -----------------------------------------------------------------------
    // Search metadata
    // -----------------------------------------------------------------------

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = Some(position);
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    pub fn highlights(&self) -> Option<&Highlights> {
        self.highlights.as_ref()
    }

    pub fn highlight(&self, attribute: &str) -> Option<&[String]> {
        self.highlights
            .as_ref()?
            .get(attribute)
            .map(Vec::as_slice)
    }

    pub fn set_highlights(&mut self, highlights: Highlights) {
        self.highlights = Some(highlights);
    }

    pub fn commit_within(&self) -> Option<u64> {
        self.commit_within
    }

    pub fn set_commit_within(&mut self, millis: u64) {
        self.commit_within = Some(millis);
    }

    /// The response this document was decoded from, if any.
    pub fn solr_response(&self) -> Option<&Arc<RawResponse>> {
        self.response.as_ref()
    }

    pub fn set_solr_response(&mut self, response: Arc<RawResponse>) {
        self.response = Some(response);
    }

    // -----------------------------------------------------------------------
    // Wire mapping
    // -----------------------------------------------------------------------

    /// Convert to the update-handler representation. Null fields are
    /// skipped, arrays become repeated fields and mapped dates are formatted
    /// as UTC wire dates.
    pub fn to_wire_document(&self) -> Result<InputDocument> {
        let mut document = InputDocument::new();
        for (name, value) in &self.fields {
            match value {
                Value::Null => {}
                Value::Array(values) => {
                    for v in values {
                        document.add_field(name.clone(), self.prepare_attribute(name, v)?);
                    }
                }
                _ => document.add_field(name.clone(), self.prepare_attribute(name, value)?),
            }
        }
        Ok(document)
    }

    fn prepare_attribute(&self, name: &str, value: &Value) -> Result<Value> {
        match self.mapping.type_of(name) {
            Some(AttributeType::Date) => Ok(Value::String(to_wire_date(name, value)?)),
            None => Ok(value.clone()),
        }
    }

    /// Build an existing (not new) document from a decoded result row.
    pub fn from_wire_row(
        row: &Map<String, Value>,
        primary_key: &str,
        mapping: &AttributeMapping,
    ) -> Self {
        let mut document = Document::new()
            .with_primary_key(primary_key)
            .with_mapping(mapping.clone());
        document.is_new = false;

        for (name, value) in row {
            if name == "score" {
                if let Some(score) = value.as_f64() {
                    document.score = Some(score);
                }
                continue;
            }
            let value = match mapping.type_of(name) {
                Some(AttributeType::Date) => native_date_value(name, value),
                None => value.clone(),
            };
            document.fields.insert(name.clone(), value);
        }

        document.old_primary_key = document.primary_key().cloned();
        document
    }
}

fn native_date_value(name: &str, value: &Value) -> Value {
    match value {
        Value::String(raw) => from_wire_date(raw)
            .map(Value::String)
            .unwrap_or_else(|| {
                if !raw.starts_with(BROKEN_WIRE_DATE_PREFIX) {
                    warn!(attribute = name, value = %raw, "Unparseable Solr date, treating as unset");
                }
                Value::Null
            }),
        Value::Array(values) => {
            Value::Array(values.iter().map(|v| native_date_value(name, v)).collect())
        }
        other => other.clone(),
    }
}

/// Format a model date value as a wire date.
///
/// Accepts the native format (optionally suffixed ` UTC`), RFC 3339, a bare
/// date, or integer seconds since the epoch. Zero dates map to the epoch.
pub fn to_wire_date(attribute: &str, value: &Value) -> Result<String> {
    let time = match value {
        Value::String(raw) if raw.starts_with(ZERO_DATE_PREFIX) => DateTime::from_timestamp(0, 0),
        Value::String(raw) => parse_native_time(raw),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    time.map(|t| t.format(WIRE_DATE_FORMAT).to_string())
        .ok_or_else(|| SolrError::mapping(attribute, format!("not a date: {}", value)))
}

/// Parse a wire date back into the native format. Returns `None` for the
/// known corrupted `2-11-30…` values and for anything unparseable.
pub fn from_wire_date(raw: &str) -> Option<String> {
    if raw.starts_with(BROKEN_WIRE_DATE_PREFIX) {
        return None;
    }
    let time = DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, WIRE_DATE_FORMAT)
                .ok()
                .map(|t| t.and_utc())
        })?;
    Some(time.format(NATIVE_DATE_FORMAT).to_string())
}

/// Parse a model-side date string into an absolute UTC time.
pub fn parse_native_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let raw = raw.strip_suffix(" UTC").unwrap_or(raw);

    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    for format in [NATIVE_DATE_FORMAT, WIRE_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(time.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Render a primary-key value as the string Solr uses for ids.
pub fn key_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dated() -> AttributeMapping {
        AttributeMapping::new().with("created", AttributeType::Date)
    }

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new();
        assert!(doc.is_new());
        assert_eq!(doc.primary_key_field(), "id");
        assert!(doc.primary_key().is_none());
        assert!(doc.position().is_none());
    }

    #[test]
    fn test_try_get_missing_field_is_property_error() {
        let doc = Document::new().with_field("name", "x");
        assert_eq!(doc.try_get("name").unwrap(), &json!("x"));
        let err = doc.try_get("colour").unwrap_err();
        assert_eq!(err.to_string(), "property \"Document.colour\" is not defined");
    }

    #[test]
    fn test_set_primary_key_retains_old_value() {
        let mut doc = Document::new().with_field("id", "1");
        doc.set_primary_key("2");
        assert_eq!(doc.primary_key(), Some(&json!("2")));
        assert_eq!(doc.old_primary_key(), Some(&json!("1")));
    }

    #[test]
    fn test_to_wire_document_skips_nulls_and_repeats_arrays() {
        let doc = Document::new()
            .with_field("id", 1)
            .with_field("tags", json!(["a", "b"]))
            .with_field("missing", Value::Null);
        let input = doc.to_wire_document().unwrap();
        assert_eq!(input.field_values("tags"), vec![&json!("a"), &json!("b")]);
        assert!(input.field_values("missing").is_empty());
        assert_eq!(input.to_json(), json!({"id": 1, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_to_wire_document_formats_dates() {
        let doc = Document::new()
            .with_mapping(dated())
            .with_field("created", "2024-03-01 12:00:00 UTC");
        let input = doc.to_wire_document().unwrap();
        assert_eq!(
            input.field_values("created"),
            vec![&json!("2024-03-01T12:00:00Z")]
        );
    }

    #[test]
    fn test_zero_date_maps_to_epoch() {
        assert_eq!(
            to_wire_date("created", &json!("0000-00-00 00:00:00")).unwrap(),
            "1970-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_unparseable_date_is_mapping_error() {
        let err = to_wire_date("created", &json!("yesterday")).unwrap_err();
        assert!(matches!(err, SolrError::Mapping { .. }));
    }

    #[test]
    fn test_date_round_trip_preserves_instant() {
        let original = "2024-03-01 12:00:00 UTC";
        let wire = to_wire_date("created", &json!(original)).unwrap();

        let mut row = Map::new();
        row.insert("id".into(), json!("1"));
        row.insert("created".into(), json!(wire));
        let doc = Document::from_wire_row(&row, "id", &dated());

        let decoded = doc.get("created").and_then(Value::as_str).unwrap();
        assert_eq!(parse_native_time(decoded), parse_native_time(original));
    }

    #[test]
    fn test_broken_wire_date_decodes_to_null() {
        let mut row = Map::new();
        row.insert("created".into(), json!("2-11-30T00:00:00Z"));
        let doc = Document::from_wire_row(&row, "id", &dated());
        assert_eq!(doc.get("created"), Some(&Value::Null));
    }

    #[test]
    fn test_from_wire_row_marks_existing_and_routes_score() {
        let mut row = Map::new();
        row.insert("id".into(), json!("42"));
        row.insert("name".into(), json!("answer"));
        row.insert("score".into(), json!(1.5));
        let doc = Document::from_wire_row(&row, "id", &AttributeMapping::new());

        assert!(!doc.is_new());
        assert_eq!(doc.score(), Some(1.5));
        assert!(!doc.has_attribute("score"));
        assert_eq!(doc.old_primary_key(), Some(&json!("42")));
        assert_eq!(doc.attribute_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_input_document_from_fields() {
        let fields = json!({"id": "1", "tags": ["x", "y"], "gone": null});
        let input = InputDocument::from_fields(fields.as_object().unwrap());
        assert_eq!(input.fields().len(), 3);
    }

    #[test]
    fn test_key_to_string() {
        assert_eq!(key_to_string(&json!(12)), Some("12".to_string()));
        assert_eq!(key_to_string(&json!("a")), Some("a".to_string()));
        assert_eq!(key_to_string(&json!(null)), None);
    }
}
