// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::{RecordId, fold_case};

/// One backend entity as delivered: field name to scalar or nested value, in
/// the order the server declared the fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Returns a copy with `key` set; the receiver is left untouched.
    pub fn with_field(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.to_owned(), value.into());
        Self { fields }
    }

    pub fn id(&self) -> Option<RecordId> {
        match self.fields.get("id")? {
            Value::Number(number) => number.as_i64().map(RecordId::new),
            Value::String(text) => text.trim().parse().ok().map(RecordId::new),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// String and number fields only; null, bool, and nested values yield `None`.
    pub fn scalar_text(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(scalar_to_string)
    }

    /// Lowercased, space-joined concatenation of every string or number field.
    pub fn search_haystack(&self) -> String {
        let joined = self
            .fields
            .values()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(" ");
        fold_case(&joined)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number_text(number)),
        _ => None,
    }
}

/// Integral floats print without a fraction, so `2.0` reads as `2`.
fn number_text(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(value)
            if !number.is_i64()
                && !number.is_u64()
                && value.fract() == 0.0
                && value.abs() < MAX_EXACT_INTEGER =>
        {
            format!("{}", value as i64)
        }
        _ => number.to_string(),
    }
}

const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Key set of the first record in a collection. Column gating reads this, not
/// individual records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySet {
    keys: BTreeSet<String>,
}

impl KeySet {
    pub fn from_record(record: &Record) -> Self {
        Self {
            keys: record.keys().map(str::to_owned).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordCollection {
    records: Vec<Record>,
}

impl RecordCollection {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Accepts only a JSON array of objects. Anything else is a shape mismatch.
    pub fn from_json(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        let records = items
            .iter()
            .map(|item| Record::from_value(item.clone()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { records })
    }

    pub fn schema(&self) -> KeySet {
        self.records
            .first()
            .map(KeySet::from_record)
            .unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for RecordCollection {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::{KeySet, Record, RecordCollection};
    use crate::RecordId;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).expect("object record")
    }

    #[test]
    fn haystack_joins_scalars_in_field_order() {
        let member = record(json!({
            "id": 7,
            "name": "Asha Rao",
            "active": true,
            "mobile": "9876543210",
            "address": {"city": "Pune"},
            "email": null,
        }));
        assert_eq!(member.search_haystack(), "7 asha rao 9876543210");
    }

    #[test]
    fn id_accepts_numeric_strings() {
        assert_eq!(record(json!({"id": "12"})).id(), Some(RecordId::new(12)));
        assert_eq!(record(json!({"id": 3})).id(), Some(RecordId::new(3)));
        assert_eq!(record(json!({"id": "x"})).id(), None);
        assert_eq!(record(json!({"name": "none"})).id(), None);
    }

    #[test]
    fn integral_floats_read_without_fraction() {
        let row = record(json!({"whole": 2.0, "part": 2.5, "int": 40, "negative": -3.0}));
        assert_eq!(row.scalar_text("whole").as_deref(), Some("2"));
        assert_eq!(row.scalar_text("part").as_deref(), Some("2.5"));
        assert_eq!(row.scalar_text("int").as_deref(), Some("40"));
        assert_eq!(row.scalar_text("negative").as_deref(), Some("-3"));
        assert_eq!(row.search_haystack(), "2 2.5 40 -3");
    }

    #[test]
    fn with_field_leaves_original_untouched() {
        let original = record(json!({"id": 1, "user_status": "Active"}));
        let updated = original.with_field("user_status", "Inactive");
        assert_eq!(original.scalar_text("user_status").as_deref(), Some("Active"));
        assert_eq!(updated.scalar_text("user_status").as_deref(), Some("Inactive"));
    }

    #[test]
    fn collection_rejects_non_array_and_non_object_items() {
        assert!(RecordCollection::from_json(&json!({"id": 1})).is_none());
        assert!(RecordCollection::from_json(&json!([{"id": 1}, 2])).is_none());
        let parsed = RecordCollection::from_json(&json!([{"id": 1}, {"id": 2}]))
            .expect("array of objects");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn schema_comes_from_first_record_only() {
        let collection = RecordCollection::new(vec![
            record(json!({"id": 1, "name": "A"})),
            record(json!({"id": 2, "name": "B", "member_category": "Life"})),
        ]);
        let schema = collection.schema();
        assert!(schema.contains("name"));
        assert!(!schema.contains("member_category"));
        assert_eq!(RecordCollection::empty().schema(), KeySet::default());
    }
}
