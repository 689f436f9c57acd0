//! JSON records loaded from disk.

use std::{cmp::Ordering, fs, path::Path};

use serde_json::{Map, Value};
use viewsync::{
    Record,
    tree::PathRecord,
    view::{Searchable, SortBy, SortOrder},
};

/// One JSON object with its identifying string pulled out.
///
/// Tables key records by their `key` field, falling back to `path`; trees
/// use `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    id: String,
    fields: Map<String, Value>,
}

impl JsonRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Numeric value of `name`; missing or non-numeric fields count as zero.
    pub fn number(&self, name: &str) -> f64 {
        self.field(name).and_then(Value::as_f64).unwrap_or_default()
    }
}

impl Record for JsonRecord {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }
}

impl PathRecord for JsonRecord {
    fn path(&self) -> &str {
        &self.id
    }
}

impl Searchable for JsonRecord {
    fn matches_text(&self, needle: &str) -> bool {
        self.id.to_lowercase().contains(needle)
            || self.fields.values().any(|v| value_matches(v, needle))
    }
}

fn value_matches(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        Value::Bool(b) => b.to_string() == needle,
        Value::Array(items) => items.iter().any(|v| value_matches(v, needle)),
        Value::Object(map) => map.values().any(|v| value_matches(v, needle)),
        Value::Null => false,
    }
}

/// Which field identifies a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    KeyOrPath,
    Path,
}

impl IdField {
    fn names(self) -> &'static [&'static str] {
        match self {
            IdField::KeyOrPath => &["key", "path"],
            IdField::Path => &["path"],
        }
    }
}

/// Reads a JSON array of objects from `path`.
pub fn load(path: &Path, id_field: IdField) -> Result<Vec<JsonRecord>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let records = parse(&text, id_field).map_err(|e| format!("{}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records)
}

/// Parses a JSON array of objects, extracting each object's identifier.
pub fn parse(text: &str, id_field: IdField) -> Result<Vec<JsonRecord>, String> {
    let values: Vec<Value> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let Value::Object(fields) = value else {
                return Err(format!("record {index} is not an object"));
            };
            let id = id_field
                .names()
                .iter()
                .find_map(|name| fields.get(*name).and_then(identifier))
                .ok_or_else(|| {
                    format!(
                        "record {index} has no {} field",
                        id_field.names().join(" or ")
                    )
                })?;
            Ok(JsonRecord { id, fields })
        })
        .collect()
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Orders JSON values: numbers, then strings, then booleans, then anything
/// else; missing values last.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            Some(Value::Number(_)) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Null) | None => 4,
            Some(_) => 3,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sort by one field of the record.
pub fn by_field(field: &str, order: SortOrder) -> SortBy<JsonRecord> {
    let field = field.to_string();
    SortBy::new(move |a: &JsonRecord, b: &JsonRecord| {
        compare_values(a.field(&field), b.field(&field))
    })
    .with_order(order)
}
