use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::HashMap;

pub const PRICE_FIELD: &str = "price";
pub const CURRENCY_FIELD: &str = "currency";
pub const IDENTIFIER_FIELD: &str = "zpid";
pub const CREATION_DATE_FIELD: &str = "creationDate";

/// 一列房源資料：欄位名稱到字串值的有序對應
///
/// Field order follows the source header so that pass-through fields are
/// written back in the same position. Setting an existing field replaces it in
/// place; setting a new field appends it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key == name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Location of an uploaded file in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Raw rates as reported by the feed, relative to the feed's own anchor
/// currency. `None` marks a currency the feed listed without a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeSnapshot {
    pub rates: HashMap<String, Option<Decimal>>,
}

impl ExchangeSnapshot {
    pub fn new(rates: HashMap<String, Option<Decimal>>) -> Self {
        Self { rates }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub records: Vec<Record>,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub stored: usize,
    pub failed: usize,
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub persisted: PersistReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationSummary {
    pub files_total: usize,
    pub files_failed: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub items_stored: usize,
    pub items_failed: usize,
    pub files_archived: usize,
}

impl InvocationSummary {
    pub(crate) fn record_file(&mut self, report: &FileReport) {
        self.rows_read += report.rows_read;
        self.rows_dropped += report.rows_dropped;
        self.items_stored += report.persisted.stored;
        self.items_failed += report.persisted.failed;
        if report.persisted.archived {
            self.files_archived += 1;
        }
    }
}

// --- S3 object-created notification payload ---

#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl S3Event {
    /// S3 delivers object keys form-encoded (`+` for space, `%xx` escapes).
    pub fn object_refs(&self) -> Vec<ObjectRef> {
        self.records
            .iter()
            .map(|record| {
                let raw = record.s3.object.key.replace('+', " ");
                let key = match urlencoding::decode(&raw) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => {
                        tracing::warn!("Object key is not valid percent-encoded UTF-8, using it as-is: {}", record.s3.object.key);
                        record.s3.object.key.clone()
                    }
                };
                ObjectRef::new(record.s3.bucket.name.clone(), key)
            })
            .collect()
    }
}

/// Fixed acknowledgment returned to the trigger, whatever happened to
/// individual files.
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

pub const COMPLETION_MESSAGE: &str = "Currency normalization complete!";

impl InvocationResponse {
    pub fn complete() -> Self {
        Self {
            status_code: 200,
            body: format!("\"{}\"", COMPLETION_MESSAGE),
        }
    }
}
