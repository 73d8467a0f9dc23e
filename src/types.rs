//! Core types for the record store.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Caller-supplied field map, merged shallowly onto a record.
pub type Fields = Map<String, Value>;

/// Length of a generated record identifier.
pub const RECORD_ID_LENGTH: usize = 15;

const RECORD_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Name of the attachment-list field.
pub const PIC_FIELD: &str = "pic";

/// Metadata keys owned by the store. Caller fields with these names are ignored.
pub const RESERVED_FIELDS: &[&str] = &["id", "created", "updated", "collectionName"];

/// Opaque identifier for a record, unique within its collection.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a random lowercase alphanumeric identifier.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..RECORD_ID_LENGTH)
            .map(|_| RECORD_ID_ALPHABET[rng.random_range(0..RECORD_ID_ALPHABET.len())] as char)
            .collect();
        RecordId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl PartialEq<str> for RecordId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RecordId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// UTC instant, serialized as an ISO-8601 string.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time, at millisecond precision.
    pub fn now() -> Self {
        Timestamp(Utc::now().trunc_subsecs(3))
    }

    /// Parse an RFC 3339 string, or the `2024-01-31 12:00:00.000Z` form
    /// found in exported data.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|naive| Timestamp(naive.and_utc()))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// ISO-8601 with milliseconds (`2024-01-31T12:00:00.000Z`); finer
    /// precision read from a document is kept.
    pub fn to_iso_string(&self) -> String {
        let format = if self.0.timestamp_subsec_nanos() % 1_000_000 == 0 {
            SecondsFormat::Millis
        } else {
            SecondsFormat::AutoSi
        };
        self.0.to_rfc3339_opts(format, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// A single record in a collection.
///
/// Metadata is typed; everything else lives in `fields` as loosely-typed
/// JSON so the update path stays collection-agnostic. Metadata read from a
/// document that does not have the expected shape is kept in `fields` under
/// its original key, so saving writes it back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Unique identifier (assigned by store, immutable). Empty when the
    /// document entry has no usable id.
    pub id: RecordId,

    pub created: Option<Timestamp>,

    pub updated: Option<Timestamp>,

    pub collection_name: String,

    /// Attachment filenames, in upload order.
    pub pic: Vec<String>,

    /// Collection-specific fields.
    pub fields: Fields,
}

/// Where a document key lands when reading a record.
enum Slot {
    Id,
    Created,
    Updated,
    CollectionName,
    Pic,
    Field,
}

impl Slot {
    fn of(key: &str) -> Self {
        match key {
            "id" => Slot::Id,
            "created" => Slot::Created,
            "updated" => Slot::Updated,
            "collectionName" => Slot::CollectionName,
            PIC_FIELD => Slot::Pic,
            _ => Slot::Field,
        }
    }
}

impl Record {
    /// A fresh record with no attachments and `created == updated`.
    pub fn new(id: RecordId, collection_name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            created: Some(now),
            updated: Some(now),
            collection_name: collection_name.into(),
            pic: Vec::new(),
            fields: Fields::new(),
        }
    }

    /// Build a record from one entry of a collection document.
    ///
    /// Never fails: string and numeric ids are accepted, and metadata that
    /// cannot be parsed stays in `fields` as its raw value.
    pub fn from_document(document: Fields) -> Self {
        let mut record = Self {
            id: RecordId::default(),
            created: None,
            updated: None,
            collection_name: String::new(),
            pic: Vec::new(),
            fields: Fields::new(),
        };

        for (key, value) in document {
            match Slot::of(&key) {
                Slot::Id => match value {
                    Value::String(id) if !id.is_empty() => record.id = RecordId(id),
                    Value::Number(n) => record.id = RecordId(n.to_string()),
                    raw => {
                        record.fields.insert(key, raw);
                    }
                },
                Slot::Created | Slot::Updated => match value.as_str().and_then(Timestamp::parse) {
                    Some(ts) if key == "created" => record.created = Some(ts),
                    Some(ts) => record.updated = Some(ts),
                    None => {
                        record.fields.insert(key, value);
                    }
                },
                Slot::CollectionName => match value {
                    Value::String(name) if !name.is_empty() => record.collection_name = name,
                    raw => {
                        record.fields.insert(key, raw);
                    }
                },
                Slot::Pic => record.pic = decode_pic(&value),
                Slot::Field => {
                    record.fields.insert(key, value);
                }
            }
        }
        record
    }

    /// Get a collection-specific field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Shallow-merge caller fields. Only keys present in `fields` are
    /// applied; reserved metadata keys are skipped and `pic` replaces the
    /// attachment list. Does not refresh `updated`.
    pub fn merge_fields(&mut self, fields: Fields) {
        for (key, value) in fields {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if key == PIC_FIELD {
                self.pic = decode_pic(&value);
            } else {
                self.fields.insert(key, value);
            }
        }
    }

    /// Refresh `updated`, replacing any unparsed value kept in `fields`.
    pub fn touch(&mut self) {
        self.updated = Some(Timestamp::now());
        self.fields.retain(|key, _| key != "updated");
    }

    /// Remove a filename from `pic`. Returns whether it was present.
    pub fn remove_attachment(&mut self, filename: &str) -> bool {
        let before = self.pic.len();
        self.pic.retain(|name| name != filename);
        self.pic.len() != before
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.id.as_str().is_empty() {
            map.serialize_entry("id", &self.id)?;
        }
        if let Some(created) = &self.created {
            map.serialize_entry("created", created)?;
        }
        if let Some(updated) = &self.updated {
            map.serialize_entry("updated", updated)?;
        }
        if !self.collection_name.is_empty() {
            map.serialize_entry("collectionName", &self.collection_name)?;
        }
        // Doubly encoded: a JSON array inside a JSON string.
        map.serialize_entry(PIC_FIELD, &encode_pic(&self.pic))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Fields::deserialize(deserializer).map(Record::from_document)
    }
}

/// Decode a `pic` value leniently.
///
/// Arrays are taken as-is (non-string entries dropped). Strings are parsed
/// as a JSON array; a non-empty string that is not one is treated as a
/// single filename. Anything else is empty.
pub fn decode_pic(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(raw) if raw.trim().is_empty() => Vec::new(),
        Value::String(raw) => match serde_json::from_str::<Vec<String>>(raw) {
            Ok(names) => names,
            Err(_) => vec![raw.clone()],
        },
        _ => Vec::new(),
    }
}

/// Encode a `pic` list as the JSON-array string stored on disk.
pub fn encode_pic(pic: &[String]) -> String {
    Value::from(pic.to_vec()).to_string()
}
