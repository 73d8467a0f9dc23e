//! Static collection table.

use crate::types::{Fields, Record};
use serde::Serialize;

/// Configuration of a single collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionConfig {
    /// Logical name used by callers (e.g. "team").
    #[serde(skip)]
    pub name: String,

    /// External collection id, used for storage paths and URLs.
    pub id: String,

    /// JSON document filename inside the data directory.
    #[serde(skip)]
    pub file_name: String,

    /// Editable fields known for this collection.
    pub fields: Vec<String>,
}

impl CollectionConfig {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        file_name: impl Into<String>,
        fields: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            file_name: file_name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Caller keys that are neither known fields nor store-managed.
    pub fn unknown_fields<'a>(&self, fields: &'a Fields) -> Vec<&'a str> {
        fields
            .keys()
            .map(String::as_str)
            .filter(|key| {
                *key != crate::types::PIC_FIELD
                    && !crate::types::RESERVED_FIELDS.contains(key)
                    && !self.fields.iter().any(|f| f == key)
            })
            .collect()
    }
}

/// Ordered table of known collections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionTable {
    entries: Vec<CollectionConfig>,
}

impl CollectionTable {
    pub fn new(entries: Vec<CollectionConfig>) -> Self {
        Self { entries }
    }

    /// Look up a collection by logical name.
    pub fn get(&self, name: &str) -> Option<&CollectionConfig> {
        self.entries.iter().find(|c| c.name == name)
    }

    /// Look up a collection by its external id.
    pub fn by_collection_id(&self, id: &str) -> Option<&CollectionConfig> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionConfig> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CollectionTable {
    /// The site's five collections. Ids and filenames must match existing data;
    /// `metaverse` is stored as `Metaverse.json`.
    fn default() -> Self {
        Self::new(vec![
            CollectionConfig::new(
                "team",
                "pbc_3824009647",
                "team.json",
                &["name", "nickname", "bio", "role"],
            ),
            CollectionConfig::new(
                "musician",
                "5rod2tewrl0ov3d",
                "musician.json",
                &["name", "genre", "bio", "site", "route"],
            ),
            CollectionConfig::new(
                "artist",
                "3jnleendml5ld46",
                "artist.json",
                &["title", "desc", "bio", "site", "route"],
            ),
            CollectionConfig::new("partner", "cx8afblkixaub05", "partner.json", &["name", "site"]),
            CollectionConfig::new(
                "metaverse",
                "0ct1vfvg71ebu9r",
                "Metaverse.json",
                &["title", "desc", "url"],
            ),
        ])
    }
}

/// A collection's records together with its config.
#[derive(Clone, Debug, Serialize)]
pub struct CollectionListing {
    #[serde(skip)]
    pub name: String,
    pub data: Vec<Record>,
    pub config: CollectionConfig,
}
