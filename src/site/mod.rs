//! Read-only presentation of collections for the static site.
//!
//! The site reads the same JSON documents the store writes and needs each
//! record's attachment list as public URLs rather than bare filenames.

use crate::collections::CollectionConfig;
use crate::error::Result;
use crate::store::RecordStore;
use crate::types::{Fields, Record, RecordId, Timestamp};
use serde::Serialize;

/// URL prefix under which the storage tree is published.
pub const STORAGE_URL_PREFIX: &str = "/storage";

/// A record as the site consumes it: `pic` holds URLs, as a real array.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRecord {
    pub id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    pub collection_name: String,
    pub pic: Vec<String>,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Maps stored records to their published form.
#[derive(Clone, Debug, Default)]
pub struct SiteView {
    /// Path the site is mounted under (e.g. "/3PS"), or empty.
    base_path: String,
}

impl SiteView {
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// `{base}/storage/{collectionId}/{recordId}/{filename}`
    pub fn attachment_url(&self, collection_id: &str, record_id: &str, filename: &str) -> String {
        format!(
            "{}{}/{}/{}/{}",
            self.base_path, STORAGE_URL_PREFIX, collection_id, record_id, filename
        )
    }

    pub fn publish_record(&self, config: &CollectionConfig, record: &Record) -> PublishedRecord {
        let pic = record
            .pic
            .iter()
            .map(|filename| self.attachment_url(&config.id, record.id.as_str(), filename))
            .collect();
        PublishedRecord {
            id: record.id.clone(),
            created: record.created,
            updated: record.updated,
            collection_name: record.collection_name.clone(),
            pic,
            fields: record.fields.clone(),
        }
    }

    /// Publish every record of a collection, in stored order.
    pub fn publish_collection(
        &self,
        store: &RecordStore,
        name: &str,
    ) -> Result<Vec<PublishedRecord>> {
        let listing = store.list_collection(name)?;
        Ok(listing
            .data
            .iter()
            .map(|record| self.publish_record(&listing.config, record))
            .collect())
    }
}
