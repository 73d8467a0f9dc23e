//! # Folio
//!
//! A file-backed record store for small content collections, with image
//! attachments kept next to the records that own them.
//!
//! ## Core Concepts
//!
//! - **Collections**: One JSON document per collection, holding an ordered array of records
//! - **Records**: Typed metadata (`id`, timestamps, `pic`) plus loosely-typed fields
//! - **Attachments**: Images stored under `storage/{collectionId}/{recordId}/`
//! - **Site view**: Records with attachment filenames rewritten to public URLs
//!
//! ## Example
//!
//! ```ignore
//! use folio::{RecordStore, StoreConfig, UploadFile};
//! use serde_json::json;
//!
//! let store = RecordStore::open(StoreConfig::with_root("./site"))?;
//!
//! // Create a record
//! let fields = json!({"name": "Alice"}).as_object().cloned().unwrap();
//! let record = store.create_record("team", fields)?;
//!
//! // Attach a photo
//! let photo = UploadFile::new("alice.png", "image/png", std::fs::read("alice.png")?);
//! let record = store.upload_attachments("team", record.id.as_str(), vec![photo])?;
//! ```

pub mod attachments;
pub mod collections;
pub mod error;
pub mod site;
pub mod store;
pub mod types;

// Re-exports
pub use attachments::{AttachmentKind, AttachmentStorage, ImageOptions, UploadFile};
pub use collections::{CollectionConfig, CollectionFile, CollectionListing, CollectionTable};
pub use error::{ErrorKind, Result, StoreError};
pub use site::{PublishedRecord, SiteView};
pub use store::{RecordStore, StoreConfig};
pub use types::*;
