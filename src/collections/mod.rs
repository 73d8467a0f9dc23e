//! Collection definitions and their JSON documents.
//!
//! Each collection is one JSON file holding an ordered array of records.
//! The name-to-file and name-to-collection-id mapping is a static table
//! injected into the store through its config.

mod config;
mod file;

pub use config::{CollectionConfig, CollectionListing, CollectionTable};
pub use file::CollectionFile;
