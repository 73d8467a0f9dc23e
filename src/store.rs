//! Main RecordStore tying collections and attachments together.

use crate::attachments::{
    generate_file_name, optimize, validate_segment, AttachmentStorage, ImageOptions, UploadFile,
    DEFAULT_MAX_UPLOAD_BYTES,
};
use crate::collections::{CollectionConfig, CollectionFile, CollectionListing, CollectionTable};
use crate::error::{Result, StoreError};
use crate::types::{Fields, Record, RecordId};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding one JSON document per collection.
    pub data_dir: PathBuf,

    /// Root of the attachment tree.
    pub storage_dir: PathBuf,

    /// Known collections.
    pub collections: CollectionTable,

    /// Size ceiling for a single uploaded file.
    pub max_upload_bytes: u64,

    /// Bounds applied when re-encoding images.
    pub image: ImageOptions,

    /// Reject caller fields that the collection does not list.
    pub strict_fields: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl StoreConfig {
    /// Site layout: `{root}/data/*.json` and `{root}/static/storage`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            storage_dir: root.join("static").join("storage"),
            collections: CollectionTable::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            image: ImageOptions::default(),
            strict_fields: false,
        }
    }
}

/// File-backed record store.
///
/// Owns the JSON document of every configured collection and the attachment
/// directory of every record. Each mutating operation holds its collection's
/// write lock for the whole read-modify-write cycle, so operations on the
/// same collection serialize within one process. Separate processes writing
/// the same files are not coordinated: the last save wins.
pub struct RecordStore {
    config: StoreConfig,

    attachments: AttachmentStorage,

    /// Per-collection write locks, keyed by collection name.
    write_locks: HashMap<String, Mutex<()>>,
}

impl RecordStore {
    /// Open a store, creating its data and storage directories if missing.
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(&config.storage_dir)?;

        let attachments = AttachmentStorage::new(&config.storage_dir);
        let write_locks = config
            .collections
            .names()
            .map(|name| (name.to_string(), Mutex::new(())))
            .collect();

        Ok(Self {
            config,
            attachments,
            write_locks,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn collections(&self) -> &CollectionTable {
        &self.config.collections
    }

    pub fn attachments(&self) -> &AttachmentStorage {
        &self.attachments
    }

    // --- Collection Documents ---

    /// Read a collection. Missing, unreadable or malformed documents and
    /// unknown names all yield an empty collection.
    pub fn load(&self, name: &str) -> Vec<Record> {
        let Some(config) = self.config.collections.get(name) else {
            warn!(collection = name, "unknown collection, treating as empty");
            return Vec::new();
        };

        let file = self.collection_file(config);
        match file.read() {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    collection = name,
                    path = %file.path().display(),
                    error = %e,
                    "could not read collection, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Overwrite a collection's document. Returns false on any failure.
    pub fn save(&self, name: &str, records: &[Record]) -> bool {
        let Some(config) = self.config.collections.get(name) else {
            error!(collection = name, "cannot save unknown collection");
            return false;
        };

        let file = self.collection_file(config);
        match file.write(records) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    collection = name,
                    path = %file.path().display(),
                    error = %e,
                    "could not write collection"
                );
                false
            }
        }
    }

    /// Every collection with its records and config, in table order.
    pub fn list_collections(&self) -> Vec<CollectionListing> {
        self.config
            .collections
            .iter()
            .map(|config| CollectionListing {
                name: config.name.clone(),
                data: self.load(&config.name),
                config: config.clone(),
            })
            .collect()
    }

    /// One collection with its records and config.
    pub fn list_collection(&self, name: &str) -> Result<CollectionListing> {
        let config = self.collection(name)?;
        Ok(CollectionListing {
            name: config.name.clone(),
            data: self.load(name),
            config: config.clone(),
        })
    }

    /// Create the attachment directory of a record if absent.
    pub fn ensure_attachment_dir(&self, name: &str, record_id: &str) -> Result<PathBuf> {
        let config = self.collection(name)?;
        self.attachments.ensure_record_dir(&config.id, record_id)
    }

    // --- Record Operations ---

    /// Get a record by id.
    pub fn get_record(&self, name: &str, id: &str) -> Result<Record> {
        self.collection(name)?;
        self.load(name)
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::record_not_found(name, id))
    }

    /// Create a record from caller fields.
    ///
    /// The store assigns `id`, `created`, `updated` and `collectionName`;
    /// `pic` starts empty unless the caller supplies one.
    pub fn create_record(&self, name: &str, fields: Fields) -> Result<Record> {
        let (config, _lock) = self.lock_collection(name)?;
        self.check_fields(config, &fields)?;

        let mut records = self.load(name);
        let id = unique_id(&records);

        let mut record = Record::new(id, name);
        record.merge_fields(fields);

        let dir = self
            .attachments
            .ensure_record_dir(&config.id, record.id.as_str())?;

        records.push(record.clone());
        if !self.save(name, &records) {
            if let Err(e) = fs::remove_dir(&dir) {
                warn!(path = %dir.display(), error = %e, "could not remove storage directory");
            }
            return Err(StoreError::SaveFailed(name.to_string()));
        }

        info!(collection = name, record_id = %record.id, "record created");
        Ok(record)
    }

    /// Shallow-merge caller fields over an existing record.
    pub fn update_record(&self, name: &str, id: &str, fields: Fields) -> Result<Record> {
        let (config, _lock) = self.lock_collection(name)?;
        self.check_fields(config, &fields)?;

        let mut records = self.load(name);
        let record = find_mut(&mut records, name, id)?;
        record.merge_fields(fields);
        record.touch();
        let updated = record.clone();

        self.save_or_fail(name, &records)?;
        debug!(collection = name, record_id = id, "record updated");
        Ok(updated)
    }

    /// Remove a record and its whole attachment directory.
    ///
    /// Directory removal is best-effort. If saving fails the record is
    /// already gone from the in-memory copy but still on disk.
    pub fn delete_record(&self, name: &str, id: &str) -> Result<Record> {
        let (config, _lock) = self.lock_collection(name)?;

        let mut records = self.load(name);
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::record_not_found(name, id))?;
        let deleted = records.remove(index);

        self.attachments.remove_record_dir(&config.id, id);

        self.save_or_fail(name, &records)?;
        info!(collection = name, record_id = id, "record deleted");
        Ok(deleted)
    }

    // --- Attachment Operations ---

    /// Validate, optimize and store uploaded images, appending their
    /// generated filenames to the record's `pic` list.
    ///
    /// Every file is validated and re-encoded in memory before anything is
    /// written. Files already written are left in place if the save fails.
    pub fn upload_attachments(
        &self,
        name: &str,
        id: &str,
        files: Vec<UploadFile>,
    ) -> Result<Record> {
        let (config, _lock) = self.lock_collection(name)?;

        if files.is_empty() {
            return Err(StoreError::Validation("No files uploaded".to_string()));
        }
        let kinds = files
            .iter()
            .map(|file| file.validate(self.config.max_upload_bytes))
            .collect::<Result<Vec<_>>>()?;

        let mut records = self.load(name);
        let record = find_mut(&mut records, name, id)?;

        let mut staged = Vec::with_capacity(files.len());
        for (file, kind) in files.into_iter().zip(kinds) {
            let extension = file.extension().unwrap_or_default();
            let filename = generate_file_name(&file.original_name, &extension);
            validate_segment(&filename)?;
            let content = if kind.is_reencoded() {
                optimize(&file.content, &self.config.image)?
            } else {
                file.content
            };
            staged.push((filename, content));
        }

        let dir = self.attachments.ensure_record_dir(&config.id, id)?;
        for (filename, content) in &staged {
            self.attachments.write(&dir, filename, content)?;
        }

        record
            .pic
            .extend(staged.into_iter().map(|(filename, _)| filename));
        record.touch();
        let updated = record.clone();

        self.save_or_fail(name, &records)?;
        info!(
            collection = name,
            record_id = id,
            attachments = updated.pic.len(),
            "attachments uploaded"
        );
        Ok(updated)
    }

    /// Unlink one attachment (best-effort) and drop it from `pic`.
    ///
    /// A filename not listed in `pic` is not an error.
    pub fn delete_attachment(&self, name: &str, id: &str, filename: &str) -> Result<Record> {
        let (config, _lock) = self.lock_collection(name)?;

        let mut records = self.load(name);
        let record = find_mut(&mut records, name, id)?;
        validate_segment(filename)?;

        self.attachments.remove_file(&config.id, id, filename);
        if !record.remove_attachment(filename) {
            debug!(collection = name, record_id = id, filename, "attachment not listed");
        }
        record.touch();
        let updated = record.clone();

        self.save_or_fail(name, &records)?;
        Ok(updated)
    }

    /// Path of a stored attachment, for serving its bytes.
    pub fn resolve_attachment_path(
        &self,
        collection_id: &str,
        record_id: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        self.attachments.resolve(collection_id, record_id, filename)
    }

    // --- Internals ---

    fn collection(&self, name: &str) -> Result<&CollectionConfig> {
        self.config
            .collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn lock_collection(&self, name: &str) -> Result<(&CollectionConfig, MutexGuard<'_, ()>)> {
        let config = self.collection(name)?;
        let lock = self
            .write_locks
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        Ok((config, lock.lock()))
    }

    fn collection_file(&self, config: &CollectionConfig) -> CollectionFile {
        CollectionFile::new(self.config.data_dir.join(&config.file_name))
    }

    fn save_or_fail(&self, name: &str, records: &[Record]) -> Result<()> {
        if self.save(name, records) {
            Ok(())
        } else {
            Err(StoreError::SaveFailed(name.to_string()))
        }
    }

    fn check_fields(&self, config: &CollectionConfig, fields: &Fields) -> Result<()> {
        if !self.config.strict_fields {
            return Ok(());
        }
        let unknown = config.unknown_fields(fields);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(format!(
                "unknown fields for {}: {}",
                config.name,
                unknown.join(", ")
            )))
        }
    }
}

/// Generate an id not already used in `records`.
fn unique_id(records: &[Record]) -> RecordId {
    loop {
        let id = RecordId::generate();
        if !records.iter().any(|r| r.id == id) {
            return id;
        }
    }
}

fn find_mut<'a>(records: &'a mut [Record], name: &str, id: &str) -> Result<&'a mut Record> {
    records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| StoreError::record_not_found(name, id))
}
