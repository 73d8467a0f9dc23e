//! Attachment directory tree.

use crate::error::{Result, StoreError};
use rand::Rng;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Length of the random suffix appended to uploaded filenames.
const SUFFIX_LENGTH: usize = 10;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Filesystem storage for record attachments.
pub struct AttachmentStorage {
    /// Base directory (`.../static/storage`).
    path: PathBuf,
}

impl AttachmentStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Directory owned by one record.
    pub fn record_dir(&self, collection_id: &str, record_id: &str) -> Result<PathBuf> {
        Ok(self
            .path
            .join(validate_segment(collection_id)?)
            .join(validate_segment(record_id)?))
    }

    /// Create the record directory if absent and return it.
    pub fn ensure_record_dir(&self, collection_id: &str, record_id: &str) -> Result<PathBuf> {
        let dir = self.record_dir(collection_id, record_id)?;
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write one attachment into an existing record directory.
    pub fn write(&self, dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
        let path = dir.join(validate_segment(filename)?);
        fs::write(&path, content)?;
        debug!(path = %path.display(), size = content.len(), "attachment written");
        Ok(path)
    }

    /// Path of an existing attachment.
    pub fn resolve(&self, collection_id: &str, record_id: &str, filename: &str) -> Result<PathBuf> {
        let path = self
            .record_dir(collection_id, record_id)?
            .join(validate_segment(filename)?);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::AttachmentNotFound(path))
        }
    }

    /// Best-effort unlink of one attachment. Failures are logged.
    pub fn remove_file(&self, collection_id: &str, record_id: &str, filename: &str) -> bool {
        let path = match self
            .record_dir(collection_id, record_id)
            .and_then(|dir| Ok(dir.join(validate_segment(filename)?)))
        {
            Ok(path) => path,
            Err(e) => {
                warn!(record_id, filename, error = %e, "could not delete attachment");
                return false;
            }
        };

        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not delete attachment");
                false
            }
        }
    }

    /// Best-effort recursive removal of a record directory. A missing
    /// directory counts as removed.
    pub fn remove_record_dir(&self, collection_id: &str, record_id: &str) -> bool {
        let dir = match self.record_dir(collection_id, record_id) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(record_id, error = %e, "could not delete storage directory");
                return false;
            }
        };

        match fs::remove_dir_all(&dir) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "could not delete storage directory");
                false
            }
        }
    }
}

/// Check that `segment` is a single plain path component.
pub fn validate_segment(segment: &str) -> Result<&str> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::Validation(format!(
            "invalid path segment: {segment:?}"
        )));
    }
    Ok(segment)
}

/// Build `{base}_{suffix}.{extension}` from an uploaded file's name.
///
/// The base is everything before the first dot of the name's last path
/// component, with control characters removed.
pub fn generate_file_name(original_name: &str, extension: &str) -> String {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let base: String = file_name
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("{base}_{suffix}.{extension}")
}
