//! JSON document backing a collection.

use crate::error::Result;
use crate::types::Record;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One collection's JSON file: an ordered array of records.
#[derive(Clone, Debug)]
pub struct CollectionFile {
    path: PathBuf,
}

impl CollectionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    pub fn read(&self) -> Result<Vec<Record>> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write the document pretty-printed.
    ///
    /// Content goes to a sibling temp file that is then renamed over the
    /// target, so readers never observe a half-written document.
    pub fn write(&self, records: &[Record]) -> Result<()> {
        let data = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
