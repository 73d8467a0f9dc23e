//! Uploaded files and the image allow-list.

use crate::error::{Result, StoreError};

/// Size ceiling for a single uploaded file (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A file received from a caller, held in memory.
#[derive(Clone, Debug)]
pub struct UploadFile {
    /// Name as supplied by the client (e.g. "photo.PNG").
    pub original_name: String,
    /// Declared MIME type (e.g. "image/png").
    pub content_type: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.into(),
            content,
        }
    }

    /// Lower-cased text after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.original_name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    /// Check the allow-list and the size ceiling.
    pub fn validate(&self, max_bytes: u64) -> Result<AttachmentKind> {
        let kind = self
            .extension()
            .as_deref()
            .and_then(AttachmentKind::from_extension)
            .ok_or_else(|| {
                StoreError::Validation(format!(
                    "Only image files are allowed: {}",
                    self.original_name
                ))
            })?;

        if !content_type_allowed(&self.content_type) {
            return Err(StoreError::Validation(format!(
                "Only image files are allowed: {} ({})",
                self.original_name, self.content_type
            )));
        }

        let size = self.content.len() as u64;
        if size > max_bytes {
            return Err(StoreError::PayloadTooLarge {
                name: self.original_name.clone(),
                size,
                limit: max_bytes,
            });
        }

        Ok(kind)
    }
}

/// Allowed attachment formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl AttachmentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(AttachmentKind::Jpeg),
            "png" => Some(AttachmentKind::Png),
            "gif" => Some(AttachmentKind::Gif),
            "webp" => Some(AttachmentKind::Webp),
            _ => None,
        }
    }

    /// Whether uploads of this kind are resized and re-compressed.
    /// GIFs are stored byte-for-byte.
    pub fn is_reencoded(self) -> bool {
        !matches!(self, AttachmentKind::Gif)
    }
}

fn content_type_allowed(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(subtype) => AttachmentKind::from_extension(subtype).is_some(),
        None => false,
    }
}
