//! Attachment files colocated with records.
//!
//! Files live at `{storage}/{collectionId}/{recordId}/{filename}`. Uploads
//! are checked against an image allow-list and a size ceiling, and raster
//! formats are re-encoded to a bounded size before being written.

mod optimize;
mod storage;
mod upload;

pub use optimize::{optimize, ImageOptions};
pub use storage::{generate_file_name, validate_segment, AttachmentStorage};
pub use upload::{AttachmentKind, UploadFile, DEFAULT_MAX_UPLOAD_BYTES};
