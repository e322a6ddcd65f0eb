//! Domain model for the image catalog.

pub mod entry;
pub mod extension;
pub mod filename;
pub mod upload;

pub use entry::{CatalogEntry, EntryId, EntrySummary, Labels, NewCatalogEntry};
pub use extension::{ALLOWED_EXTENSIONS, is_allowed_extension};
pub use filename::secure_filename;
pub use upload::{
    ImageSource, InsertOutcome, UploadReceipt, UploadRequest, UploadedFile,
};
