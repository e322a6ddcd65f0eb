use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use url::Url;

use super::EntryId;

/// A file posted from the browser.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as supplied by the client, unsanitized.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Input of the upload use-case. Exactly one of `image_url` / `upload` must
/// be present.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub name: String,
    pub image_url: Option<String>,
    pub upload: Option<UploadedFile>,
}

impl UploadRequest {
    pub fn from_url(name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: Some(image_url.into()),
            upload: None,
        }
    }

    pub fn from_file(name: impl Into<String>, file: UploadedFile) -> Self {
        Self {
            name: name.into(),
            image_url: None,
            upload: Some(file),
        }
    }
}

/// Where a label provider should read the image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(Url),
    Local(PathBuf),
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Remote(url) => write!(f, "{url}"),
            ImageSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Result of an insert-or-ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted(EntryId),
    /// An entry with the same location already existed; nothing changed.
    Duplicate,
}

impl InsertOutcome {
    pub fn inserted_id(self) -> Option<EntryId> {
        match self {
            InsertOutcome::Inserted(id) => Some(id),
            InsertOutcome::Duplicate => None,
        }
    }
}

/// What a successful upload hands back for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub location: String,
    pub labels: String,
    pub outcome: InsertOutcome,
}
