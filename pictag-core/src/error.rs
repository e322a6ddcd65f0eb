use thiserror::Error;

use crate::domain::EntryId;
use crate::domain::extension::UNSUPPORTED_EXTENSION_MESSAGE;
use crate::providers::LabelAcquisitionError;

/// Message shown whenever label acquisition fails, whatever the cause.
pub const LABEL_RETRY_MESSAGE: &str =
    "Something went wrong. Please retry with another image URL";

pub const NOT_FOUND_MESSAGE: &str = "Image not found";

const STORAGE_MESSAGE: &str = "Something went wrong. Please try again later";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unsupported extension for {0}")]
    UnsupportedExtension(String),

    #[error(transparent)]
    LabelAcquisition(#[from] LabelAcquisitionError),

    #[error("catalog entry not found: {0}")]
    NotFound(EntryId),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// The fixed message a user gets to see for this failure.
    ///
    /// Storage and IO failures collapse to a generic message; their cause is
    /// for the logs only.
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Validation(err) => err.user_message(),
            CatalogError::UnsupportedExtension(_) => {
                UNSUPPORTED_EXTENSION_MESSAGE
            }
            CatalogError::LabelAcquisition(_) => LABEL_RETRY_MESSAGE,
            CatalogError::NotFound(_) => NOT_FOUND_MESSAGE,
            CatalogError::Storage(_) | CatalogError::Io(_) => STORAGE_MESSAGE,
        }
    }
}

const MISSING_NAME_MESSAGE: &str = "Please provide a name for the image";

const MISSING_SOURCE_MESSAGE: &str =
    "Please provide either a web image url or upload a local image";

const NO_IMAGE_SELECTED_MESSAGE: &str = "No image selected";

const LOCAL_UPLOAD_UNSUPPORTED_MESSAGE: &str =
    "Local image uploads are not supported by the configured label provider";

/// Bad, missing or conflicting upload input.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", MISSING_NAME_MESSAGE)]
    MissingName,

    #[error("{}", MISSING_SOURCE_MESSAGE)]
    MissingSource,

    #[error("{}", NO_IMAGE_SELECTED_MESSAGE)]
    NoImageSelected,

    #[error("{}", LOCAL_UPLOAD_UNSUPPORTED_MESSAGE)]
    LocalUploadUnsupported,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingName => MISSING_NAME_MESSAGE,
            ValidationError::MissingSource => MISSING_SOURCE_MESSAGE,
            ValidationError::NoImageSelected => NO_IMAGE_SELECTED_MESSAGE,
            ValidationError::LocalUploadUnsupported => {
                LOCAL_UPLOAD_UNSUPPORTED_MESSAGE
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to open catalog database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StoreError::Query { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_display() {
        for err in [
            ValidationError::MissingName,
            ValidationError::MissingSource,
            ValidationError::NoImageSelected,
            ValidationError::LocalUploadUnsupported,
        ] {
            assert_eq!(err.to_string(), err.user_message());
        }
    }

    #[test]
    fn storage_failures_hide_their_cause() {
        let err = CatalogError::from(StoreError::Query {
            operation: "list catalog entries",
            source: sqlx::Error::PoolTimedOut,
        });
        assert_eq!(err.user_message(), STORAGE_MESSAGE);
    }

    #[test]
    fn label_failures_suggest_a_retry() {
        let err = CatalogError::from(LabelAcquisitionError::new(
            "relay",
            "connection refused",
        ));
        assert_eq!(err.user_message(), LABEL_RETRY_MESSAGE);
    }
}
